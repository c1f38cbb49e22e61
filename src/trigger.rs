//! Trigger definitions evaluated by the alerting engine.
//!
//! A trigger pairs a condition script with the actions to run when it fires.
//! The set of trigger variants is closed: document parsing dispatches on the
//! wrapper key through a static registry, and the wire form carries a
//! one-byte kind tag. Adding a variant means adding a registry entry and a
//! kind value, not registering a parser at runtime.

use crate::action::Action;
use crate::doc::{self, DocReader, DocToken};
use crate::error::{ParseError, WireError};
use crate::ids::IdGenerator;
use crate::script::Script;
use crate::wire::{self, WireDecode, WireEncode};
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;
use tracing::{debug, trace};

/// Document wrapper key for [`ChainedAlertTrigger`].
pub const CHAINED_ALERT_TRIGGER_FIELD: &str = "chained_alert_trigger";

const ID_FIELD: &str = "id";
const NAME_FIELD: &str = "name";
const SEVERITY_FIELD: &str = "severity";
const CONDITION_FIELD: &str = "condition";
const SCRIPT_FIELD: &str = "script";
const ACTIONS_FIELD: &str = "actions";

/// Wire discriminant for trigger variants.
///
/// Values are part of the wire contract and must remain stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TriggerKind {
    ChainedAlert = 1,
}

impl TryFrom<u8> for TriggerKind {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TriggerKind::ChainedAlert),
            other => Err(WireError::UnknownEnumValue {
                kind: "trigger kind",
                value: other as u16,
            }),
        }
    }
}

/// A named condition-plus-actions definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    ChainedAlert(ChainedAlertTrigger),
}

type TriggerParser = fn(&mut DocReader, &dyn IdGenerator) -> Result<Trigger, ParseError>;

/// Closed registry mapping a document wrapper key to its variant parser.
const TRIGGER_PARSERS: &[(&str, TriggerParser)] =
    &[(CHAINED_ALERT_TRIGGER_FIELD, parse_chained_alert)];

fn parse_chained_alert(
    reader: &mut DocReader,
    ids: &dyn IdGenerator,
) -> Result<Trigger, ParseError> {
    Ok(Trigger::ChainedAlert(ChainedAlertTrigger::parse_inner(
        reader, ids,
    )?))
}

impl Trigger {
    /// Parses a wrapped trigger document, dispatching on the wrapper key.
    ///
    /// Entered on the wrapper's object-start token, returns on the matching
    /// object-end token.
    pub fn parse(reader: &mut DocReader, ids: &dyn IdGenerator) -> Result<Self, ParseError> {
        reader.require_object_start()?;
        reader.advance();

        let kind = reader.field_name()?.to_string();
        let parser = TRIGGER_PARSERS
            .iter()
            .find(|(key, _)| *key == kind)
            .map(|(_, parser)| *parser)
            .ok_or(ParseError::UnknownTriggerKind(kind))?;

        reader.advance();
        let trigger = parser(reader, ids)?;
        reader.advance();
        reader.require_object_end()?;
        Ok(trigger)
    }

    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::ChainedAlert(_) => TriggerKind::ChainedAlert,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Trigger::ChainedAlert(t) => &t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Trigger::ChainedAlert(t) => &t.name,
        }
    }

    pub fn severity(&self) -> &str {
        match self {
            Trigger::ChainedAlert(t) => &t.severity,
        }
    }

    pub fn actions(&self) -> &[Action] {
        match self {
            Trigger::ChainedAlert(t) => &t.actions,
        }
    }

    /// Produces the wrapped document form.
    pub fn to_doc(&self) -> Value {
        match self {
            Trigger::ChainedAlert(t) => t.to_doc(),
        }
    }
}

impl WireEncode for Trigger {
    fn encode(&self, buf: &mut BytesMut) {
        match self {
            Trigger::ChainedAlert(t) => {
                buf.put_u8(TriggerKind::ChainedAlert as u8);
                t.encode(buf);
            }
        }
    }
}

impl WireDecode for Trigger {
    fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        match TriggerKind::try_from(wire::get_u8(buf)?)? {
            TriggerKind::ChainedAlert => {
                Ok(Trigger::ChainedAlert(ChainedAlertTrigger::decode(buf)?))
            }
        }
    }
}

/// A trigger whose condition is evaluated over the audit states of the other
/// alerts in a workflow chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedAlertTrigger {
    pub id: String,
    pub name: String,
    /// Free-form severity label, surfaced to operators as-is.
    pub severity: String,
    /// Actions to run when the condition holds, in execution order.
    pub actions: Vec<Action>,
    /// Condition in the system dialect. Successfully parsed instances always
    /// satisfy `condition.lang == Script::DEFAULT_LANG`; the binary decode
    /// path trusts that the record was validated at first parse.
    pub condition: Script,
}

impl ChainedAlertTrigger {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        severity: impl Into<String>,
        actions: Vec<Action>,
        condition: Script,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            severity: severity.into(),
            actions,
            condition,
        }
    }

    /// Parses the inner trigger body.
    ///
    /// May be entered either on the body's object-start token or already on
    /// its first field name, depending on whether the caller consumed the
    /// start token. Returns on the matching object-end token.
    ///
    /// `name`, `severity`, and `condition` are required; an absent `id` is
    /// filled from `ids`; the condition dialect is validated as soon as the
    /// nested script is parsed; unknown keys are skipped.
    pub fn parse_inner(reader: &mut DocReader, ids: &dyn IdGenerator) -> Result<Self, ParseError> {
        match reader.current() {
            Some(DocToken::ObjectStart) => {
                reader.advance();
            }
            Some(DocToken::FieldName(_)) => {}
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "object start or field name",
                    found: doc::token_kind(other),
                })
            }
        }

        let mut id: Option<String> = None;
        let mut name: Option<String> = None;
        let mut severity: Option<String> = None;
        let mut condition: Option<Script> = None;
        let mut actions: Vec<Action> = Vec::new();

        while !reader.at_object_end()? {
            let field = reader.field_name()?.to_string();
            reader.advance();
            match field.as_str() {
                ID_FIELD => id = Some(reader.text()?.to_string()),
                NAME_FIELD => name = Some(reader.text()?.to_string()),
                SEVERITY_FIELD => severity = Some(reader.text()?.to_string()),
                CONDITION_FIELD => condition = Some(parse_condition(reader)?),
                ACTIONS_FIELD => actions = parse_actions(reader, ids)?,
                _ => {
                    trace!(field = %field, "ignoring unknown trigger field");
                    reader.skip_children();
                }
            }
            reader.advance();
        }

        let id = id.unwrap_or_else(|| {
            let generated = ids.generate();
            debug!(trigger_id = %generated, "assigned generated trigger id");
            generated
        });

        Ok(Self {
            id,
            name: name.ok_or(ParseError::MissingField(NAME_FIELD))?,
            severity: severity.ok_or(ParseError::MissingField(SEVERITY_FIELD))?,
            actions,
            condition: condition.ok_or(ParseError::MissingField(CONDITION_FIELD))?,
        })
    }

    /// Produces the wrapped document form.
    pub fn to_doc(&self) -> Value {
        let mut condition = serde_json::Map::new();
        condition.insert(SCRIPT_FIELD.to_string(), self.condition.to_doc());

        let mut inner = serde_json::Map::new();
        inner.insert(ID_FIELD.to_string(), Value::from(self.id.clone()));
        inner.insert(NAME_FIELD.to_string(), Value::from(self.name.clone()));
        inner.insert(
            SEVERITY_FIELD.to_string(),
            Value::from(self.severity.clone()),
        );
        inner.insert(CONDITION_FIELD.to_string(), Value::Object(condition));
        inner.insert(
            ACTIONS_FIELD.to_string(),
            Value::Array(self.actions.iter().map(Action::to_doc).collect()),
        );

        let mut doc = serde_json::Map::new();
        doc.insert(CHAINED_ALERT_TRIGGER_FIELD.to_string(), Value::Object(inner));
        Value::Object(doc)
    }

    /// Plain key/value view for the scripting and templating engines.
    pub fn as_template_arg(&self) -> Value {
        let mut arg = serde_json::Map::new();
        arg.insert(ID_FIELD.to_string(), Value::from(self.id.clone()));
        arg.insert(NAME_FIELD.to_string(), Value::from(self.name.clone()));
        arg.insert(
            SEVERITY_FIELD.to_string(),
            Value::from(self.severity.clone()),
        );
        arg.insert(
            ACTIONS_FIELD.to_string(),
            Value::Array(self.actions.iter().map(Action::as_template_arg).collect()),
        );
        Value::Object(arg)
    }
}

/// Parses the `condition` wrapper object around the script.
///
/// The dialect is checked as soon as the nested script parse returns, before
/// the rest of the trigger is read.
fn parse_condition(reader: &mut DocReader) -> Result<Script, ParseError> {
    reader.require_object_start()?;
    reader.advance();

    let mut script: Option<Script> = None;
    while !reader.at_object_end()? {
        let field = reader.field_name()?.to_string();
        reader.advance();
        if field == SCRIPT_FIELD {
            let parsed = Script::parse(reader)?;
            if parsed.lang != Script::DEFAULT_LANG {
                return Err(ParseError::InvalidScriptLang {
                    found: parsed.lang,
                    allowed: Script::DEFAULT_LANG,
                });
            }
            script = Some(parsed);
        } else {
            trace!(field = %field, "ignoring unknown condition field");
            reader.skip_children();
        }
        reader.advance();
    }
    script.ok_or(ParseError::MissingField(SCRIPT_FIELD))
}

fn parse_actions(reader: &mut DocReader, ids: &dyn IdGenerator) -> Result<Vec<Action>, ParseError> {
    reader.require_array_start()?;

    let mut actions = Vec::new();
    loop {
        reader.advance();
        match reader.current() {
            Some(DocToken::ArrayEnd) => break,
            Some(DocToken::ObjectStart) => {}
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "object start or array end",
                    found: doc::token_kind(other),
                })
            }
        }
        actions.push(Action::parse(reader, ids)?);
    }
    Ok(actions)
}

impl WireEncode for ChainedAlertTrigger {
    fn encode(&self, buf: &mut BytesMut) {
        wire::put_str(buf, &self.id);
        wire::put_str(buf, &self.name);
        wire::put_str(buf, &self.severity);
        wire::put_seq(buf, &self.actions);
        self.condition.encode(buf);
    }
}

impl WireDecode for ChainedAlertTrigger {
    fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        Ok(Self {
            id: wire::get_str(buf)?,
            name: wire::get_str(buf)?,
            severity: wire::get_str(buf)?,
            actions: wire::get_seq(buf)?,
            condition: Script::decode(buf)?,
        })
    }
}
