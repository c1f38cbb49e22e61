//! Notification actions attached to triggers.
//!
//! An action describes one side effect taken when its trigger fires: which
//! destination to notify and the template that renders the message. The
//! execution engine consuming these records lives elsewhere.

use crate::doc::DocReader;
use crate::error::{ParseError, WireError};
use crate::ids::IdGenerator;
use crate::script::Script;
use crate::wire::{self, WireDecode, WireEncode};
use bytes::{Bytes, BytesMut};
use serde_json::Value;
use tracing::{debug, trace};

const ID_FIELD: &str = "id";
const NAME_FIELD: &str = "name";
const DESTINATION_ID_FIELD: &str = "destination_id";
const MESSAGE_TEMPLATE_FIELD: &str = "message_template";
const THROTTLE_ENABLED_FIELD: &str = "throttle_enabled";

/// A side-effect descriptor invoked when a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: String,
    pub name: String,
    /// Notification destination this action delivers to.
    pub destination_id: String,
    /// Template rendering the notification message.
    pub message_template: Script,
    pub throttle_enabled: bool,
}

impl Action {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        destination_id: impl Into<String>,
        message_template: Script,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            destination_id: destination_id.into(),
            message_template,
            throttle_enabled: false,
        }
    }

    pub fn with_throttle_enabled(mut self, enabled: bool) -> Self {
        self.throttle_enabled = enabled;
        self
    }

    /// Parses an action object.
    ///
    /// Entered on the object-start token, returns on the matching object-end
    /// token. `name`, `destination_id`, and `message_template` are required;
    /// an absent `id` is filled from `ids`; unknown keys are skipped.
    pub fn parse(reader: &mut DocReader, ids: &dyn IdGenerator) -> Result<Self, ParseError> {
        reader.require_object_start()?;
        reader.advance();

        let mut id: Option<String> = None;
        let mut name: Option<String> = None;
        let mut destination_id: Option<String> = None;
        let mut message_template: Option<Script> = None;
        let mut throttle_enabled = false;

        while !reader.at_object_end()? {
            let field = reader.field_name()?.to_string();
            reader.advance();
            match field.as_str() {
                ID_FIELD => id = Some(reader.text()?.to_string()),
                NAME_FIELD => name = Some(reader.text()?.to_string()),
                DESTINATION_ID_FIELD => destination_id = Some(reader.text()?.to_string()),
                MESSAGE_TEMPLATE_FIELD => message_template = Some(Script::parse(reader)?),
                THROTTLE_ENABLED_FIELD => throttle_enabled = reader.bool_value()?,
                _ => {
                    trace!(field = %field, "ignoring unknown action field");
                    reader.skip_children();
                }
            }
            reader.advance();
        }

        let id = id.unwrap_or_else(|| {
            let generated = ids.generate();
            debug!(action_id = %generated, "assigned generated action id");
            generated
        });

        Ok(Self {
            id,
            name: name.ok_or(ParseError::MissingField(NAME_FIELD))?,
            destination_id: destination_id.ok_or(ParseError::MissingField(DESTINATION_ID_FIELD))?,
            message_template: message_template
                .ok_or(ParseError::MissingField(MESSAGE_TEMPLATE_FIELD))?,
            throttle_enabled,
        })
    }

    /// Produces the document form.
    pub fn to_doc(&self) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert(ID_FIELD.to_string(), Value::from(self.id.clone()));
        doc.insert(NAME_FIELD.to_string(), Value::from(self.name.clone()));
        doc.insert(
            DESTINATION_ID_FIELD.to_string(),
            Value::from(self.destination_id.clone()),
        );
        doc.insert(
            MESSAGE_TEMPLATE_FIELD.to_string(),
            self.message_template.to_doc(),
        );
        doc.insert(
            THROTTLE_ENABLED_FIELD.to_string(),
            Value::from(self.throttle_enabled),
        );
        Value::Object(doc)
    }

    /// Plain key/value view for the templating engine.
    pub fn as_template_arg(&self) -> Value {
        let mut arg = serde_json::Map::new();
        arg.insert(ID_FIELD.to_string(), Value::from(self.id.clone()));
        arg.insert(NAME_FIELD.to_string(), Value::from(self.name.clone()));
        arg.insert(
            DESTINATION_ID_FIELD.to_string(),
            Value::from(self.destination_id.clone()),
        );
        Value::Object(arg)
    }
}

impl WireEncode for Action {
    fn encode(&self, buf: &mut BytesMut) {
        wire::put_str(buf, &self.id);
        wire::put_str(buf, &self.name);
        wire::put_str(buf, &self.destination_id);
        self.message_template.encode(buf);
        wire::put_bool(buf, self.throttle_enabled);
    }
}

impl WireDecode for Action {
    fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        Ok(Self {
            id: wire::get_str(buf)?,
            name: wire::get_str(buf)?,
            destination_id: wire::get_str(buf)?,
            message_template: Script::decode(buf)?,
            throttle_enabled: wire::get_bool(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedIds;

    impl IdGenerator for FixedIds {
        fn generate(&self) -> String {
            "generated-action-id".to_string()
        }
    }

    fn sample() -> Action {
        Action::new(
            "a-1",
            "notify-oncall",
            "d-slack",
            Script::new("alert fired: {{ctx.name}}").with_lang("mustache"),
        )
        .with_throttle_enabled(true)
    }

    #[test]
    fn test_doc_roundtrip() {
        let action = sample();
        let doc = action.to_doc();
        let parsed = Action::parse(&mut DocReader::from_value(&doc), &FixedIds).unwrap();
        assert_eq!(parsed, action);
        assert_eq!(parsed.to_doc(), doc);
    }

    #[test]
    fn test_parse_defaults_id() {
        let doc = json!({
            "name": "notify-oncall",
            "destination_id": "d-slack",
            "message_template": {"source": "fired", "lang": "mustache"}
        });
        let action = Action::parse(&mut DocReader::from_value(&doc), &FixedIds).unwrap();
        assert_eq!(action.id, "generated-action-id");
        assert!(!action.throttle_enabled);
    }

    #[test]
    fn test_parse_missing_required_fields() {
        let doc = json!({
            "destination_id": "d-slack",
            "message_template": {"source": "fired"}
        });
        let result = Action::parse(&mut DocReader::from_value(&doc), &FixedIds);
        assert!(matches!(result, Err(ParseError::MissingField("name"))));

        let doc = json!({
            "name": "notify-oncall",
            "message_template": {"source": "fired"}
        });
        let result = Action::parse(&mut DocReader::from_value(&doc), &FixedIds);
        assert!(matches!(
            result,
            Err(ParseError::MissingField("destination_id"))
        ));

        let doc = json!({"name": "notify-oncall", "destination_id": "d-slack"});
        let result = Action::parse(&mut DocReader::from_value(&doc), &FixedIds);
        assert!(matches!(
            result,
            Err(ParseError::MissingField("message_template"))
        ));
    }

    #[test]
    fn test_parse_skips_unknown_fields() {
        let doc = json!({
            "id": "a-1",
            "name": "notify-oncall",
            "destination_id": "d-slack",
            "message_template": {"source": "fired"},
            "retry_policy": {"max_attempts": 3, "backoff": ["1s", "5s"]}
        });
        let action = Action::parse(&mut DocReader::from_value(&doc), &FixedIds).unwrap();
        assert_eq!(action.id, "a-1");
        assert_eq!(action.name, "notify-oncall");
    }

    #[test]
    fn test_wire_roundtrip() {
        let action = sample();
        let mut buf = BytesMut::new();
        action.encode(&mut buf);

        let mut bytes = buf.freeze();
        let decoded = Action::decode(&mut bytes).unwrap();
        assert_eq!(decoded, action);
        assert_eq!(bytes.len(), 0);
    }

    #[test]
    fn test_wire_truncated() {
        let action = sample();
        let mut buf = BytesMut::new();
        action.encode(&mut buf);

        let mut bytes = buf.freeze().slice(..10);
        let result = Action::decode(&mut bytes);
        assert!(matches!(result, Err(WireError::Truncated { .. })));
    }

    #[test]
    fn test_as_template_arg() {
        let arg = sample().as_template_arg();
        assert_eq!(arg["id"], "a-1");
        assert_eq!(arg["name"], "notify-oncall");
        assert_eq!(arg["destination_id"], "d-slack");
        assert!(arg.get("message_template").is_none());
    }
}
