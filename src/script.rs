//! Script values for trigger conditions and action templates.
//!
//! A script declares the dialect it is written in via `lang`. Trigger
//! conditions must use the system dialect ([`Script::DEFAULT_LANG`]); that
//! constraint is enforced by the trigger parser, not here, because action
//! templates may legitimately use other dialects.

use crate::doc::DocReader;
use crate::error::{ParseError, WireError};
use crate::wire::{self, WireDecode, WireEncode};
use bytes::{Bytes, BytesMut};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

const SOURCE_FIELD: &str = "source";
const LANG_FIELD: &str = "lang";
const PARAMS_FIELD: &str = "params";

/// A script in a named dialect, with optional template parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Dialect the source is written in.
    pub lang: String,
    /// Script source text.
    pub source: String,
    /// Template parameters made available to the script.
    pub params: BTreeMap<String, String>,
}

impl Script {
    /// The system condition dialect.
    pub const DEFAULT_LANG: &'static str = "argus-expr";

    /// Creates a script in the system dialect with no parameters.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            lang: Self::DEFAULT_LANG.to_string(),
            source: source.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parses a script object.
    ///
    /// Entered on the object-start token, returns on the matching object-end
    /// token. `source` is required; an absent `lang` defaults to
    /// [`Self::DEFAULT_LANG`]; unknown keys are skipped.
    pub fn parse(reader: &mut DocReader) -> Result<Self, ParseError> {
        reader.require_object_start()?;
        reader.advance();

        let mut source: Option<String> = None;
        let mut lang: Option<String> = None;
        let mut params = BTreeMap::new();

        while !reader.at_object_end()? {
            let field = reader.field_name()?.to_string();
            reader.advance();
            match field.as_str() {
                SOURCE_FIELD => source = Some(reader.text()?.to_string()),
                LANG_FIELD => lang = Some(reader.text()?.to_string()),
                PARAMS_FIELD => params = parse_params(reader)?,
                _ => {
                    trace!(field = %field, "ignoring unknown script field");
                    reader.skip_children();
                }
            }
            reader.advance();
        }

        let source = source.ok_or(ParseError::MissingField(SOURCE_FIELD))?;
        Ok(Self {
            lang: lang.unwrap_or_else(|| Self::DEFAULT_LANG.to_string()),
            source,
            params,
        })
    }

    /// Produces the document form. `params` is omitted when empty.
    pub fn to_doc(&self) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert(SOURCE_FIELD.to_string(), Value::from(self.source.clone()));
        doc.insert(LANG_FIELD.to_string(), Value::from(self.lang.clone()));
        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect();
            doc.insert(PARAMS_FIELD.to_string(), Value::Object(params));
        }
        Value::Object(doc)
    }
}

fn parse_params(reader: &mut DocReader) -> Result<BTreeMap<String, String>, ParseError> {
    reader.require_object_start()?;
    reader.advance();

    let mut params = BTreeMap::new();
    while !reader.at_object_end()? {
        let key = reader.field_name()?.to_string();
        reader.advance();
        params.insert(key, reader.text()?.to_string());
        reader.advance();
    }
    Ok(params)
}

impl WireEncode for Script {
    fn encode(&self, buf: &mut BytesMut) {
        wire::put_str(buf, &self.lang);
        wire::put_str(buf, &self.source);
        wire::put_str_map(buf, &self.params);
    }
}

impl WireDecode for Script {
    fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        Ok(Self {
            lang: wire::get_str(buf)?,
            source: wire::get_str(buf)?,
            params: wire::get_str_map(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full() {
        let doc = json!({
            "source": "ctx.alerts > 0",
            "lang": "argus-expr",
            "params": {"threshold": "0"}
        });
        let script = Script::parse(&mut DocReader::from_value(&doc)).unwrap();

        assert_eq!(script.source, "ctx.alerts > 0");
        assert_eq!(script.lang, Script::DEFAULT_LANG);
        assert_eq!(script.params.get("threshold").map(String::as_str), Some("0"));
    }

    #[test]
    fn test_parse_defaults_lang() {
        let doc = json!({"source": "ctx.sev == \"high\""});
        let script = Script::parse(&mut DocReader::from_value(&doc)).unwrap();
        assert_eq!(script.lang, Script::DEFAULT_LANG);
        assert!(script.params.is_empty());
    }

    #[test]
    fn test_parse_missing_source() {
        let doc = json!({"lang": "argus-expr"});
        let result = Script::parse(&mut DocReader::from_value(&doc));
        assert!(matches!(result, Err(ParseError::MissingField("source"))));
    }

    #[test]
    fn test_parse_skips_unknown_fields() {
        let doc = json!({
            "source": "ctx.ok",
            "compiled_cache_key": {"nested": [1, 2]},
            "lang": "argus-expr"
        });
        let script = Script::parse(&mut DocReader::from_value(&doc)).unwrap();
        assert_eq!(script.source, "ctx.ok");
    }

    #[test]
    fn test_doc_roundtrip() {
        let script = Script::new("ctx.alerts > 0").with_param("limit", "3");
        let doc = script.to_doc();
        let parsed = Script::parse(&mut DocReader::from_value(&doc)).unwrap();
        assert_eq!(parsed, script);
        assert_eq!(parsed.to_doc(), doc);
    }

    #[test]
    fn test_wire_roundtrip() {
        let script = Script::new("ctx.alerts > 0")
            .with_lang("mustache")
            .with_param("subject", "cpu");

        let mut buf = BytesMut::new();
        script.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = Script::decode(&mut bytes).unwrap();

        assert_eq!(decoded, script);
        assert_eq!(bytes.len(), 0);
    }
}
