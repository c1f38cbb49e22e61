//! Document token model and cursor.
//!
//! Documents are `serde_json::Value` trees (the REST / stored form of every
//! record). Record parsers consume them through [`DocReader`], a cursor over
//! a flattened token stream:
//!
//! - `ObjectStart` / `ObjectEnd`
//! - `ArrayStart` / `ArrayEnd`
//! - `FieldName`
//! - `Scalar` (null, bool, number, string)
//!
//! Parser convention: a record parser is entered with the cursor on the
//! record's object-start token and returns with the cursor on the matching
//! object-end token. Container loops advance past that token themselves.
//! Unknown keys are skipped with [`DocReader::skip_children`], never
//! rejected; newer producers may add fields that older consumers ignore.

use crate::error::ParseError;
use serde_json::Value;

/// One token of a flattened document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocToken {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    FieldName(String),
    Scalar(Value),
}

/// Short token description for error messages.
pub fn token_kind(token: Option<&DocToken>) -> &'static str {
    match token {
        Some(DocToken::ObjectStart) => "object start",
        Some(DocToken::ObjectEnd) => "object end",
        Some(DocToken::ArrayStart) => "array start",
        Some(DocToken::ArrayEnd) => "array end",
        Some(DocToken::FieldName(_)) => "field name",
        Some(DocToken::Scalar(_)) => "value",
        None => "end of document",
    }
}

/// Cursor over a flattened document token stream.
#[derive(Debug, Clone)]
pub struct DocReader {
    tokens: Vec<DocToken>,
    pos: usize,
}

impl DocReader {
    /// Creates a reader positioned on the document's first token.
    pub fn from_value(value: &Value) -> Self {
        let mut tokens = Vec::new();
        flatten(value, &mut tokens);
        Self { tokens, pos: 0 }
    }

    /// Parses `input` as JSON and creates a reader over it.
    pub fn from_str(input: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(input)?;
        Ok(Self::from_value(&value))
    }

    /// The token the cursor currently sits on, or `None` past the end.
    pub fn current(&self) -> Option<&DocToken> {
        self.tokens.get(self.pos)
    }

    /// Advances the cursor one token and returns the new current token.
    pub fn advance(&mut self) -> Option<&DocToken> {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        self.tokens.get(self.pos)
    }

    /// Fails unless the cursor sits on an object-start token.
    pub fn require_object_start(&self) -> Result<(), ParseError> {
        match self.current() {
            Some(DocToken::ObjectStart) => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: "object start",
                found: token_kind(other),
            }),
        }
    }

    /// Fails unless the cursor sits on an array-start token.
    pub fn require_array_start(&self) -> Result<(), ParseError> {
        match self.current() {
            Some(DocToken::ArrayStart) => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: "array start",
                found: token_kind(other),
            }),
        }
    }

    /// Fails unless the cursor sits on an object-end token.
    pub fn require_object_end(&self) -> Result<(), ParseError> {
        match self.current() {
            Some(DocToken::ObjectEnd) => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: "object end",
                found: token_kind(other),
            }),
        }
    }

    /// Returns true when the cursor sits on the enclosing object's end token.
    ///
    /// Running off the end of the stream mid-object is a structural error,
    /// not a loop exit.
    pub fn at_object_end(&self) -> Result<bool, ParseError> {
        match self.current() {
            Some(DocToken::ObjectEnd) => Ok(true),
            None => Err(ParseError::UnexpectedEnd),
            _ => Ok(false),
        }
    }

    /// The field name the cursor sits on.
    pub fn field_name(&self) -> Result<&str, ParseError> {
        match self.current() {
            Some(DocToken::FieldName(name)) => Ok(name),
            other => Err(ParseError::UnexpectedToken {
                expected: "field name",
                found: token_kind(other),
            }),
        }
    }

    /// The string scalar the cursor sits on.
    pub fn text(&self) -> Result<&str, ParseError> {
        match self.current() {
            Some(DocToken::Scalar(Value::String(s))) => Ok(s),
            other => Err(ParseError::UnexpectedToken {
                expected: "string value",
                found: token_kind(other),
            }),
        }
    }

    /// The unsigned integer scalar the cursor sits on.
    pub fn u64_value(&self) -> Result<u64, ParseError> {
        match self.current() {
            Some(DocToken::Scalar(Value::Number(n))) => {
                n.as_u64().ok_or(ParseError::UnexpectedToken {
                    expected: "unsigned integer value",
                    found: "value",
                })
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "unsigned integer value",
                found: token_kind(other),
            }),
        }
    }

    /// The boolean scalar the cursor sits on.
    pub fn bool_value(&self) -> Result<bool, ParseError> {
        match self.current() {
            Some(DocToken::Scalar(Value::Bool(b))) => Ok(*b),
            other => Err(ParseError::UnexpectedToken {
                expected: "boolean value",
                found: token_kind(other),
            }),
        }
    }

    /// Skips the value the cursor sits on.
    ///
    /// For object and array starts this advances to the matching end token,
    /// leaving the cursor on it. Scalars are left in place; the caller's
    /// loop advance consumes them.
    pub fn skip_children(&mut self) {
        match self.current() {
            Some(DocToken::ObjectStart) | Some(DocToken::ArrayStart) => {}
            _ => return,
        }
        let mut depth = 0usize;
        loop {
            match self.current() {
                Some(DocToken::ObjectStart) | Some(DocToken::ArrayStart) => depth += 1,
                Some(DocToken::ObjectEnd) | Some(DocToken::ArrayEnd) => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                None => return,
                _ => {}
            }
            self.advance();
        }
    }
}

fn flatten(value: &Value, out: &mut Vec<DocToken>) {
    match value {
        Value::Object(map) => {
            out.push(DocToken::ObjectStart);
            for (key, child) in map {
                out.push(DocToken::FieldName(key.clone()));
                flatten(child, out);
            }
            out.push(DocToken::ObjectEnd);
        }
        Value::Array(items) => {
            out.push(DocToken::ArrayStart);
            for item in items {
                flatten(item, out);
            }
            out.push(DocToken::ArrayEnd);
        }
        scalar => out.push(DocToken::Scalar(scalar.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_order() {
        let reader = DocReader::from_value(&json!({"a": 1, "b": [true, null]}));
        let mut tokens = Vec::new();
        let mut r = reader;
        tokens.push(r.current().cloned());
        while let Some(token) = r.advance() {
            tokens.push(Some(token.clone()));
        }

        let expected = vec![
            Some(DocToken::ObjectStart),
            Some(DocToken::FieldName("a".to_string())),
            Some(DocToken::Scalar(json!(1))),
            Some(DocToken::FieldName("b".to_string())),
            Some(DocToken::ArrayStart),
            Some(DocToken::Scalar(json!(true))),
            Some(DocToken::Scalar(json!(null))),
            Some(DocToken::ArrayEnd),
            Some(DocToken::ObjectEnd),
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_skip_children_object() {
        let mut reader = DocReader::from_value(&json!({"extra": {"deep": {"er": 1}}, "keep": "x"}));
        reader.advance(); // FieldName("extra")
        reader.advance(); // ObjectStart
        reader.skip_children();
        assert_eq!(reader.current(), Some(&DocToken::ObjectEnd));

        reader.advance();
        assert_eq!(reader.field_name().unwrap(), "keep");
    }

    #[test]
    fn test_skip_children_array() {
        let mut reader = DocReader::from_value(&json!({"extra": [1, [2, 3], {"k": 4}], "keep": true}));
        reader.advance(); // FieldName("extra")
        reader.advance(); // ArrayStart
        reader.skip_children();
        assert_eq!(reader.current(), Some(&DocToken::ArrayEnd));

        reader.advance();
        assert_eq!(reader.field_name().unwrap(), "keep");
    }

    #[test]
    fn test_skip_children_scalar_is_noop() {
        let mut reader = DocReader::from_value(&json!({"a": 42}));
        reader.advance(); // FieldName("a")
        reader.advance(); // Scalar(42)
        reader.skip_children();
        assert_eq!(reader.current(), Some(&DocToken::Scalar(json!(42))));
    }

    #[test]
    fn test_from_str_invalid_json() {
        let result = DocReader::from_str("{not json");
        assert!(matches!(result, Err(ParseError::Json(_))));
    }

    #[test]
    fn test_scalar_accessors() {
        // Document object keys iterate in sorted order: b, n, s.
        let mut reader = DocReader::from_value(&json!({"s": "text", "n": 7, "b": false}));
        reader.advance();
        reader.advance();
        assert!(!reader.bool_value().unwrap());
        assert!(matches!(
            reader.u64_value(),
            Err(ParseError::UnexpectedToken { .. })
        ));

        reader.advance();
        reader.advance();
        assert_eq!(reader.u64_value().unwrap(), 7);

        reader.advance();
        reader.advance();
        assert_eq!(reader.text().unwrap(), "text");
    }

    #[test]
    fn test_advance_past_end() {
        let mut reader = DocReader::from_value(&json!("lone"));
        assert!(reader.current().is_some());
        assert!(reader.advance().is_none());
        assert!(reader.advance().is_none());
        assert!(matches!(
            reader.at_object_end(),
            Err(ParseError::UnexpectedEnd)
        ));
    }
}
