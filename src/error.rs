//! Error types for the document and binary codec paths.

use thiserror::Error;

/// Errors raised while parsing a record from its document form.
///
/// Every variant carries enough context (usually the field name) to diagnose
/// the failing document without re-parsing it. A failed parse never yields a
/// partial record.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unexpected end of document")]
    UnexpectedEnd,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("invalid script language '{found}': allowed languages are [{allowed}]")]
    InvalidScriptLang { found: String, allowed: &'static str },

    #[error("unknown trigger kind: {0}")]
    UnknownTriggerKind(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while decoding a record from its binary wire form.
///
/// The binary path is the trusted round-trip of already-validated records, so
/// every decode failure indicates version skew or corruption and is fatal to
/// the whole record.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("truncated stream: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("length prefix {len} exceeds maximum {max}")]
    LengthOverflow { len: usize, max: usize },

    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    #[error("invalid boolean byte: {0:#x}")]
    InvalidBool(u8),

    #[error("unknown {kind} value: {value}")]
    UnknownEnumValue { kind: &'static str, value: u16 },
}
