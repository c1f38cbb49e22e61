//! Workflow-run request and response envelopes.
//!
//! These records cross two boundaries: node-to-node RPC (binary wire form)
//! and the REST/storage layer (document form). Both forms round-trip
//! losslessly; the document form additionally tolerates unknown keys so
//! newer producers can add fields without breaking older consumers.

use crate::doc::{self, DocReader, DocToken};
use crate::error::{ParseError, WireError};
use crate::wire::{self, WireDecode, WireEncode};
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;
use tracing::trace;

const ID_FIELD: &str = "id";
const DOCUMENT_FIELD: &str = "document";
const WORKFLOW_ID_FIELD: &str = "workflowId";
const DOCUMENTS_FIELD: &str = "documents";
const STATUS_FIELD: &str = "status";

/// An opaque document identifier paired with the document payload.
///
/// Immutable once constructed; created by the caller issuing a workflow run
/// and consumed read-only by the receiving node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdDocPair {
    pub id: String,
    /// Raw document payload, forwarded verbatim to the workflow engine.
    pub document: String,
}

impl IdDocPair {
    pub fn new(id: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
        }
    }

    /// Parses a pair object. Entered on the object-start token, returns on
    /// the matching object-end token. Both fields are required.
    pub fn parse(reader: &mut DocReader) -> Result<Self, ParseError> {
        reader.require_object_start()?;
        reader.advance();

        let mut id: Option<String> = None;
        let mut document: Option<String> = None;

        while !reader.at_object_end()? {
            let field = reader.field_name()?.to_string();
            reader.advance();
            match field.as_str() {
                ID_FIELD => id = Some(reader.text()?.to_string()),
                DOCUMENT_FIELD => document = Some(reader.text()?.to_string()),
                _ => {
                    trace!(field = %field, "ignoring unknown document pair field");
                    reader.skip_children();
                }
            }
            reader.advance();
        }

        Ok(Self {
            id: id.ok_or(ParseError::MissingField(ID_FIELD))?,
            document: document.ok_or(ParseError::MissingField(DOCUMENT_FIELD))?,
        })
    }

    /// Produces the document form.
    pub fn to_doc(&self) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert(ID_FIELD.to_string(), Value::from(self.id.clone()));
        doc.insert(DOCUMENT_FIELD.to_string(), Value::from(self.document.clone()));
        Value::Object(doc)
    }
}

impl WireEncode for IdDocPair {
    fn encode(&self, buf: &mut BytesMut) {
        wire::put_str(buf, &self.id);
        wire::put_str(buf, &self.document);
    }
}

impl WireDecode for IdDocPair {
    fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        Ok(Self {
            id: wire::get_str(buf)?,
            document: wire::get_str(buf)?,
        })
    }
}

/// Request to run a workflow over a batch of documents.
///
/// The document sequence preserves caller-supplied order; the engine replays
/// it in that order downstream. Stateless, created per RPC call, immutable
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRunRequest {
    pub workflow_id: String,
    pub documents: Vec<IdDocPair>,
}

impl WorkflowRunRequest {
    pub fn new(workflow_id: impl Into<String>, documents: Vec<IdDocPair>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            documents,
        }
    }

    /// Parses a request document.
    ///
    /// Entered on the object-start token, returns on the matching object-end
    /// token. `workflowId` is required and must be non-empty; an absent
    /// `documents` array yields an empty batch; unknown keys are skipped.
    pub fn parse(reader: &mut DocReader) -> Result<Self, ParseError> {
        reader.require_object_start()?;
        reader.advance();

        let mut workflow_id: Option<String> = None;
        let mut documents: Vec<IdDocPair> = Vec::new();

        while !reader.at_object_end()? {
            let field = reader.field_name()?.to_string();
            reader.advance();
            match field.as_str() {
                WORKFLOW_ID_FIELD => workflow_id = Some(reader.text()?.to_string()),
                DOCUMENTS_FIELD => documents = parse_documents(reader)?,
                _ => {
                    trace!(field = %field, "ignoring unknown request field");
                    reader.skip_children();
                }
            }
            reader.advance();
        }

        let workflow_id = workflow_id.ok_or(ParseError::MissingField(WORKFLOW_ID_FIELD))?;
        if workflow_id.is_empty() {
            return Err(ParseError::InvalidValue {
                field: WORKFLOW_ID_FIELD,
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            workflow_id,
            documents,
        })
    }

    /// Produces the document form.
    pub fn to_doc(&self) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert(
            WORKFLOW_ID_FIELD.to_string(),
            Value::from(self.workflow_id.clone()),
        );
        doc.insert(
            DOCUMENTS_FIELD.to_string(),
            Value::Array(self.documents.iter().map(IdDocPair::to_doc).collect()),
        );
        Value::Object(doc)
    }
}

fn parse_documents(reader: &mut DocReader) -> Result<Vec<IdDocPair>, ParseError> {
    reader.require_array_start()?;

    let mut documents = Vec::new();
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
        documents.push(IdDocPair::parse(reader)?);
    }
    Ok(documents)
}

impl WireEncode for WorkflowRunRequest {
    fn encode(&self, buf: &mut BytesMut) {
        wire::put_str(buf, &self.workflow_id);
        wire::put_seq(buf, &self.documents);
    }
}

impl WireDecode for WorkflowRunRequest {
    fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        Ok(Self {
            workflow_id: wire::get_str(buf)?,
            documents: wire::get_seq(buf)?,
        })
    }
}

/// Outcome code for a finished workflow-run call.
///
/// Codes follow the REST layer's status vocabulary and are part of the wire
/// contract: the set is closed, each code is stable, and decoding an unknown
/// code fails rather than coercing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ResponseStatus {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    RequestTimeout = 408,
    Conflict = 409,
    TooManyRequests = 429,
    InternalServerError = 500,
    ServiceUnavailable = 503,
}

impl ResponseStatus {
    /// The numeric code written on the wire and into documents.
    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl TryFrom<u16> for ResponseStatus {
    type Error = WireError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(ResponseStatus::Ok),
            201 => Ok(ResponseStatus::Created),
            202 => Ok(ResponseStatus::Accepted),
            400 => Ok(ResponseStatus::BadRequest),
            401 => Ok(ResponseStatus::Unauthorized),
            403 => Ok(ResponseStatus::Forbidden),
            404 => Ok(ResponseStatus::NotFound),
            408 => Ok(ResponseStatus::RequestTimeout),
            409 => Ok(ResponseStatus::Conflict),
            429 => Ok(ResponseStatus::TooManyRequests),
            500 => Ok(ResponseStatus::InternalServerError),
            503 => Ok(ResponseStatus::ServiceUnavailable),
            other => Err(WireError::UnknownEnumValue {
                kind: "response status",
                value: other,
            }),
        }
    }
}

/// Terminal status of a streaming workflow-run call.
///
/// Carries a single status code and nothing else: per-document failure
/// detail is not reported back to the caller. The status is always set;
/// there is no absent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingWorkflowResponse {
    pub status: ResponseStatus,
}

impl StreamingWorkflowResponse {
    pub fn new(status: ResponseStatus) -> Self {
        Self { status }
    }

    /// Parses a response document. `status` is required and must be a known
    /// code; unknown keys are skipped.
    pub fn parse(reader: &mut DocReader) -> Result<Self, ParseError> {
        reader.require_object_start()?;
        reader.advance();

        let mut status: Option<ResponseStatus> = None;

        while !reader.at_object_end()? {
            let field = reader.field_name()?.to_string();
            reader.advance();
            match field.as_str() {
                STATUS_FIELD => {
                    let raw = reader.u64_value()?;
                    let code = u16::try_from(raw).map_err(|_| ParseError::InvalidValue {
                        field: STATUS_FIELD,
                        reason: format!("status code {raw} out of range"),
                    })?;
                    status = Some(ResponseStatus::try_from(code).map_err(|_| {
                        ParseError::InvalidValue {
                            field: STATUS_FIELD,
                            reason: format!("unknown status code: {code}"),
                        }
                    })?);
                }
                _ => {
                    trace!(field = %field, "ignoring unknown response field");
                    reader.skip_children();
                }
            }
            reader.advance();
        }

        Ok(Self {
            status: status.ok_or(ParseError::MissingField(STATUS_FIELD))?,
        })
    }

    /// Produces the document form.
    pub fn to_doc(&self) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert(STATUS_FIELD.to_string(), Value::from(self.status.code()));
        Value::Object(doc)
    }
}

impl WireEncode for StreamingWorkflowResponse {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.status.code());
    }
}

impl WireDecode for StreamingWorkflowResponse {
    fn decode(buf: &mut Bytes) -> Result<Self, WireError> {
        Ok(Self {
            status: ResponseStatus::try_from(wire::get_u16(buf)?)?,
        })
    }
}
