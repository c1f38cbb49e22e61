//! # argus-protocol
//!
//! Record types and dual codecs for the argus alerting cluster.
//!
//! Every record in this crate crosses two boundaries and therefore carries
//! two codecs: a compact binary wire form for node-to-node RPC ([`wire`]),
//! and a keyed JSON document form for the REST and storage layers ([`doc`]).
//! The two forms round-trip the same record losslessly.
//!
//! This crate provides:
//! - Workflow-run request and response envelopes with document batches
//! - Trigger definitions with parse-time validation and a closed variant set
//! - Unknown-field tolerance on the document path for schema evolution
//! - Identifier defaulting behind an injectable generator
//!
//! Transport, storage, and workflow execution live in the crates consuming
//! these records; everything here is a pure, stateless transformation.

pub mod action;
pub mod config;
pub mod doc;
pub mod error;
pub mod ids;
pub mod message;
pub mod script;
pub mod trigger;
pub mod wire;

pub use action::Action;
pub use config::StreamingConfig;
pub use doc::{DocReader, DocToken};
pub use error::{ParseError, WireError};
pub use ids::{IdGenerator, UuidGenerator};
pub use message::{IdDocPair, ResponseStatus, StreamingWorkflowResponse, WorkflowRunRequest};
pub use script::Script;
pub use trigger::{ChainedAlertTrigger, Trigger, TriggerKind};
pub use wire::{WireDecode, WireEncode};

/// Wire format version spoken by this crate.
///
/// The transport layer negotiates versions; record field order never changes
/// within a shipped version. A field-order change requires a new record
/// variant.
pub const WIRE_VERSION: u16 = 1;

/// Maximum byte length accepted for a single wire string value (16 MiB).
pub const MAX_VALUE_LEN: usize = 16 * 1024 * 1024;

/// Maximum element count accepted for a single wire sequence or map.
pub const MAX_SEQ_LEN: usize = 1 << 20;
