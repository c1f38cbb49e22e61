//! Identifier generation.
//!
//! Document parsers that default an absent identifier take the generator as
//! an explicit collaborator so tests can supply a deterministic one. The
//! binary wire path never generates identifiers; records on that path were
//! assigned one at first write.

use uuid::Uuid;

/// Source of fresh, unique identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a new identifier, unique across the cluster.
    fn generate(&self) -> String;
}

/// Random v4 UUIDs in compact hex form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
