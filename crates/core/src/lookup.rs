//! Read-only record lookup interface.
//!
//! The compiler performs no I/O. Callers hand it a `RecordLookup` backed by
//! whatever store holds the records; the compiler only reads through it.

use std::collections::BTreeMap;

use crate::error::LookupError;
use crate::model::{Block, Blueprint, Filter, LoraVersion, Profile, UserBlueprint};

/// Synchronous, read-only accessor for the records a compilation needs.
///
/// `Ok(None)` (or an absent map entry) means "not found"; the compiler turns
/// that into the matching `CompileError`. `Err` is reserved for backend
/// failures.
///
/// Implementations must be `Sync` so one store can serve concurrent
/// compilations.
pub trait RecordLookup: Sync {
    fn profile(&self, id: &str) -> Result<Option<Profile>, LookupError>;

    /// System blueprint by id.
    fn blueprint(&self, id: &str) -> Result<Option<Blueprint>, LookupError>;

    /// User blueprint with its version history.
    fn user_blueprint(&self, id: &str) -> Result<Option<UserBlueprint>, LookupError>;

    /// Blocks for the given keys. Keys the store does not hold are absent
    /// from the returned map.
    fn blocks(&self, keys: &[String]) -> Result<BTreeMap<String, Block>, LookupError>;

    /// Filter definitions for the given keys. Unknown keys are absent.
    fn filters(&self, keys: &[String]) -> Result<BTreeMap<String, Filter>, LookupError>;

    fn lora_version(&self, id: &str) -> Result<Option<LoraVersion>, LookupError>;
}
