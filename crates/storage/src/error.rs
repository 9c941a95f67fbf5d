use std::path::PathBuf;

/// All errors that can be returned by the catalog store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The catalog file could not be read.
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid JSON or does not match the catalog shape.
    #[error("invalid catalog {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Two records in one section share an id (or a block/filter key).
    #[error("duplicate {kind} '{id}' in catalog")]
    Duplicate { kind: &'static str, id: String },

    /// No user blueprint with the given id.
    #[error("user blueprint not found: {id}")]
    UserBlueprintNotFound { id: String },

    /// A draft references a block key the store does not hold.
    #[error("user blueprint {blueprint_id} references unknown block '{key}'")]
    UnknownBlock { blueprint_id: String, key: String },

    /// A draft is structurally unusable (empty id, no blocks).
    #[error("invalid user blueprint draft: {0}")]
    InvalidDraft(String),

    /// An edit that would produce a snapshot identical to the current one.
    #[error("edit to user blueprint {id} changes nothing; still at version {version}")]
    UnchangedEdit { id: String, version: u32 },
}
