/// A fatal compilation error. No `CompileResult` is produced.
///
/// Every variant is a client error: the request references something the
/// backing store does not hold, or names no blueprint at all. Recoverable
/// anomalies never surface here; they are reported as result warnings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Neither `blueprint_id` nor `user_blueprint_id` was supplied.
    #[error("request must name a blueprint_id or a user_blueprint_id")]
    MissingBlueprintReference,

    #[error("profile not found: {profile_id}")]
    ProfileNotFound { profile_id: String },

    #[error("blueprint not found: {blueprint_id}")]
    BlueprintNotFound { blueprint_id: String },

    /// The user blueprint exists but the pinned version does not.
    #[error("user blueprint {blueprint_id} has no version {version}")]
    BlueprintVersionNotFound { blueprint_id: String, version: u32 },

    /// A blueprint references a block key that is not in the store.
    #[error("block not found: {key}")]
    BlockNotFound { key: String },

    #[error("filter not found: {key}")]
    FilterNotFound { key: String },

    #[error("LoRA version not found: {version_id}")]
    LoraVersionNotFound { version_id: String },

    /// The lookup backend itself failed.
    #[error("record lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl CompileError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::MissingBlueprintReference => "missing_blueprint_reference",
            CompileError::ProfileNotFound { .. } => "profile_not_found",
            CompileError::BlueprintNotFound { .. } => "blueprint_not_found",
            CompileError::BlueprintVersionNotFound { .. } => "blueprint_version_not_found",
            CompileError::BlockNotFound { .. } => "block_not_found",
            CompileError::FilterNotFound { .. } => "filter_not_found",
            CompileError::LoraVersionNotFound { .. } => "lora_version_not_found",
            CompileError::Lookup(_) => "lookup_failed",
        }
    }

    /// The missing reference, when the error names one.
    pub fn reference(&self) -> Option<&str> {
        match self {
            CompileError::ProfileNotFound { profile_id } => Some(profile_id),
            CompileError::BlueprintNotFound { blueprint_id }
            | CompileError::BlueprintVersionNotFound { blueprint_id, .. } => Some(blueprint_id),
            CompileError::BlockNotFound { key } | CompileError::FilterNotFound { key } => {
                Some(key)
            }
            CompileError::LoraVersionNotFound { version_id } => Some(version_id),
            CompileError::MissingBlueprintReference | CompileError::Lookup(_) => None,
        }
    }

    /// JSON body for the route layer's 400 response.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "code":      self.code(),
            "message":   self.to_string(),
            "reference": self.reference(),
        })
    }
}

/// Failure reported by a `RecordLookup` backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        LookupError {
            message: message.into(),
        }
    }
}
