use std::path::Path;

use promptc_core::{Block, Blueprint, Filter, LoraVersion, Profile, UserBlueprint};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// On-disk catalog: every record the compiler can look up, in one JSON
/// document. All sections are optional.
///
/// User blueprints carry their full version history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub blueprints: Vec<Blueprint>,
    #[serde(default)]
    pub user_blueprints: Vec<UserBlueprint>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub lora_versions: Vec<LoraVersion>,
}

impl Catalog {
    /// Parse a catalog from JSON text. `origin` names the source in errors.
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|source| StoreError::Parse {
            origin: origin.to_owned(),
            source,
        })
    }

    /// Read and parse a catalog file.
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json, &path.display().to_string())
    }
}
