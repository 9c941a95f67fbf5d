use std::collections::BTreeMap;
use std::path::Path;

use promptc_core::{
    Block, Blueprint, BlueprintVersion, Filter, LookupError, LoraVersion, Profile, RecordLookup,
    UserBlueprint,
};

use crate::catalog::Catalog;
use crate::error::StoreError;

/// Input for creating or editing a user blueprint.
///
/// `blocks` and `constraints` form the versioned snapshot; the remaining
/// fields are descriptive and are not versioned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlueprintDraft {
    pub id: String,
    pub name: String,
    pub category: String,
    pub owner_id: Option<String>,
    pub compatible_profiles: Option<Vec<String>>,
    pub blocks: Vec<String>,
    pub constraints: Vec<String>,
}

/// In-memory record store backed by a `Catalog`.
///
/// Reads go through `RecordLookup`; user blueprint writes only ever append
/// version snapshots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    profiles: BTreeMap<String, Profile>,
    blueprints: BTreeMap<String, Blueprint>,
    user_blueprints: BTreeMap<String, UserBlueprint>,
    blocks: BTreeMap<String, Block>,
    filters: BTreeMap<String, Filter>,
    lora_versions: BTreeMap<String, LoraVersion>,
}

fn index<T>(
    kind: &'static str,
    records: Vec<T>,
    id: impl Fn(&T) -> &str,
) -> Result<BTreeMap<String, T>, StoreError> {
    let mut map = BTreeMap::new();
    for record in records {
        let key = id(&record).to_owned();
        if map.contains_key(&key) {
            return Err(StoreError::Duplicate { kind, id: key });
        }
        map.insert(key, record);
    }
    Ok(map)
}

impl MemoryStore {
    /// Index a catalog. Duplicate ids within a section are rejected.
    pub fn from_catalog(catalog: Catalog) -> Result<Self, StoreError> {
        let store = MemoryStore {
            profiles: index("profile", catalog.profiles, |p| p.id.as_str())?,
            blueprints: index("blueprint", catalog.blueprints, |b| b.id.as_str())?,
            user_blueprints: index("user blueprint", catalog.user_blueprints, |b| b.id.as_str())?,
            blocks: index("block", catalog.blocks, |b| b.key.as_str())?,
            filters: index("filter", catalog.filters, |f| f.key.as_str())?,
            lora_versions: index("LoRA version", catalog.lora_versions, |l| l.id.as_str())?,
        };
        tracing::debug!(
            profiles = store.profiles.len(),
            blueprints = store.blueprints.len() + store.user_blueprints.len(),
            blocks = store.blocks.len(),
            filters = store.filters.len(),
            "catalog indexed"
        );
        Ok(store)
    }

    /// Read a catalog file and index it.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        Self::from_catalog(Catalog::read(path)?)
    }

    // ── User blueprint history ───────────────────────────────────────────

    /// Create a user blueprint at version 1.
    pub fn create_user_blueprint(
        &mut self,
        draft: BlueprintDraft,
    ) -> Result<UserBlueprint, StoreError> {
        if draft.id.trim().is_empty() {
            return Err(StoreError::InvalidDraft("id must not be empty".into()));
        }
        if self.user_blueprints.contains_key(&draft.id) || self.blueprints.contains_key(&draft.id) {
            return Err(StoreError::Duplicate {
                kind: "user blueprint",
                id: draft.id,
            });
        }
        self.check_draft(&draft)?;

        let blueprint = UserBlueprint {
            id: draft.id.clone(),
            name: draft.name,
            category: draft.category,
            owner_id: draft.owner_id,
            compatible_profiles: draft.compatible_profiles,
            versions: vec![BlueprintVersion {
                version: 1,
                blocks: draft.blocks,
                constraints: draft.constraints,
            }],
        };
        tracing::debug!(id = %blueprint.id, "user blueprint created");
        self.user_blueprints.insert(draft.id, blueprint.clone());
        Ok(blueprint)
    }

    /// Edit a user blueprint: append an immutable snapshot at version + 1.
    ///
    /// `draft.id` is ignored; `id` selects the blueprint. An edit identical
    /// to the current state is rejected so the history only records changes.
    pub fn edit_user_blueprint(
        &mut self,
        id: &str,
        draft: BlueprintDraft,
    ) -> Result<UserBlueprint, StoreError> {
        self.check_draft(&draft)?;
        let existing = self
            .user_blueprints
            .get_mut(id)
            .ok_or_else(|| StoreError::UserBlueprintNotFound { id: id.to_owned() })?;

        let current = existing.version();
        let unchanged = existing.current().is_some_and(|snap| {
            snap.blocks == draft.blocks && snap.constraints == draft.constraints
        }) && existing.name == draft.name
            && existing.category == draft.category
            && existing.owner_id == draft.owner_id
            && existing.compatible_profiles == draft.compatible_profiles;
        if unchanged {
            return Err(StoreError::UnchangedEdit {
                id: id.to_owned(),
                version: current,
            });
        }

        existing.name = draft.name;
        existing.category = draft.category;
        existing.owner_id = draft.owner_id;
        existing.compatible_profiles = draft.compatible_profiles;
        existing.versions.push(BlueprintVersion {
            version: current + 1,
            blocks: draft.blocks,
            constraints: draft.constraints,
        });
        tracing::debug!(id, version = current + 1, "user blueprint edited");
        Ok(existing.clone())
    }

    /// Version history of a user blueprint, oldest first.
    pub fn blueprint_versions(&self, id: &str) -> Result<&[BlueprintVersion], StoreError> {
        self.user_blueprints
            .get(id)
            .map(|b| b.versions.as_slice())
            .ok_or_else(|| StoreError::UserBlueprintNotFound { id: id.to_owned() })
    }

    fn check_draft(&self, draft: &BlueprintDraft) -> Result<(), StoreError> {
        if draft.blocks.is_empty() {
            return Err(StoreError::InvalidDraft(
                "a blueprint needs at least one block".into(),
            ));
        }
        if let Some(key) = draft.blocks.iter().find(|k| !self.blocks.contains_key(*k)) {
            return Err(StoreError::UnknownBlock {
                blueprint_id: draft.id.clone(),
                key: key.clone(),
            });
        }
        Ok(())
    }
}

fn pick<T: Clone>(map: &BTreeMap<String, T>, keys: &[String]) -> BTreeMap<String, T> {
    keys.iter()
        .filter_map(|k| map.get(k).map(|v| (k.clone(), v.clone())))
        .collect()
}

impl RecordLookup for MemoryStore {
    fn profile(&self, id: &str) -> Result<Option<Profile>, LookupError> {
        Ok(self.profiles.get(id).cloned())
    }

    fn blueprint(&self, id: &str) -> Result<Option<Blueprint>, LookupError> {
        Ok(self.blueprints.get(id).cloned())
    }

    fn user_blueprint(&self, id: &str) -> Result<Option<UserBlueprint>, LookupError> {
        Ok(self.user_blueprints.get(id).cloned())
    }

    fn blocks(&self, keys: &[String]) -> Result<BTreeMap<String, Block>, LookupError> {
        Ok(pick(&self.blocks, keys))
    }

    fn filters(&self, keys: &[String]) -> Result<BTreeMap<String, Filter>, LookupError> {
        Ok(pick(&self.filters, keys))
    }

    fn lora_version(&self, id: &str) -> Result<Option<LoraVersion>, LookupError> {
        Ok(self.lora_versions.get(id).cloned())
    }
}
