//! Record types consumed by the compiler (profiles, blueprints, blocks,
//! filters, LoRA versions), the compile request, and the compile result.
//!
//! Every type round-trips through serde with snake_case field names so the
//! route layer can hand the result to clients verbatim. Maps whose iteration
//! order is observable in the output are `BTreeMap`s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ──────────────────────────────────────────────
// Blocks
// ──────────────────────────────────────────────

/// Type tag of a template block. Profiles reorder the composition by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Style,
    Camera,
    Layout,
    Constraint,
    Postfx,
    Subject,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Style => "style",
            BlockType::Camera => "camera",
            BlockType::Layout => "layout",
            BlockType::Constraint => "constraint",
            BlockType::Postfx => "postfx",
            BlockType::Subject => "subject",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable template block. `template` is plain text with `{field}`
/// placeholders; it is never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub key: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub template: String,
}

// ──────────────────────────────────────────────
// Profiles
// ──────────────────────────────────────────────

/// Capability flags of a target model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub supports_negative_prompt: bool,
    /// Informational only. Inline LoRA versus character pack is decided by
    /// the target platform table in `platform`, not by this flag.
    #[serde(default)]
    pub supports_lora_syntax: bool,
}

/// A target model profile. Read-only at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// Prefix emitted ahead of every composition.
    #[serde(default)]
    pub base_prompt: String,
    #[serde(default)]
    pub preferred_order: Vec<BlockType>,
    /// Case-insensitive regexes; patterns that fail to compile are matched
    /// as plain substrings.
    #[serde(default)]
    pub forbidden_patterns: Vec<String>,
    /// Character cap on the compiled prompt.
    pub max_length: usize,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Block types the profile expects every blueprint to contain.
    #[serde(default)]
    pub recommended_blocks: Vec<BlockType>,
}

// ──────────────────────────────────────────────
// Blueprints
// ──────────────────────────────────────────────

/// A blueprint: ordered block keys plus constraint strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub blocks: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Profile ids this blueprint is meant for. `None` means any profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_profiles: Option<Vec<String>>,
}

impl Blueprint {
    pub fn is_compatible_with(&self, profile_id: &str) -> bool {
        match &self.compatible_profiles {
            Some(allowed) => allowed.iter().any(|p| p == profile_id),
            None => true,
        }
    }
}

/// Immutable snapshot of a user blueprint at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintVersion {
    pub version: u32,
    pub blocks: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// A user-defined blueprint with its full version history.
///
/// `versions` is ordered by ascending version number; the last entry is the
/// current version. Snapshots are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBlueprint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_profiles: Option<Vec<String>>,
    pub versions: Vec<BlueprintVersion>,
}

impl UserBlueprint {
    /// Current version number, 0 for a blueprint with no snapshots.
    pub fn version(&self) -> u32 {
        self.versions.last().map(|v| v.version).unwrap_or(0)
    }

    pub fn current(&self) -> Option<&BlueprintVersion> {
        self.versions.last()
    }

    pub fn snapshot(&self, version: u32) -> Option<&BlueprintVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// Materialize the blueprint as it was at `version` (current when `None`).
    pub fn at_version(&self, version: Option<u32>) -> Option<Blueprint> {
        let snapshot = match version {
            Some(v) => self.snapshot(v)?,
            None => self.current()?,
        };
        Some(Blueprint {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            blocks: snapshot.blocks.clone(),
            constraints: snapshot.constraints.clone(),
            compatible_profiles: self.compatible_profiles.clone(),
        })
    }
}

// ──────────────────────────────────────────────
// Filters
// ──────────────────────────────────────────────

/// Declares which values a filter accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSchema {
    Options { options: Vec<String> },
    Range { min: f64, max: f64 },
    Text,
}

/// Wildcard key in an effect table, used when the chosen value has no entry.
pub const EFFECT_WILDCARD: &str = "*";

/// A filter definition.
///
/// `effect` maps a dimension name (e.g. `camera_angle`) to a table of
/// value → text fragment. `{value}` inside a fragment is replaced with the
/// chosen value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub key: String,
    pub schema: FilterSchema,
    #[serde(default)]
    pub effect: BTreeMap<String, BTreeMap<String, String>>,
    /// Plan-tier gate, enforced by the caller.
    #[serde(default)]
    pub is_premium: bool,
}

/// A value chosen for a filter. JSON clients may send strings, numbers or
/// booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FilterValue {
    pub fn as_text(&self) -> String {
        match self {
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Number(n) => n.to_string(),
            FilterValue::Text(s) => s.clone(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FilterValue::Number(n) => *n,
            FilterValue::Text(s) => s.trim().parse::<f64>().ok()?,
            FilterValue::Bool(_) => return None,
        };
        n.is_finite().then_some(n)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_owned())
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

// ──────────────────────────────────────────────
// LoRA
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoraStatus {
    Ready,
    Training,
    Failed,
}

impl fmt::Display for LoraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoraStatus::Ready => "ready",
            LoraStatus::Training => "training",
            LoraStatus::Failed => "failed",
        })
    }
}

/// A trained LoRA version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoraVersion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub trigger_word: String,
    pub status: LoraStatus,
}

fn default_lora_weight() -> f64 {
    1.0
}

/// LoRA activation requested for one compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraActivation {
    pub version_id: String,
    #[serde(default = "default_lora_weight")]
    pub weight: f64,
    #[serde(default)]
    pub target_platform: Option<String>,
}

// ──────────────────────────────────────────────
// Request
// ──────────────────────────────────────────────

/// Names of the free-text fields usable as template placeholders.
pub const INPUT_FIELDS: [&str; 5] = ["subject", "context", "items", "environment", "restrictions"];

/// The five free-text input fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInputs {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub restrictions: Option<String>,
}

impl PromptInputs {
    /// Value for a placeholder name. Known fields that were not supplied
    /// resolve to `""`; unknown names return `None`.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "subject" => &self.subject,
            "context" => &self.context,
            "items" => &self.items,
            "environment" => &self.environment,
            "restrictions" => &self.restrictions,
            _ => return None,
        };
        Some(value.as_deref().unwrap_or(""))
    }
}

/// The compiler's sole input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub profile_id: String,
    #[serde(default)]
    pub blueprint_id: Option<String>,
    #[serde(default)]
    pub user_blueprint_id: Option<String>,
    /// Pins a user blueprint version; the current version is used otherwise.
    #[serde(default)]
    pub user_blueprint_version: Option<u32>,
    #[serde(default)]
    pub filters: BTreeMap<String, FilterValue>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(flatten)]
    pub inputs: PromptInputs,
    #[serde(default)]
    pub lora: Option<LoraActivation>,
}

// ──────────────────────────────────────────────
// Fragments (working representation between passes)
// ──────────────────────────────────────────────

/// Where a fragment came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOrigin {
    Block { key: String, block_type: BlockType },
    Constraint,
    Filter { key: String, dimension: String },
}

/// One piece of the composition, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub origin: FragmentOrigin,
}

impl Fragment {
    pub fn block(key: &str, block_type: BlockType, text: impl Into<String>) -> Self {
        Fragment {
            text: text.into(),
            origin: FragmentOrigin::Block {
                key: key.to_owned(),
                block_type,
            },
        }
    }

    pub fn constraint(text: impl Into<String>) -> Self {
        Fragment {
            text: text.into(),
            origin: FragmentOrigin::Constraint,
        }
    }

    pub fn filter(key: &str, dimension: &str, text: impl Into<String>) -> Self {
        Fragment {
            text: text.into(),
            origin: FragmentOrigin::Filter {
                key: key.to_owned(),
                dimension: dimension.to_owned(),
            },
        }
    }

    /// Block type used for profile reordering. Filter effects are untyped.
    pub fn block_type(&self) -> Option<BlockType> {
        match &self.origin {
            FragmentOrigin::Block { block_type, .. } => Some(*block_type),
            FragmentOrigin::Constraint => Some(BlockType::Constraint),
            FragmentOrigin::Filter { .. } => None,
        }
    }
}

// ──────────────────────────────────────────────
// Result
// ──────────────────────────────────────────────

/// How an active LoRA was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoraMode {
    InlineLora,
    CharacterPack,
}

impl fmt::Display for LoraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoraMode::InlineLora => "inline-lora",
            LoraMode::CharacterPack => "character-pack",
        })
    }
}

/// Recommended generation parameters for a character pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub aspect_ratio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

/// Reference-image instructions replacing inline LoRA syntax on platforms
/// that cannot load LoRAs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPack {
    pub prompt: String,
    pub instructions: String,
    pub reference_image_count: u32,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileMetadata {
    pub profile_name: String,
    pub blueprint_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blueprint_version: Option<u32>,
    pub block_count: usize,
    /// Filters that passed validation and were applied.
    pub filter_count: usize,
    /// Value each applied filter resolved to (after `random` selection).
    #[serde(default)]
    pub filter_values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lora_mode: Option<LoraMode>,
}

/// The compiler's sole output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    pub seed: String,
    pub compiled_prompt: String,
    pub score: u8,
    pub warnings: Vec<String>,
    pub metadata: CompileMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_pack: Option<CharacterPack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}
