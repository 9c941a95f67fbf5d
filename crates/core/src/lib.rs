//! promptc-core: deterministic prompt compiler core library.
//!
//! Turns a compile request (profile, blueprint, filters, free-text inputs,
//! optional LoRA activation) into a compiled prompt with a quality score
//! and warnings. Compilation is pure apart from fresh-seed generation: the
//! same seed and the same records always produce the same result.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`compile()`] -- run the full pipeline
//! - [`RecordLookup`] -- read-only record access the compiler goes through
//! - [`CompileRequest`], [`CompileResult`] -- input and output
//! - [`CompileError`] -- fatal compilation error
//! - Record types: [`Profile`], [`Blueprint`], [`UserBlueprint`],
//!   [`Block`], [`Filter`], [`LoraVersion`]
//!
//! Individual pass entry functions are also re-exported for selective
//! pipeline execution.

pub mod compile;
pub mod error;
pub mod lookup;
pub mod model;
pub mod pass1_resolve;
pub mod pass2_filters;
pub mod pass3_adapt;
pub mod pass4_score;
pub mod platform;
pub mod seed;

// ── Convenience re-exports: key types ────────────────────────────────

pub use error::{CompileError, LookupError};
pub use lookup::RecordLookup;
pub use model::{
    Block, BlockType, Blueprint, BlueprintVersion, Capabilities, CharacterPack, CompileMetadata,
    CompileRequest, CompileResult, Filter, FilterSchema, FilterValue, Fragment, FragmentOrigin,
    GenerationParameters, LoraActivation, LoraMode, LoraStatus, LoraVersion, Profile,
    PromptInputs, UserBlueprint,
};
pub use platform::PlatformCapability;
pub use seed::SeedStream;

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use compile::compile;
pub use pass1_resolve::{join_fragments, resolve_blocks, resolve_constraints};
pub use pass2_filters::apply_filters;
pub use pass3_adapt::adapt_for_profile;
pub use pass4_score::score;
pub use seed::resolve_seed;
