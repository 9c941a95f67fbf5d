//! Prompt compiler: request + record lookups -> CompileResult.
//!
//! This is a thin orchestrator that resolves the referenced records and
//! calls each pass module in order.

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::lookup::RecordLookup;
use crate::model::{
    Blueprint, CompileMetadata, CompileRequest, CompileResult, LoraMode, Profile,
};
use crate::pass1_resolve;
use crate::pass2_filters;
use crate::pass3_adapt::{self, LoraContext};
use crate::pass4_score;
use crate::seed;

/// Compile `request` against the records behind `lookups`.
///
/// Pure apart from fresh-seed generation when the request carries no seed:
/// the same non-empty seed and the same records always give the same result.
#[tracing::instrument(skip_all, fields(profile = %request.profile_id))]
pub fn compile<L>(request: &CompileRequest, lookups: &L) -> Result<CompileResult, CompileError>
where
    L: RecordLookup + ?Sized,
{
    let seed = seed::resolve_seed(request.seed.as_deref());
    let mut resolver_warnings = Vec::new();

    // Records
    let (blueprint, blueprint_version) =
        resolve_blueprint(request, lookups, &mut resolver_warnings)?;
    let profile = lookups
        .profile(&request.profile_id)?
        .ok_or_else(|| CompileError::ProfileNotFound {
            profile_id: request.profile_id.clone(),
        })?;
    if !blueprint.is_compatible_with(&profile.id) {
        resolver_warnings.insert(
            0,
            format!(
                "blueprint '{}' is not listed as compatible with profile '{}'",
                blueprint.id, profile.id
            ),
        );
    }
    let blocks = lookups.blocks(&blueprint.blocks)?;
    let filter_keys: Vec<String> = request.filters.keys().cloned().collect();
    let filters = lookups.filters(&filter_keys)?;
    let lora = resolve_lora(request, lookups)?;

    // Pass 1: blocks, then constraints
    let resolution = pass1_resolve::resolve_blocks(&blueprint.blocks, &blocks, &request.inputs)?;
    resolver_warnings.extend(resolution.warnings);
    let mut fragments = resolution.fragments;
    fragments.extend(pass1_resolve::resolve_constraints(&blueprint.constraints));
    tracing::debug!(blocks = blueprint.blocks.len(), "blocks resolved");

    // Pass 2: filter effects
    let filtered = pass2_filters::apply_filters(fragments, &request.filters, &filters, &seed)?;

    // Pass 3: profile adaptation
    let adapted = pass3_adapt::adapt_for_profile(filtered.fragments, &profile, lora.as_ref());

    // Pass 4: scoring
    let scored = pass4_score::score(
        &adapted.prompt,
        [resolver_warnings, filtered.warnings, adapted.warnings],
        &profile,
    );

    let negative_prompt = pass3_adapt::negative_prompt(&profile, &request.inputs);
    let metadata = metadata(
        &profile,
        &blueprint,
        blueprint_version,
        &filtered.applied,
        adapted.lora_mode,
    );

    tracing::debug!(score = scored.score, warnings = scored.warnings.len(), "compiled");

    Ok(CompileResult {
        seed,
        compiled_prompt: adapted.prompt,
        score: scored.score,
        warnings: scored.warnings,
        metadata,
        character_pack: adapted.character_pack,
        negative_prompt,
    })
}

/// Resolve the request's blueprint reference. A user blueprint wins over a
/// system blueprint when both are named.
fn resolve_blueprint<L>(
    request: &CompileRequest,
    lookups: &L,
    warnings: &mut Vec<String>,
) -> Result<(Blueprint, Option<u32>), CompileError>
where
    L: RecordLookup + ?Sized,
{
    let system_id = non_empty(request.blueprint_id.as_deref());
    let user_id = non_empty(request.user_blueprint_id.as_deref());

    match (user_id, system_id) {
        (Some(user_id), system_id) => {
            if let Some(system_id) = system_id {
                warnings.push(format!(
                    "both blueprint_id '{}' and user_blueprint_id '{}' given; using the user blueprint",
                    system_id, user_id
                ));
            }
            let user = lookups
                .user_blueprint(user_id)?
                .ok_or_else(|| CompileError::BlueprintNotFound {
                    blueprint_id: user_id.to_owned(),
                })?;
            let blueprint = user
                .at_version(request.user_blueprint_version)
                .ok_or_else(|| CompileError::BlueprintVersionNotFound {
                    blueprint_id: user_id.to_owned(),
                    version: request.user_blueprint_version.unwrap_or(0),
                })?;
            let version = request.user_blueprint_version.unwrap_or_else(|| user.version());
            Ok((blueprint, Some(version)))
        }
        (None, Some(system_id)) => {
            let blueprint = lookups
                .blueprint(system_id)?
                .ok_or_else(|| CompileError::BlueprintNotFound {
                    blueprint_id: system_id.to_owned(),
                })?;
            Ok((blueprint, None))
        }
        (None, None) => Err(CompileError::MissingBlueprintReference),
    }
}

fn resolve_lora<L>(request: &CompileRequest, lookups: &L) -> Result<Option<LoraContext>, CompileError>
where
    L: RecordLookup + ?Sized,
{
    let Some(activation) = &request.lora else {
        return Ok(None);
    };
    let version = lookups
        .lora_version(&activation.version_id)?
        .ok_or_else(|| CompileError::LoraVersionNotFound {
            version_id: activation.version_id.clone(),
        })?;
    Ok(Some(LoraContext {
        version,
        weight: activation.weight,
        target_platform: activation.target_platform.clone(),
    }))
}

fn metadata(
    profile: &Profile,
    blueprint: &Blueprint,
    blueprint_version: Option<u32>,
    applied: &BTreeMap<String, String>,
    lora_mode: Option<LoraMode>,
) -> CompileMetadata {
    CompileMetadata {
        profile_name: profile.name.clone(),
        blueprint_name: blueprint.name.clone(),
        blueprint_version,
        block_count: blueprint.blocks.len(),
        filter_count: applied.len(),
        filter_values: applied.clone(),
        lora_mode,
    }
}

fn non_empty(id: Option<&str>) -> Option<&str> {
    id.filter(|s| !s.trim().is_empty())
}
