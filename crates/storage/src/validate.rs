//! Catalog consistency checks.
//!
//! These catch authoring mistakes the compiler would only surface at
//! request time (as a fatal error or a warning). A catalog with issues
//! still loads; the checks are advisory.

use std::collections::BTreeSet;
use std::fmt;

use promptc_core::model::EFFECT_WILDCARD;
use promptc_core::pass1_resolve::substitute;
use promptc_core::{BlockType, FilterSchema, PromptInputs};
use serde::Serialize;

use crate::catalog::Catalog;

/// One consistency problem, located by the record it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogIssue {
    /// e.g. `blueprint 'portrait'`, `filter 'lens'`.
    pub location: String,
    pub message: String,
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Characters that would end or split an inline `<lora:name:weight>` tag.
const LORA_NAME_RESERVED: &[char] = &[':', '<', '>'];

fn issue(location: String, message: String) -> CatalogIssue {
    CatalogIssue { location, message }
}

/// Run every check over `catalog`. Issues come back grouped by section
/// (profiles, blueprints, user blueprints, blocks, filters, LoRA versions)
/// in catalog order.
pub fn check_catalog(catalog: &Catalog) -> Vec<CatalogIssue> {
    let mut issues = Vec::new();
    let block_keys: BTreeSet<&str> = catalog.blocks.iter().map(|b| b.key.as_str()).collect();
    let profile_ids: BTreeSet<&str> = catalog.profiles.iter().map(|p| p.id.as_str()).collect();

    // Profiles
    for profile in &catalog.profiles {
        let at = || format!("profile '{}'", profile.id);
        let mut seen: Vec<BlockType> = Vec::new();
        for t in &profile.preferred_order {
            if seen.contains(t) {
                issues.push(issue(at(), format!("preferred_order lists '{}' more than once", t)));
            } else {
                seen.push(*t);
            }
        }
        if profile.max_length == 0 {
            issues.push(issue(at(), "max_length is 0; every prompt would be empty".into()));
        }
    }

    // Blueprints
    for bp in &catalog.blueprints {
        let at = format!("blueprint '{}'", bp.id);
        check_block_refs(&at, &bp.blocks, &block_keys, &mut issues);
        check_compatible(&at, bp.compatible_profiles.as_deref(), &profile_ids, &mut issues);
    }

    for bp in &catalog.user_blueprints {
        let at = format!("user blueprint '{}'", bp.id);
        if bp.versions.is_empty() {
            issues.push(issue(at.clone(), "has no versions".into()));
        }
        for (i, snap) in bp.versions.iter().enumerate() {
            let expected = i as u32 + 1;
            if snap.version != expected {
                issues.push(issue(
                    at.clone(),
                    format!(
                        "version history out of sequence: found {} where {} was expected",
                        snap.version, expected
                    ),
                ));
            }
        }
        if let Some(current) = bp.current() {
            check_block_refs(&at, &current.blocks, &block_keys, &mut issues);
        }
        check_compatible(&at, bp.compatible_profiles.as_deref(), &profile_ids, &mut issues);
    }

    // Blocks
    let empty = PromptInputs::default();
    for block in &catalog.blocks {
        let (_, unknown) = substitute(&block.template, &empty);
        for name in unknown {
            issues.push(issue(
                format!("block '{}'", block.key),
                format!("template uses unknown placeholder '{{{}}}'", name),
            ));
        }
    }

    // Filters
    for filter in &catalog.filters {
        let at = || format!("filter '{}'", filter.key);
        match &filter.schema {
            FilterSchema::Options { options } => {
                if options.is_empty() {
                    issues.push(issue(at(), "options list is empty".into()));
                }
                for (dimension, table) in &filter.effect {
                    for value in table.keys() {
                        if value != EFFECT_WILDCARD && !options.contains(value) {
                            issues.push(issue(
                                at(),
                                format!(
                                    "effect on '{}' is keyed by '{}', which is not an option",
                                    dimension, value
                                ),
                            ));
                        }
                    }
                }
            }
            FilterSchema::Range { min, max } => {
                if min > max {
                    issues.push(issue(at(), format!("range min {} exceeds max {}", min, max)));
                }
            }
            FilterSchema::Text => {}
        }
    }

    // LoRA versions
    for lora in &catalog.lora_versions {
        if lora.name.trim().is_empty() {
            issues.push(issue(format!("lora version '{}'", lora.id), "name is empty".into()));
        } else if let Some(c) = lora.name.chars().find(|c| LORA_NAME_RESERVED.contains(c)) {
            issues.push(issue(
                format!("lora version '{}'", lora.id),
                format!(
                    "name '{}' contains '{}', which breaks <lora:name:weight> syntax",
                    lora.name, c
                ),
            ));
        }
    }

    tracing::debug!(issues = issues.len(), "catalog checked");
    issues
}

fn check_block_refs(
    at: &str,
    blocks: &[String],
    known: &BTreeSet<&str>,
    issues: &mut Vec<CatalogIssue>,
) {
    for key in blocks {
        if !known.contains(key.as_str()) {
            issues.push(issue(at.to_owned(), format!("references missing block '{}'", key)));
        }
    }
}

fn check_compatible(
    at: &str,
    compatible: Option<&[String]>,
    profiles: &BTreeSet<&str>,
    issues: &mut Vec<CatalogIssue>,
) {
    for id in compatible.unwrap_or_default() {
        if !profiles.contains(id.as_str()) {
            issues.push(issue(
                at.to_owned(),
                format!("compatible_profiles names unknown profile '{}'", id),
            ));
        }
    }
}
