//! Pass 1: Template block resolution -- look up each blueprint block in
//! stored order, substitute input placeholders, and emit fragments.
//!
//! Also owns `join_fragments`, the whitespace normalization every later
//! pass uses to turn fragments into text.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::CompileError;
use crate::model::{Block, Fragment, PromptInputs};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

/// Pass 1 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub fragments: Vec<Fragment>,
    pub warnings: Vec<String>,
}

/// Resolve `block_keys` in order against `blocks`.
///
/// A missing key is fatal. Unknown placeholders are left in the text and
/// reported once per block and name.
pub fn resolve_blocks(
    block_keys: &[String],
    blocks: &BTreeMap<String, Block>,
    inputs: &PromptInputs,
) -> Result<Resolution, CompileError> {
    let mut fragments = Vec::with_capacity(block_keys.len());
    let mut warnings = Vec::new();

    for key in block_keys {
        let block = blocks
            .get(key)
            .ok_or_else(|| CompileError::BlockNotFound { key: key.clone() })?;
        let (text, unknown) = substitute(&block.template, inputs);
        for name in unknown {
            warnings.push(format!(
                "unknown placeholder '{{{}}}' in block '{}' left unresolved",
                name, key
            ));
        }
        fragments.push(Fragment::block(key, block.block_type, text));
    }

    Ok(Resolution {
        fragments,
        warnings,
    })
}

/// Blueprint constraint strings as `constraint` fragments. Plain text, no
/// placeholder substitution.
pub fn resolve_constraints(constraints: &[String]) -> Vec<Fragment> {
    constraints
        .iter()
        .map(|c| Fragment::constraint(c.as_str()))
        .collect()
}

/// Replace `{field}` placeholders with input values in one left-to-right
/// scan. Substituted values are never rescanned, so input text containing
/// braces stays literal. Returns the text and the unknown names in order of
/// first occurrence.
pub fn substitute(template: &str, inputs: &PromptInputs) -> (String, Vec<String>) {
    let mut unknown: Vec<String> = Vec::new();
    let text = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match inputs.field(name) {
            Some(value) => value.to_owned(),
            None => {
                if !unknown.iter().any(|u| u == name) {
                    unknown.push(name.to_owned());
                }
                caps[0].to_owned()
            }
        }
    });
    (text.into_owned(), unknown)
}

/// Join fragments with single spaces: each fragment is trimmed, empty
/// fragments are dropped, and runs of spaces collapse to one.
///
/// Idempotent: `join_fragments(&[join_fragments(x)]) == join_fragments(x)`.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    let mut joined = String::new();
    for fragment in fragments {
        let text = fragment.as_ref().trim();
        if text.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(text);
    }
    collapse_spaces(&joined)
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for c in text.chars() {
        if c == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        out.push(c);
    }
    out
}
