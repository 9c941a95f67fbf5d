//! Pass 4: Quality scoring -- rate the compiled prompt and gather the
//! warnings of every earlier pass in stage order.

use crate::model::Profile;

pub const MAX_SCORE: u8 = 100;
/// Deduction per warning.
pub const WARNING_PENALTY: u32 = 10;
/// Deduction for a prompt under a tenth of the profile's max length.
pub const SHORT_PROMPT_PENALTY: u32 = 5;

/// Pass 4 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub score: u8,
    pub warnings: Vec<String>,
}

/// Score `prompt`. `stages` are the per-stage warning lists in pipeline
/// order; they are concatenated without reordering or deduplication.
pub fn score<I>(prompt: &str, stages: I, profile: &Profile) -> Score
where
    I: IntoIterator<Item = Vec<String>>,
{
    let warnings: Vec<String> = stages.into_iter().flatten().collect();

    let mut penalty = (warnings.len() as u32).saturating_mul(WARNING_PENALTY);
    if prompt.chars().count().saturating_mul(10) < profile.max_length {
        penalty = penalty.saturating_add(SHORT_PROMPT_PENALTY);
    }
    let score = u32::from(MAX_SCORE).saturating_sub(penalty) as u8;

    Score { score, warnings }
}
