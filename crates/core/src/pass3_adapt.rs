//! Pass 3: Profile adaptation -- regroup fragments in the profile's
//! preferred block order, enforce the length cap at a word boundary, flag
//! forbidden patterns, and branch between inline LoRA syntax and a
//! character pack.

use regex::RegexBuilder;

use crate::model::{
    BlockType, CharacterPack, Fragment, GenerationParameters, LoraMode, LoraStatus, LoraVersion,
    Profile, PromptInputs,
};
use crate::pass1_resolve::join_fragments;
use crate::platform::{self, MediaKind, PlatformCapability};

/// Accepted LoRA weight range; weights outside are clamped.
pub const LORA_WEIGHT_MIN: f64 = 0.0;
pub const LORA_WEIGHT_MAX: f64 = 2.0;

/// A LoRA activation joined with its looked-up version record.
#[derive(Debug, Clone, PartialEq)]
pub struct LoraContext {
    pub version: LoraVersion,
    pub weight: f64,
    pub target_platform: Option<String>,
}

/// Pass 3 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adaptation {
    pub prompt: String,
    pub warnings: Vec<String>,
    pub character_pack: Option<CharacterPack>,
    pub lora_mode: Option<LoraMode>,
}

/// Adapt the composition to `profile`.
pub fn adapt_for_profile(
    fragments: Vec<Fragment>,
    profile: &Profile,
    lora: Option<&LoraContext>,
) -> Adaptation {
    let mut warnings = Vec::new();

    for wanted in &profile.recommended_blocks {
        if !fragments.iter().any(|f| f.block_type() == Some(*wanted)) {
            warnings.push(format!(
                "profile '{}' recommends a '{}' block; blueprint has none",
                profile.name, wanted
            ));
        }
    }

    let ordered = reorder(fragments, &profile.preferred_order);
    let mut parts: Vec<&str> = Vec::with_capacity(ordered.len() + 1);
    parts.push(&profile.base_prompt);
    parts.extend(ordered.iter().map(|f| f.text.as_str()));
    let body = join_fragments(&parts);

    let plan = plan_lora(lora, &mut warnings);

    // Reserve room for the inline suffix so the cap covers the whole prompt.
    let mut suffix = plan.suffix;
    let mut body_limit = profile.max_length;
    if let Some(s) = &suffix {
        let needed = s.chars().count() + 1;
        if needed > profile.max_length {
            warnings.push(format!(
                "LoRA trigger syntax does not fit within max length {}; omitted",
                profile.max_length
            ));
            suffix = None;
        } else {
            body_limit = profile.max_length - needed;
        }
    }

    let body = match truncate_at_word(&body, body_limit) {
        Some(cut) => {
            warnings.push(format!(
                "prompt exceeded max length of {} characters; truncated to {} at a word boundary",
                profile.max_length,
                cut.chars().count() + suffix.as_ref().map(|s| s.chars().count() + 1).unwrap_or(0)
            ));
            cut
        }
        None => body,
    };

    let prompt = match &suffix {
        Some(s) => join_fragments(&[body.as_str(), s.as_str()]),
        None => body,
    };

    for pattern in &profile.forbidden_patterns {
        if matches_forbidden(pattern, &prompt) {
            warnings.push(format!(
                "forbidden pattern '{}' matched in compiled prompt",
                pattern
            ));
        }
    }

    let character_pack = match (plan.mode, lora) {
        (Some(LoraMode::CharacterPack), Some(ctx)) => Some(build_character_pack(&prompt, ctx)),
        _ => None,
    };

    tracing::debug!(
        length = prompt.chars().count(),
        lora_mode = ?plan.mode,
        "profile adaptation done"
    );

    Adaptation {
        prompt,
        warnings,
        character_pack,
        lora_mode: plan.mode,
    }
}

/// Stable regroup: types in `preferred` order first, everything else
/// (unlisted types, filter effects) after in original relative order.
pub fn reorder(mut fragments: Vec<Fragment>, preferred: &[BlockType]) -> Vec<Fragment> {
    let rank = |f: &Fragment| {
        f.block_type()
            .and_then(|t| preferred.iter().position(|p| *p == t))
            .unwrap_or(preferred.len())
    };
    fragments.sort_by_key(rank);
    fragments
}

/// Cut `text` to at most `limit` characters at the last whole-word
/// boundary. `None` when the text already fits. A single word longer than
/// the limit yields an empty string rather than a partial word.
pub fn truncate_at_word(text: &str, limit: usize) -> Option<String> {
    if text.chars().count() <= limit {
        return None;
    }
    let cut = text
        .char_indices()
        .nth(limit)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];
    let at_boundary = text[cut..].starts_with(char::is_whitespace);
    let kept = if at_boundary {
        head
    } else {
        match head.rfind(char::is_whitespace) {
            Some(i) => &head[..i],
            None => "",
        }
    };
    Some(kept.trim_end().to_owned())
}

/// Case-insensitive regex match, falling back to a case-insensitive
/// substring test when `pattern` is not a valid regex.
pub fn matches_forbidden(pattern: &str, text: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(text),
        Err(_) => text.to_lowercase().contains(&pattern.to_lowercase()),
    }
}

/// Negative prompt from the `restrictions` field, for profiles that accept
/// one.
pub fn negative_prompt(profile: &Profile, inputs: &PromptInputs) -> Option<String> {
    if !profile.capabilities.supports_negative_prompt {
        return None;
    }
    let text = join_fragments(&[inputs.restrictions.as_deref().unwrap_or("")]);
    (!text.is_empty()).then_some(text)
}

struct LoraPlan {
    mode: Option<LoraMode>,
    suffix: Option<String>,
}

fn plan_lora(lora: Option<&LoraContext>, warnings: &mut Vec<String>) -> LoraPlan {
    let Some(ctx) = lora else {
        return LoraPlan {
            mode: None,
            suffix: None,
        };
    };

    if ctx.version.status != LoraStatus::Ready {
        warnings.push(format!(
            "LoRA version '{}' is not ready (status: {}); LoRA skipped",
            ctx.version.id, ctx.version.status
        ));
        return LoraPlan {
            mode: None,
            suffix: None,
        };
    }

    if !platform::supports_inline_lora(ctx.target_platform.as_deref()) {
        return LoraPlan {
            mode: Some(LoraMode::CharacterPack),
            suffix: None,
        };
    }

    let weight = clamp_weight(ctx.weight, warnings);
    let tag = format!("<lora:{}:{}>", ctx.version.name, format_weight(weight));
    let suffix = join_fragments(&[ctx.version.trigger_word.as_str(), tag.as_str()]);
    LoraPlan {
        mode: Some(LoraMode::InlineLora),
        suffix: Some(suffix),
    }
}

fn clamp_weight(weight: f64, warnings: &mut Vec<String>) -> f64 {
    if !weight.is_finite() {
        warnings.push(format!("LoRA weight {} is not a number; using 1", weight));
        return 1.0;
    }
    let clamped = weight.clamp(LORA_WEIGHT_MIN, LORA_WEIGHT_MAX);
    if clamped != weight {
        warnings.push(format!(
            "LoRA weight {} is outside [{}, {}]; clamped to {}",
            weight,
            LORA_WEIGHT_MIN,
            LORA_WEIGHT_MAX,
            format_weight(clamped)
        ));
    }
    clamped
}

/// Two decimals, trailing zeros dropped: 0.8 → "0.8", 1.0 → "1".
fn format_weight(weight: f64) -> String {
    // -0.0 passes the clamp unchanged
    let weight = if weight == 0.0 { 0.0 } else { weight };
    let s = format!("{:.2}", weight);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_owned()
}

fn build_character_pack(prompt: &str, ctx: &LoraContext) -> CharacterPack {
    let known = ctx.target_platform.as_deref().and_then(platform::lookup);
    let caps: &PlatformCapability = known.unwrap_or(&platform::FALLBACK);
    let name = &ctx.version.name;
    let count = caps.reference_images.max(1);

    let mut lines = Vec::new();
    lines.push(match (known, ctx.target_platform.as_deref()) {
        (Some(p), _) => format!(
            "{} does not load LoRA weights; reproduce {} with reference images instead.",
            p.label, name
        ),
        (None, Some(raw)) => format!(
            "Platform '{}' is not known to load LoRA weights; reproduce {} with reference images instead.",
            raw, name
        ),
        (None, None) => format!(
            "No target platform was given; reproduce {} with reference images instead.",
            name
        ),
    });
    lines.push(format!(
        "Attach {} reference image{} of {} from the LoRA training set as the character reference.",
        count,
        if count == 1 { "" } else { "s" },
        name
    ));
    lines.push(match caps.media {
        MediaKind::Image => {
            "Keep face, build and distinguishing features consistent with the references; take scene, style and composition from the prompt.".to_owned()
        }
        MediaKind::Video => {
            "Use the clearest reference as the first frame or subject reference; take motion, scene and style from the prompt.".to_owned()
        }
    });
    if !ctx.version.trigger_word.trim().is_empty() {
        lines.push(format!(
            "Leave the trigger word '{}' out of the prompt; it has no effect on this platform.",
            ctx.version.trigger_word.trim()
        ));
    }

    CharacterPack {
        prompt: prompt.to_owned(),
        instructions: lines.join("\n"),
        reference_image_count: count,
        parameters: GenerationParameters {
            aspect_ratio: caps.aspect_ratio.to_owned(),
            duration_seconds: caps.duration_seconds,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Capabilities;

    fn profile(max_length: usize, order: &[BlockType]) -> Profile {
        Profile {
            id: "p".into(),
            name: "Test".into(),
            base_prompt: String::new(),
            preferred_order: order.to_vec(),
            forbidden_patterns: vec![],
            max_length,
            capabilities: Capabilities::default(),
            recommended_blocks: vec![],
        }
    }

    fn lora(status: LoraStatus, weight: f64, platform: Option<&str>) -> LoraContext {
        LoraContext {
            version: LoraVersion {
                id: "lv1".into(),
                name: "mira".into(),
                trigger_word: "mira_person".into(),
                status,
            },
            weight,
            target_platform: platform.map(str::to_owned),
        }
    }

    fn frags() -> Vec<Fragment> {
        vec![
            Fragment::block("style_block", BlockType::Style, "in watercolor style"),
            Fragment::filter("grain", "texture", "fine grain"),
            Fragment::block("cam", BlockType::Camera, "35mm"),
            Fragment::block("subj_block", BlockType::Subject, "A cat"),
        ]
    }

    #[test]
    fn reorders_by_preference_stably() {
        let out = reorder(frags(), &[BlockType::Subject, BlockType::Style]);
        let texts: Vec<&str> = out.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["A cat", "in watercolor style", "fine grain", "35mm"]);
    }

    #[test]
    fn empty_preference_keeps_order() {
        let out = reorder(frags(), &[]);
        assert_eq!(out, frags());
    }

    #[test]
    fn prefix_comes_first() {
        let mut p = profile(200, &[BlockType::Subject]);
        p.base_prompt = "masterpiece,".into();
        let a = adapt_for_profile(frags(), &p, None);
        assert_eq!(
            a.prompt,
            "masterpiece, A cat in watercolor style fine grain 35mm"
        );
        assert!(a.warnings.is_empty());
    }

    #[test]
    fn truncation_respects_words() {
        assert_eq!(truncate_at_word("short", 10), None);
        assert_eq!(truncate_at_word("hello world", 11), None);
        assert_eq!(truncate_at_word("hello world again", 11).unwrap(), "hello world");
        assert_eq!(truncate_at_word("hello world again", 13).unwrap(), "hello world");
        assert_eq!(truncate_at_word("hello world", 3).unwrap(), "");
        assert_eq!(truncate_at_word("héllo wörld", 8).unwrap(), "héllo");
    }

    #[test]
    fn over_length_prompt_is_truncated_with_warning() {
        let a = adapt_for_profile(frags(), &profile(20, &[]), None);
        assert_eq!(a.prompt, "in watercolor style");
        assert_eq!(a.warnings.len(), 1);
        assert!(a.warnings[0].starts_with("prompt exceeded max length of 20"));
    }

    #[test]
    fn forbidden_patterns_warn_without_editing() {
        let mut p = profile(200, &[]);
        p.forbidden_patterns = vec!["WATER\\w+".into(), "fine\\s+GRAIN".into(), "dog".into()];
        let a = adapt_for_profile(frags(), &p, None);
        assert!(a.prompt.contains("watercolor"));
        assert_eq!(
            a.warnings,
            vec![
                "forbidden pattern 'WATER\\w+' matched in compiled prompt",
                "forbidden pattern 'fine\\s+GRAIN' matched in compiled prompt",
            ]
        );
    }

    #[test]
    fn invalid_regex_falls_back_to_substring() {
        assert!(matches_forbidden("[nsfw", "Tagged [NSFW content"));
        assert!(!matches_forbidden("[nsfw", "clean"));
        assert!(!matches_forbidden("", "anything"));
    }

    #[test]
    fn recommended_blocks_warn_when_missing() {
        let mut p = profile(200, &[]);
        p.recommended_blocks = vec![BlockType::Camera, BlockType::Layout];
        let a = adapt_for_profile(frags(), &p, None);
        assert_eq!(
            a.warnings,
            vec!["profile 'Test' recommends a 'layout' block; blueprint has none"]
        );
    }

    #[test]
    fn inline_lora_appends_trigger_syntax() {
        let ctx = lora(LoraStatus::Ready, 0.8, Some("flux_dev"));
        let a = adapt_for_profile(frags(), &profile(200, &[]), Some(&ctx));
        assert!(a.prompt.ends_with("mira_person <lora:mira:0.8>"));
        assert_eq!(a.lora_mode, Some(LoraMode::InlineLora));
        assert!(a.character_pack.is_none());
        assert!(a.warnings.is_empty());
    }

    #[test]
    fn inline_lora_reserves_room_under_cap() {
        let ctx = lora(LoraStatus::Ready, 1.0, Some("sdxl"));
        let a = adapt_for_profile(frags(), &profile(40, &[]), Some(&ctx));
        assert!(a.prompt.chars().count() <= 40, "{}", a.prompt);
        assert_eq!(a.prompt, "in watercolor mira_person <lora:mira:1>");
        assert_eq!(a.warnings.len(), 1);
        assert!(a.warnings[0].contains("truncated to 39"));
    }

    #[test]
    fn suffix_that_cannot_fit_is_dropped() {
        let ctx = lora(LoraStatus::Ready, 1.0, Some("sdxl"));
        let a = adapt_for_profile(frags(), &profile(10, &[]), Some(&ctx));
        assert!(!a.prompt.contains("<lora:"));
        assert!(a.prompt.chars().count() <= 10);
        assert!(a.warnings[0].contains("does not fit"));
    }

    #[test]
    fn character_pack_for_reference_platforms() {
        let ctx = lora(LoraStatus::Ready, 0.8, Some("midjourney"));
        let a = adapt_for_profile(frags(), &profile(200, &[]), Some(&ctx));
        assert!(!a.prompt.contains("<lora:"));
        assert!(!a.prompt.contains("mira_person"));
        assert_eq!(a.lora_mode, Some(LoraMode::CharacterPack));
        let pack = a.character_pack.unwrap();
        assert_eq!(pack.prompt, a.prompt);
        assert_eq!(pack.reference_image_count, 4);
        assert_eq!(pack.parameters.aspect_ratio, "1:1");
        assert_eq!(pack.parameters.duration_seconds, None);
        assert!(pack.instructions.starts_with("Midjourney does not load LoRA weights"));
    }

    #[test]
    fn video_character_pack_has_duration() {
        let ctx = lora(LoraStatus::Ready, 0.8, Some("kling"));
        let pack = adapt_for_profile(frags(), &profile(200, &[]), Some(&ctx))
            .character_pack
            .unwrap();
        assert_eq!(pack.parameters.aspect_ratio, "16:9");
        assert_eq!(pack.parameters.duration_seconds, Some(5));
    }

    #[test]
    fn unspecified_platform_gets_character_pack() {
        let ctx = lora(LoraStatus::Ready, 0.8, None);
        let a = adapt_for_profile(frags(), &profile(200, &[]), Some(&ctx));
        let pack = a.character_pack.unwrap();
        assert_eq!(pack.reference_image_count, platform::FALLBACK.reference_images);
        assert!(pack.instructions.starts_with("No target platform was given"));
    }

    #[test]
    fn lora_not_ready_is_skipped() {
        let ctx = lora(LoraStatus::Training, 0.8, Some("flux_dev"));
        let a = adapt_for_profile(frags(), &profile(200, &[]), Some(&ctx));
        assert_eq!(a.lora_mode, None);
        assert!(!a.prompt.contains("<lora:"));
        assert_eq!(
            a.warnings,
            vec!["LoRA version 'lv1' is not ready (status: training); LoRA skipped"]
        );
    }

    #[test]
    fn weight_is_clamped() {
        let ctx = lora(LoraStatus::Ready, 3.5, Some("flux_dev"));
        let a = adapt_for_profile(frags(), &profile(200, &[]), Some(&ctx));
        assert!(a.prompt.ends_with("<lora:mira:2>"));
        assert_eq!(
            a.warnings,
            vec!["LoRA weight 3.5 is outside [0, 2]; clamped to 2"]
        );
    }

    #[test]
    fn weight_formatting() {
        assert_eq!(format_weight(0.8), "0.8");
        assert_eq!(format_weight(1.0), "1");
        assert_eq!(format_weight(0.75), "0.75");
        assert_eq!(format_weight(0.0), "0");
        assert_eq!(format_weight(-0.0), "0");
    }

    #[test]
    fn negative_zero_weight_renders_as_zero() {
        let ctx = lora(LoraStatus::Ready, -0.0, Some("sdxl"));
        let a = adapt_for_profile(frags(), &profile(200, &[]), Some(&ctx));
        assert!(a.prompt.ends_with("<lora:mira:0>"), "{}", a.prompt);
        assert!(a.warnings.is_empty());
    }

    #[test]
    fn forbidden_pattern_in_lora_suffix_is_flagged() {
        let mut ctx = lora(LoraStatus::Ready, 1.0, Some("sdxl"));
        ctx.version.name = "nsfw_mix".into();
        let mut p = profile(200, &[]);
        p.forbidden_patterns = vec!["nsfw".into()];
        let a = adapt_for_profile(frags(), &p, Some(&ctx));
        assert!(a.prompt.ends_with("<lora:nsfw_mix:1>"));
        assert_eq!(
            a.warnings,
            vec!["forbidden pattern 'nsfw' matched in compiled prompt"]
        );
    }

    #[test]
    fn negative_prompt_requires_capability() {
        let inputs = PromptInputs {
            restrictions: Some("  blurry,  extra fingers ".into()),
            ..Default::default()
        };
        let mut p = profile(100, &[]);
        assert_eq!(negative_prompt(&p, &inputs), None);
        p.capabilities.supports_negative_prompt = true;
        assert_eq!(
            negative_prompt(&p, &inputs).as_deref(),
            Some("blurry, extra fingers")
        );
        assert_eq!(negative_prompt(&p, &PromptInputs::default()), None);
    }
}
