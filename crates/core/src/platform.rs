//! Static platform-capability table.
//!
//! Decides, per generation platform, whether inline LoRA trigger syntax is
//! accepted and which parameters a character pack should recommend. The
//! LoRA branch in pass 3 consults only this table.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        })
    }
}

/// Capabilities of one generation platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformCapability {
    pub id: &'static str,
    pub label: &'static str,
    pub media: MediaKind,
    /// Accepts `<lora:name:weight>` in the prompt.
    pub inline_lora: bool,
    /// Reference images to attach in character-pack mode.
    pub reference_images: u32,
    pub aspect_ratio: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

const fn image(id: &'static str, label: &'static str, inline_lora: bool, refs: u32) -> PlatformCapability {
    PlatformCapability {
        id,
        label,
        media: MediaKind::Image,
        inline_lora,
        reference_images: refs,
        aspect_ratio: "1:1",
        duration_seconds: None,
    }
}

const fn video(id: &'static str, label: &'static str, refs: u32, seconds: u32) -> PlatformCapability {
    PlatformCapability {
        id,
        label,
        media: MediaKind::Video,
        inline_lora: false,
        reference_images: refs,
        aspect_ratio: "16:9",
        duration_seconds: Some(seconds),
    }
}

/// Known platforms. Ids are normalized (see `normalize_platform_id`).
pub const PLATFORMS: &[PlatformCapability] = &[
    // Inline LoRA: flux, sdxl and sd1.5 families
    image("flux_dev", "FLUX.1 [dev]", true, 0),
    image("flux_schnell", "FLUX.1 [schnell]", true, 0),
    image("flux_pro", "FLUX.1 [pro]", true, 0),
    image("sdxl", "Stable Diffusion XL", true, 0),
    image("sdxl_turbo", "SDXL Turbo", true, 0),
    image("sd1_5", "Stable Diffusion 1.5", true, 0),
    // Reference-image platforms
    image("midjourney", "Midjourney", false, 4),
    image("dalle3", "DALL-E 3", false, 1),
    image("gpt_image", "GPT Image", false, 4),
    image("ideogram", "Ideogram", false, 3),
    image("imagen", "Imagen", false, 3),
    image("leonardo", "Leonardo", false, 3),
    video("runway", "Runway", 1, 10),
    video("kling", "Kling", 4, 5),
    video("luma", "Luma Dream Machine", 1, 5),
    video("pika", "Pika", 1, 5),
    video("sora", "Sora", 1, 10),
    video("veo", "Veo", 3, 8),
];

/// Character-pack defaults when the platform is unknown or unspecified.
pub const FALLBACK: PlatformCapability = image("unspecified", "the target platform", false, 3);

/// Aliases mapped onto table ids after normalization.
const ALIASES: &[(&str, &str)] = &[
    ("sd15", "sd1_5"),
    ("stable_diffusion_1_5", "sd1_5"),
    ("stable_diffusion_xl", "sdxl"),
    ("dall_e_3", "dalle3"),
    ("dalle_3", "dalle3"),
    ("mj", "midjourney"),
    ("flux", "flux_dev"),
    ("runway_gen3", "runway"),
    ("runway_gen4", "runway"),
];

/// Lowercase, map `-`, `.` and spaces to `_`.
pub fn normalize_platform_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | '.' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Look a platform up by id or alias.
pub fn lookup(raw: &str) -> Option<&'static PlatformCapability> {
    let id = normalize_platform_id(raw);
    let id = ALIASES
        .iter()
        .find(|(alias, _)| *alias == id)
        .map(|(_, target)| *target)
        .unwrap_or(id.as_str());
    PLATFORMS.iter().find(|p| p.id == id)
}

/// Whether inline LoRA syntax may be emitted for `target`. Unknown and
/// unspecified platforms never qualify.
pub fn supports_inline_lora(target: Option<&str>) -> bool {
    target.and_then(lookup).map(|p| p.inline_lora).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_allowlist() {
        assert!(supports_inline_lora(Some("flux_dev")));
        assert!(supports_inline_lora(Some("FLUX-dev")));
        assert!(supports_inline_lora(Some("sd1.5")));
        assert!(supports_inline_lora(Some("SDXL")));
        assert!(!supports_inline_lora(Some("midjourney")));
        assert!(!supports_inline_lora(Some("kling")));
        assert!(!supports_inline_lora(Some("some-new-model")));
        assert!(!supports_inline_lora(None));
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(lookup("sd15").unwrap().id, "sd1_5");
        assert_eq!(lookup("DALL-E 3").unwrap().id, "dalle3");
        assert_eq!(lookup("Runway Gen3").unwrap().id, "runway");
    }

    #[test]
    fn video_platforms_carry_duration() {
        for p in PLATFORMS {
            assert_eq!(p.media == MediaKind::Video, p.duration_seconds.is_some(), "{}", p.id);
            assert!(!(p.media == MediaKind::Video && p.inline_lora), "{}", p.id);
        }
    }

    #[test]
    fn ids_are_unique_and_normalized() {
        for (i, p) in PLATFORMS.iter().enumerate() {
            assert_eq!(normalize_platform_id(p.id), p.id);
            assert!(PLATFORMS[i + 1..].iter().all(|q| q.id != p.id), "{}", p.id);
        }
    }
}
