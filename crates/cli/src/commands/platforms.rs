use promptc_core::platform::PLATFORMS;

use crate::OutputFormat;

pub(crate) fn cmd_platforms(output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(PLATFORMS)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!(
                "{:<14} {:<22} {:<6} {:<15} {:>4}  {}",
                "ID", "PLATFORM", "MEDIA", "LORA", "REFS", "PARAMETERS"
            );
            for p in PLATFORMS {
                let lora = if p.inline_lora {
                    "inline-lora"
                } else {
                    "character-pack"
                };
                let params = match p.duration_seconds {
                    Some(secs) => format!("{}, {}s", p.aspect_ratio, secs),
                    None => p.aspect_ratio.to_owned(),
                };
                println!(
                    "{:<14} {:<22} {:<6} {:<15} {:>4}  {}",
                    p.id,
                    p.label,
                    p.media.to_string(),
                    lora,
                    p.reference_images,
                    params
                );
            }
        }
    }
}
