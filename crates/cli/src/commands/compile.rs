use std::path::Path;
use std::process;

use promptc_core::{CompileRequest, CompileResult};

use crate::commands::load_store;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_compile(
    request_path: &Path,
    catalog_path: &Path,
    seed: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    // Read request file
    let request_str = match std::fs::read_to_string(request_path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!(
                "error reading request '{}': {}",
                request_path.display(),
                e
            );
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut request: CompileRequest = match serde_json::from_str(&request_str) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "error parsing request '{}': {}",
                request_path.display(),
                e
            );
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    if let Some(seed) = seed {
        request.seed = Some(seed.to_owned());
    }

    let store = load_store(catalog_path, output, quiet);

    match promptc_core::compile(&request, &store) {
        Ok(result) => match output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&result)
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                println!("{}", json);
            }
            OutputFormat::Text => print_text(&result, quiet),
        },
        Err(e) => {
            match output {
                OutputFormat::Json => {
                    let err_json = serde_json::to_string_pretty(&e.to_json_value())
                        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", e));
                    eprintln!("{}", err_json);
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("compile error [{}]: {}", e.code(), e);
                    }
                }
            }
            process::exit(1);
        }
    }
}

/// Prompt first on its own line; details follow unless `quiet`.
fn print_text(result: &CompileResult, quiet: bool) {
    println!("{}", result.compiled_prompt);
    if quiet {
        return;
    }
    println!();
    println!("  Seed:      {}", result.seed);
    println!("  Score:     {}", result.score);
    println!(
        "  Blueprint: {} ({} blocks, {} filters)",
        result.metadata.blueprint_name, result.metadata.block_count, result.metadata.filter_count
    );
    println!("  Profile:   {}", result.metadata.profile_name);
    if let Some(negative) = &result.negative_prompt {
        println!("  Negative:  {}", negative);
    }
    if let Some(mode) = result.metadata.lora_mode {
        println!("  LoRA:      {}", mode);
    }

    if !result.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &result.warnings {
            println!("  - {}", w);
        }
    }

    if let Some(pack) = &result.character_pack {
        println!();
        println!("Character pack:");
        println!("  Reference images: {}", pack.reference_image_count);
        match pack.parameters.duration_seconds {
            Some(secs) => println!(
                "  Parameters:       aspect ratio {}, {}s",
                pack.parameters.aspect_ratio, secs
            ),
            None => println!("  Parameters:       aspect ratio {}", pack.parameters.aspect_ratio),
        }
        for line in pack.instructions.lines() {
            println!("  {}", line);
        }
    }
}
