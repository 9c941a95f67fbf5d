use std::path::Path;
use std::process;

use crate::commands::load_store;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_history(catalog_path: &Path, id: &str, output: OutputFormat, quiet: bool) {
    let store = load_store(catalog_path, output, quiet);
    let versions = match store.blueprint_versions(id) {
        Ok(v) => v,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "id": id,
                "versions": versions,
            }))
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            let current = versions.last().map(|v| v.version);
            for v in versions {
                let marker = if Some(v.version) == current { " (current)" } else { "" };
                println!("v{}{}: {}", v.version, marker, v.blocks.join(", "));
                if !quiet && !v.constraints.is_empty() {
                    println!("    constraints: {}", v.constraints.join("; "));
                }
            }
        }
    }
}
