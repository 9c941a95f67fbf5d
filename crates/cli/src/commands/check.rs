use std::path::Path;
use std::process;

use promptc_storage::{check_catalog, MemoryStore};

use crate::commands::read_catalog;
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_check(catalog_path: &Path, output: OutputFormat, quiet: bool) {
    let catalog = read_catalog(catalog_path, output, quiet);
    let issues = check_catalog(&catalog);

    // Duplicate ids are a load error rather than an issue; report them too.
    let load_error = MemoryStore::from_catalog(catalog).err().map(|e| e.to_string());
    let failed = !issues.is_empty() || load_error.is_some();

    match output {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "catalog": catalog_path.display().to_string(),
                "ok": !failed,
                "load_error": load_error,
                "issues": issues,
            });
            let json = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if let Some(e) = &load_error {
                report_error(&format!("error: {}", e), output, quiet);
            }
            if !quiet {
                for issue in &issues {
                    println!("  - {}", issue);
                }
                if failed {
                    println!(
                        "{}: {} issue(s) found",
                        catalog_path.display(),
                        issues.len() + usize::from(load_error.is_some())
                    );
                } else {
                    println!("{}: no issues found", catalog_path.display());
                }
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
