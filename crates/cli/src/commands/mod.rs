pub(crate) mod check;
pub(crate) mod compile;
pub(crate) mod history;
pub(crate) mod platforms;

use std::path::Path;
use std::process;

use promptc_storage::{Catalog, MemoryStore};

use crate::{report_error, OutputFormat};

/// Read a catalog file, or report the error and exit.
pub(crate) fn read_catalog(path: &Path, output: OutputFormat, quiet: bool) -> Catalog {
    match Catalog::read(path) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

/// Load and index a catalog file, or report the error and exit.
pub(crate) fn load_store(path: &Path, output: OutputFormat, quiet: bool) -> MemoryStore {
    match MemoryStore::from_catalog(read_catalog(path, output, quiet)) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
