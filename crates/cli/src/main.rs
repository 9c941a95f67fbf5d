mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Deterministic prompt compiler.
#[derive(Parser)]
#[command(name = "promptc", version, about = "Deterministic prompt compiler")]
struct Cli {
    /// Output format (text or json) [default: text, or [output] format]
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file [default: ./promptc.toml when present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `promptc_core=trace` (RUST_LOG wins)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request JSON file into a prompt
    Compile {
        /// Path to the compile request JSON file
        #[arg(long)]
        request: PathBuf,
        /// Path to the catalog JSON file
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Override the request's seed
        #[arg(long)]
        seed: Option<String>,
    },

    /// Print a fresh reproducibility seed
    Seed,

    /// List the generation platforms and their LoRA handling
    Platforms,

    /// Run consistency checks over a catalog
    Check {
        /// Path to the catalog JSON file
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Show the version history of a user blueprint
    History {
        /// User blueprint id
        id: String,
        /// Path to the catalog JSON file
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e, cli.output.unwrap_or(OutputFormat::Text), cli.quiet);
            process::exit(1);
        }
    };
    let output = cli
        .output
        .or(config.output.format.map(OutputFormat::from))
        .unwrap_or(OutputFormat::Text);
    logging::init(cli.log.as_deref().or(config.log.filter.as_deref()));

    match cli.command {
        Commands::Compile {
            request,
            catalog,
            seed,
        } => {
            let catalog = resolve_catalog(catalog, &config, output, cli.quiet);
            commands::compile::cmd_compile(&request, &catalog, seed.as_deref(), output, cli.quiet);
        }
        Commands::Seed => {
            let seed = promptc_core::resolve_seed(None);
            match output {
                OutputFormat::Text => println!("{}", seed),
                OutputFormat::Json => println!("{}", serde_json::json!({ "seed": seed })),
            }
        }
        Commands::Platforms => {
            commands::platforms::cmd_platforms(output);
        }
        Commands::Check { catalog } => {
            let catalog = resolve_catalog(catalog, &config, output, cli.quiet);
            commands::check::cmd_check(&catalog, output, cli.quiet);
        }
        Commands::History { id, catalog } => {
            let catalog = resolve_catalog(catalog, &config, output, cli.quiet);
            commands::history::cmd_history(&catalog, &id, output, cli.quiet);
        }
    }
}

/// `--catalog`, else `[catalog] path`, else exit with an error.
fn resolve_catalog(
    flag: Option<PathBuf>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) -> PathBuf {
    match flag.or_else(|| config.catalog.path.clone()) {
        Some(path) => path,
        None => {
            report_error(
                "no catalog given: pass --catalog or set [catalog] path in promptc.toml",
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
