mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CATALOG_ERROR, EXIT_FAILURE, EXIT_FETCH_ERROR};
use semver::Version;
use std::path::PathBuf;
use std::process::ExitCode;
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "fontcask",
    version,
    about = "Compile a font catalog into a versioned distribution manifest"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile a source catalog into an output directory with a manifest and
    /// staged assets.
    Compile {
        /// Path to the source catalog JSON file.
        #[arg(default_value = "catalog.json")]
        catalog: PathBuf,
        /// Version to stamp into the compiled manifest.
        #[arg(long)]
        version: Version,
        /// Base URL locally-sourced assets will be served under.
        #[arg(long, env = "FONTCASK_BASE_URL")]
        base_url: Url,
        /// Output directory (replaced wholesale on success).
        #[arg(short, long, default_value = "dist")]
        output: PathBuf,
        /// Directory _localPath references resolve against (defaults to the
        /// catalog's directory).
        #[arg(long)]
        base_path: Option<PathBuf>,
    },
    /// Normalize a source catalog in place: sort lists, assign placeholder ids.
    Fmt {
        /// Path to the source catalog JSON file.
        #[arg(default_value = "catalog.json")]
        catalog: PathBuf,
        /// Report findings without rewriting the catalog.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("FONTCASK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Compile {
            catalog,
            version,
            base_url,
            output,
            base_path,
        } => commands::compile::run(
            &catalog,
            &version,
            &base_url,
            &output,
            base_path.as_deref(),
            json_output,
        ),
        Commands::Fmt { catalog, check } => commands::fmt::run(&catalog, check, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("catalog error:")
                || msg.starts_with("failed to parse catalog")
                || msg.starts_with("failed to read catalog")
            {
                EXIT_CATALOG_ERROR
            } else if msg.starts_with("fetch error:") || msg.starts_with("failed to download") {
                EXIT_FETCH_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
