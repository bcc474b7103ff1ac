//! Harvester CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use harvester::{
    config::{ConfigOverrides, load_config},
    error::Result,
    models::Layout,
    pipeline,
    utils::http::{HttpTransport, ReqwestTransport},
};

/// harvester - Greenhouse résumé harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Download candidate résumés from the Harvest API into an audited archive"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "harvester.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of concurrent download workers
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Output root directory
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Directory layout: flat or partitioned
    #[arg(long, global = true)]
    layout: Option<Layout>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run full pipeline: Index → Download → Package
    Run {
        /// Do not zip the output directory
        #[arg(long)]
        skip_package: bool,
    },

    /// Fetch all collections and save the download manifest
    Index {
        /// Where to write the manifest
        #[arg(long, default_value = "manifest.json")]
        out: PathBuf,
    },

    /// Download résumés listed in a saved manifest
    Download {
        /// Manifest produced by `index`
        #[arg(long)]
        manifest: PathBuf,
    },

    /// Zip the output directory
    Package,

    /// Validate configuration and credentials
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    run(cli).await.inspect_err(|e| log::error!("{}", e))
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides {
        concurrency: cli.concurrency,
        output_dir: cli.output.clone(),
        layout: cli.layout,
    };
    let config = load_config(&cli.config, &overrides)?;

    match cli.command {
        Command::Run { skip_package } => {
            let api_key = config.api_key()?;
            let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.api)?);
            let report = pipeline::run_pipeline(&config, transport, &api_key, skip_package).await?;

            if report.downloads.failed > 0 {
                log::warn!(
                    "{} of {} résumés failed to download",
                    report.downloads.failed,
                    report.downloads.attempted
                );
            }
        }

        Command::Index { out } => {
            let api_key = config.api_key()?;
            let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.api)?);
            let rows = pipeline::run_index(&config, transport, &api_key).await?;
            pipeline::save_manifest(&out, &rows).await?;
        }

        Command::Download { manifest } => {
            let rows = pipeline::load_manifest(&manifest).await?;
            let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.api)?);
            pipeline::run_download(&config, transport, rows).await?;
        }

        Command::Package => {
            pipeline::run_package(&config).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!("✓ Config OK ({})", cli.config.display());

            if let Err(e) = config.api_key() {
                log::error!("Credential check failed: {}", e);
                return Err(e);
            }
            log::info!("✓ {} is set", config.api.api_key_env);

            log::info!("All validations passed!");
        }
    }

    log::info!("Done!");

    Ok(())
}
