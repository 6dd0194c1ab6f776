//! resman: check downloaded resources against the published manifest.

mod error;
mod output;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use futures::StreamExt;
use resman_checker::{CheckEvent, RecoveryOutcome, ResourceChecker};
use resman_config::Config;
use resman_manifest::error::ErrorKind as ManifestErrorKind;
use resman_manifest::{FramedCodec, ManifestCodec};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RESMAN_LOG";

#[derive(Parser)]
#[command(name = "resman")]
#[command(version)]
#[command(about = "Reconcile local resource storage with the published resource manifest")]
#[command(long_about = r#"
resman compares the target manifest with the manifests of the bundled
(read-only) and downloaded (read-write) storage areas. It deletes cached
resources that are no longer wanted and lists the ones that must be
downloaded. It never downloads anything itself.

Examples:
  resman check                          Check with the configured variant
  resman check --variant hd             Check the "hd" content variant
  resman inspect cache/ResourceList.dat Print a manifest file
"#)]
struct Cli {
    /// Enable debug logging (RESMAN_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile storage areas and list the resources that need downloading
    Check {
        /// Content variant, overriding the configured one
        #[arg(long)]
        variant: Option<String>,
    },

    /// Decode a manifest file and print its contents
    Inspect {
        /// Manifest file, target or local
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let result = match cli.command {
        Command::Check { variant } => check(cli.config.as_deref(), variant).await,
        Command::Inspect { file } => inspect(&file).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn check(config_file: Option<&Path>, variant: Option<String>) -> Result<()> {
    let config = Config::load(config_file).or_raise(|| ErrorKind::Config)?;
    let variant = resolve_variant(variant, &config);
    let checker = ResourceChecker::from_config(&config).or_raise(|| ErrorKind::Check)?;

    let mut events = pin!(checker.check(variant.as_deref()));
    let mut recovery = RecoveryOutcome::Clean;
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Check)? {
            CheckEvent::Started => {},
            CheckEvent::Recovered(outcome) => recovery = outcome,
            CheckEvent::ResourceNeedsUpdate(request) => println!("{}", output::Update(&request)),
            CheckEvent::Complete(summary) => println!("{}", output::Summary { summary: &summary, recovery }),
        }
    }
    Ok(())
}

/// The `--variant` flag wins over the configured variant.
fn resolve_variant(requested: Option<String>, config: &Config) -> Option<String> {
    match (requested, &config.variant) {
        (Some(variant), _) => {
            tracing::debug!(%variant, "Using variant from the command line");
            Some(variant)
        },
        (None, Some(variant)) => {
            tracing::debug!(%variant, "Using configured variant");
            Some(variant.clone())
        },
        (None, None) => {
            tracing::debug!("No variant selected, checking universal resources only");
            None
        },
    }
}

async fn inspect(file: &Path) -> Result<()> {
    let bytes = tokio::fs::read(file).await.or_raise(|| ErrorKind::Read(file.to_path_buf()))?;
    let codec = FramedCodec::new();
    match codec.decode_target(&bytes) {
        Ok(manifest) => println!("{}", output::TargetListing(&manifest)),
        Err(e) if matches!(&*e, ManifestErrorKind::WrongKind { .. }) => {
            let manifest = codec.decode_local(&bytes).or_raise(|| ErrorKind::Decode(file.to_path_buf()))?;
            println!("{}", output::LocalListing(&manifest));
        },
        Err(e) => return Err(e.raise(ErrorKind::Decode(file.to_path_buf()))),
    }
    Ok(())
}
