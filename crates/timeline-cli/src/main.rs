//! Timeline CLI: offline video fixes and derivative maintenance.
//!
//! `list` and `repoint` read DATABASE_URL and UPLOAD_DIR like the server does.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use timeline_cli::{hash_passwords, init_tracing, print_json, processing_config, reconciler};
use timeline_core::Config;
use timeline_processing::{OrientationAdapter, RepointTarget, TokioProcessRunner, TranscodeAdapter};

#[derive(Parser, Debug)]
#[command(name = "timeline-cli", about = "Timeline media maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Convert a video to browser-compatible H.264 next to the input
    Transcode {
        /// Video file to convert
        path: PathBuf,
    },
    /// Correct a rotated video, writing `{stem}_fixed.mp4`
    FixOrientation {
        /// Video file to correct
        path: PathBuf,
    },
    /// List .mp4 originals in the upload directory and their derivatives
    List,
    /// Point video records at their transcoded derivatives
    Repoint {
        /// Target the orientation-fixed derivative instead
        #[arg(long)]
        fixed: bool,
    },
    /// Print bcrypt hashes for the given passwords
    HashPassword {
        #[arg(required = true)]
        passwords: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Transcode { path } => {
            let adapter = TranscodeAdapter::new(Arc::new(TokioProcessRunner), &processing_config());
            let output = adapter
                .transcode(&path)
                .await
                .with_context(|| format!("Transcoding {} failed", path.display()))?;
            println!("{}", output.display());
        }
        Commands::FixOrientation { path } => {
            let adapter =
                OrientationAdapter::new(Arc::new(TokioProcessRunner), &processing_config());
            let output = adapter
                .fix_orientation(&path)
                .await
                .with_context(|| format!("Fixing orientation of {} failed", path.display()))?;
            if output == path {
                tracing::info!("No rotation correction needed");
            }
            println!("{}", output.display());
        }
        Commands::List => {
            let config = Config::from_env()?;
            let chains = reconciler(&config, true).await?.list_chains().await?;
            print_json(&chains)?;
        }
        Commands::Repoint { fixed } => {
            let config = Config::from_env()?;
            let target = if fixed {
                RepointTarget::OrientationFixed
            } else {
                RepointTarget::Transcoded
            };
            let report = reconciler(&config, false).await?.repoint(target).await?;
            tracing::info!(
                examined = report.examined,
                updated = report.updated.len(),
                missing = report.missing.len(),
                "Repoint finished"
            );
            print_json(&report)?;
        }
        Commands::HashPassword { passwords } => {
            for (password, hash) in passwords
                .iter()
                .zip(hash_passwords(&passwords, bcrypt::DEFAULT_COST)?)
            {
                println!("{}: {}", password, hash);
            }
        }
    }

    Ok(())
}
