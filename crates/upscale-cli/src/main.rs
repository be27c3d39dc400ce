//! Upscale CLI: submit an image or video for upscaling and follow the job.
//!
//! Configuration comes from the environment (UPSCALE_API_URL or API_URL, see
//! `UpscaleConfig::from_env`). Status lines go to stderr, results to stdout as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use upscale_api_client::{ApiClient, RunOutcome, UpscaleRunner};
use upscale_cli::{init_tracing, override_params, StatusPrinter};
use upscale_core::models::{CandidateFile, JobId};
use upscale_core::{SessionView, UpscaleConfig, UpscaleError, UpscaleSession};

#[derive(Parser)]
#[command(name = "upscale", about = "Upscale images and videos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, wait for the upscaled result and print it
    Run {
        /// Path to the image or video
        file: PathBuf,
        /// Target resolution, e.g. 3840x2160
        #[arg(long)]
        resolution: Option<String>,
        /// Scale factor, e.g. 4x
        #[arg(long)]
        scale: Option<String>,
        /// Drop the audio track
        #[arg(long)]
        no_audio: bool,
        /// Save the result to this path once done
        #[arg(long)]
        download: Option<PathBuf>,
        /// Print only the result URL
        #[arg(long)]
        copy_link: bool,
    },
    /// Query the status of a job once
    Status {
        /// Job identifier returned by the upload
        job_id: String,
    },
    /// Follow an existing job until it finishes
    Watch {
        /// Job identifier returned by the upload
        job_id: String,
    },
    /// Download a result to a local file
    Download {
        /// Result URL (absolute or relative to the API base)
        url: String,
        /// Destination path
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct RunReport {
    #[serde(flatten)]
    outcome: RunOutcome,
    session: SessionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    downloaded_to: Option<PathBuf>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Cancel the runner on Ctrl-C.
fn cancel_on_ctrl_c(runner: &UpscaleRunner<ApiClient>) {
    let shutdown = runner.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            shutdown.cancel();
        }
    });
}

fn finish(outcome: &RunOutcome) -> anyhow::Result<()> {
    match outcome {
        RunOutcome::Completed(_) => Ok(()),
        RunOutcome::Failed(message) => anyhow::bail!("{}", message),
        RunOutcome::Cancelled => Err(UpscaleError::Cancelled.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = UpscaleConfig::from_env().context(
        "Invalid configuration. Check UPSCALE_API_URL (or API_URL) and the UPSCALE_* variables",
    )?;
    let client = ApiClient::from_config(&config).context("Failed to create API client")?;

    match cli.command {
        Commands::Run {
            file,
            resolution,
            scale,
            no_audio,
            download,
            copy_link,
        } => {
            let candidate = CandidateFile::from_path(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;

            let mut session = UpscaleSession::with_local_previews(&config);
            session.set_params(override_params(config.params(), resolution, scale, no_audio)?);
            session
                .select_files(vec![candidate])
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            let runner = UpscaleRunner::from_config(client, &config);
            cancel_on_ctrl_c(&runner);

            let mut printer = StatusPrinter::default();
            let outcome = runner
                .submit(&mut session, |view| {
                    printer.print(view.status_line());
                })
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            let mut downloaded_to = None;
            if let (RunOutcome::Completed(url), Some(path)) = (&outcome, download) {
                runner.backend().download_result(url, &path).await?;
                downloaded_to = Some(path);
            }

            match (&outcome, copy_link) {
                (RunOutcome::Completed(url), true) => println!("{}", url),
                _ => print_json(&RunReport {
                    outcome: outcome.clone(),
                    session: session.view(),
                    downloaded_to,
                })?,
            }
            session.dispose();
            finish(&outcome)?;
        }
        Commands::Status { job_id } => {
            let status = client.get_job_status(&JobId::new(job_id)).await?;
            print_json(&status)?;
        }
        Commands::Watch { job_id } => {
            let mut session = UpscaleSession::with_local_previews(&config);
            let runner = UpscaleRunner::from_config(client, &config);
            cancel_on_ctrl_c(&runner);

            let mut printer = StatusPrinter::default();
            let outcome = runner
                .resume(&mut session, JobId::new(job_id), |view| {
                    printer.print(view.status_line());
                })
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            print_json(&RunReport {
                outcome: outcome.clone(),
                session: session.view(),
                downloaded_to: None,
            })?;
            session.dispose();
            finish(&outcome)?;
        }
        Commands::Download { url, path } => {
            let bytes = client.download_result(&url, &path).await?;
            print_json(&serde_json::json!({ "path": path, "bytes": bytes }))?;
        }
    }

    Ok(())
}
