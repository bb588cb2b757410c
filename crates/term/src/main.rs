use std::sync::Arc;

use pantry_chat::{SendOutcome, SendRejection, SessionController, SettingsStore};
use pantry_client::{AssistantBackend, BackendError, HttpBackend};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

mod input;
mod render;

use input::{Command, load_image, parse_command};

const BUSY_NOTICE: &str = "(still waiting for the previous reply)";

#[derive(Debug, Snafu)]
enum AppError {
    #[snafu(display("failed to build backend client: {source}"))]
    Backend {
        stage: &'static str,
        source: BackendError,
    },
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
}

type AppResult<T> = Result<T, AppError>;

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never interleave with the transcript on stdout.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    if let Err(error) = run().await {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let store = SettingsStore::load();
    tracing::debug!(config_path = ?store.config_path(), "settings loaded");
    let settings = store.settings().clone();

    let backend = HttpBackend::new(settings.to_backend_config()).context(BackendSnafu {
        stage: "build-http-backend",
    })?;
    probe_health(&backend).await;

    let session = SessionController::new(Arc::new(backend), settings);
    let renderer = tokio::spawn(render::follow(session.subscribe()));
    println!("Type a message, `/upload <path>` to check a photo, or `/quit` to leave.");

    drive(&session, BufReader::new(tokio::io::stdin())).await?;
    tracing::info!(session_id = %session.id(), "chat session closed");

    // The renderer stops once the last session handle is gone and the final view is printed.
    drop(session);
    if let Err(error) = renderer.await {
        tracing::warn!("transcript renderer ended abnormally: {error}");
    }
    Ok(())
}

/// Feeds input lines to the session until `/quit` or end of input, then waits for every
/// started flow to write its terminal entry.
async fn drive<R>(session: &SessionController, input: R) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut flows = JoinSet::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context(ReadInputSnafu {
        stage: "read-input-line",
    })? {
        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::UploadUsage => println!("usage: /upload <path>"),
            Command::Upload(path) => {
                match load_image(&path, session.settings().max_upload_bytes).await {
                    Ok(file) => {
                        let session = session.clone();
                        flows.spawn(async move {
                            let outcome = session.upload_image(file).await;
                            tracing::debug!(?outcome, "image upload finished");
                        });
                    }
                    Err(error) => {
                        tracing::debug!("upload pre-check failed: {error}");
                        println!("{}", error.notice());
                    }
                }
            }
            Command::Send(text) => {
                if session.busy() {
                    println!("{BUSY_NOTICE}");
                    continue;
                }
                let session = session.clone();
                flows.spawn(async move {
                    let outcome = session.send_text(&text).await;
                    tracing::debug!(?outcome, "chat send finished");
                    if let Some(notice) = send_notice(&outcome) {
                        println!("{notice}");
                    }
                });
            }
        }
    }

    if !flows.is_empty() {
        tracing::info!(in_flight = flows.len(), "waiting for requests still in flight");
    }
    while let Some(joined) = flows.join_next().await {
        if let Err(error) = joined {
            tracing::warn!("flow task ended abnormally: {error}");
        }
    }
    Ok(())
}

/// Notice for a send that the session turned away after the busy pre-check passed.
fn send_notice(outcome: &SendOutcome) -> Option<&'static str> {
    match outcome {
        SendOutcome::Rejected(SendRejection::Busy) => Some(BUSY_NOTICE),
        _ => None,
    }
}

async fn probe_health(backend: &HttpBackend) {
    match backend.health().await {
        Ok(report) if report.is_healthy() => {
            tracing::info!(base_url = %backend.config().base_url, "backend is healthy");
        }
        Ok(report) => tracing::warn!(
            status = %report.status,
            cnn_loaded = report.models.cnn_loaded,
            nlp_loaded = report.models.nlp_loaded,
            tokenizers_loaded = report.models.tokenizers_loaded,
            "backend reports degraded health"
        ),
        Err(error) => tracing::warn!(
            stage = error.stage(),
            "backend health probe failed, continuing anyway: {error}"
        ),
    }
}
