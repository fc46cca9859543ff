//! Task entry point: reads the options mapping as JSON on stdin and writes the
//! result document to stdout.

use proxmox_inventory::{
    InventoryResolver, ProxmoxError, ProxmoxResult, ResolveRequest, TaskError, TaskOutput,
    ValidationConfig, ValidationError,
};
use std::process::ExitCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the result document, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let (document, code) = match run().await {
        Ok(output) => (serde_json::to_string(&output), ExitCode::SUCCESS),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "inventory resolution failed");
            (serde_json::to_string(&TaskError::from(&e)), ExitCode::FAILURE)
        }
    };

    let document = match document {
        Ok(document) => document,
        Err(e) => {
            error!(error = %e, "failed to serialize task result");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = tokio::io::stdout();
    let written = async {
        stdout.write_all(document.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await
    }
    .await;
    if let Err(e) = written {
        error!(error = %e, "failed to write task result");
        return ExitCode::FAILURE;
    }
    code
}

async fn run() -> ProxmoxResult<TaskOutput> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .map_err(|e| ValidationError::Format(format!("Failed to read task input: {}", e)))?;

    let request = parse_request(&input)?;
    InventoryResolver::new(ValidationConfig::default())
        .task(request)
        .await
}

fn parse_request(input: &str) -> Result<ResolveRequest, ProxmoxError> {
    if input.trim().is_empty() {
        return Ok(ResolveRequest::default());
    }
    serde_json::from_str(input)
        .map_err(|e| ValidationError::Format(format!("Invalid task input: {}", e)).into())
}
