pub mod ask;
pub mod chat;
pub mod history;
pub mod ingest;

use anyhow::{anyhow, Result};
use cliclack::spinner;
use console::style;
use grounded::agent::Agent;
use grounded::bootstrap::{build_agent, build_index, build_ingestor};
use grounded::configuration::Settings;
use grounded::ingest::Ingestor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fail fast on paths that are missing or not regular files
pub fn check_files(files: &[PathBuf]) -> Result<()> {
    let missing: Vec<String> = files
        .iter()
        .filter(|path| !path.is_file())
        .map(|path| path.display().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("No such file: {}", missing.join(", ")))
    }
}

/// Ingest each file behind a spinner, returning the total chunk count
pub async fn load_files(ingestor: &Ingestor, files: &[PathBuf]) -> Result<usize> {
    let mut total = 0;
    for path in files {
        total += load_file(ingestor, path).await?;
    }
    Ok(total)
}

async fn load_file(ingestor: &Ingestor, path: &Path) -> Result<usize> {
    let spin = spinner();
    spin.start(format!("loading {}", path.display()));
    match ingestor.ingest_file(path).await {
        Ok(report) => {
            spin.stop(format!("{} ({} chunks)", path.display(), report.chunks));
            Ok(report.chunks)
        }
        Err(e) => {
            spin.stop(style(format!("{} failed", path.display())).red());
            Err(e)
        }
    }
}

/// Connect the index, load any `files` into it, then build the agent over it
pub async fn prepare_agent(settings: &Settings, files: &[PathBuf]) -> Result<Agent> {
    check_files(files)?;
    let index = build_index(settings, !files.is_empty()).await?;
    if !files.is_empty() {
        let ingestor = build_ingestor(settings, index.clone())?;
        load_files(&ingestor, files).await?;
    }
    build_agent(settings, index)
}

/// One turn, bounded by the configured deadline when there is one
pub async fn answer(
    agent: &Agent,
    settings: &Settings,
    text: &str,
    thread_id: &str,
) -> Result<String> {
    match settings.agent.turn_timeout_secs {
        Some(secs) => {
            agent
                .run_turn_with_deadline(text, thread_id, Duration::from_secs(secs))
                .await
        }
        None => agent.run_turn(text, thread_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_check_files() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("faq.md");
        std::fs::write(&present, "hours").unwrap();
        let absent = dir.path().join("missing.md");

        assert!(check_files(&[]).is_ok());
        assert!(check_files(&[present.clone()]).is_ok());

        let err = check_files(&[present, absent.clone()]).unwrap_err();
        assert_eq!(err.to_string(), format!("No such file: {}", absent.display()));

        assert!(check_files(&[dir.path().to_path_buf()]).is_err());
    }
}
