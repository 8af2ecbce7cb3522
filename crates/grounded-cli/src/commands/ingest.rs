use super::{check_files, load_files};
use anyhow::Result;
use console::style;
use grounded::bootstrap::{build_index, build_ingestor};
use grounded::configuration::Settings;
use std::path::PathBuf;

pub async fn handle_ingest(settings: &Settings, files: &[PathBuf]) -> Result<()> {
    check_files(files)?;
    cliclack::intro(style(" grounded ingest ").on_cyan().black())?;

    let index = build_index(settings, true).await?;
    let ingestor = build_ingestor(settings, index)?;
    let chunks = load_files(&ingestor, files).await?;

    cliclack::outro(format!(
        "Indexed {} chunks from {} files",
        chunks,
        files.len()
    ))?;
    Ok(())
}
