use super::{answer, prepare_agent};
use anyhow::Result;
use cliclack::spinner;
use grounded::configuration::Settings;
use std::path::PathBuf;

pub async fn handle_ask(
    settings: &Settings,
    question: &str,
    thread_id: &str,
    files: &[PathBuf],
) -> Result<()> {
    let agent = prepare_agent(settings, files).await?;

    let spin = spinner();
    spin.start("awaiting reply");
    let result = answer(&agent, settings, question, thread_id).await;
    spin.stop("");

    println!("{}", result?);
    Ok(())
}
