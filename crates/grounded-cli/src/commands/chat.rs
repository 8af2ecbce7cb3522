use super::{answer, prepare_agent};
use anyhow::Result;
use cliclack::{input, spinner};
use console::style;
use grounded::configuration::Settings;
use std::path::PathBuf;

pub async fn handle_chat(settings: &Settings, thread_id: &str, files: &[PathBuf]) -> Result<()> {
    let agent = prepare_agent(settings, files).await?;

    println!(
        "grounded chat on thread {} {}",
        style(thread_id).cyan(),
        style("- type \"exit\" to end the session").dim()
    );
    println!();

    loop {
        let message_text: String = input("Message:").placeholder("").interact()?;
        if is_exit_command(&message_text) {
            break;
        }
        if message_text.trim().is_empty() {
            continue;
        }

        let spin = spinner();
        spin.start("awaiting reply");
        let result = answer(&agent, settings, &message_text, thread_id).await;
        spin.stop("");

        match result {
            Ok(reply) => println!("{}", reply),
            // The turn was not persisted, so the session can go on
            Err(e) => println!("{}", style(format!("error: {:#}", e)).red()),
        }
        println!();
    }
    Ok(())
}

fn is_exit_command(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "exit" | "quit")
}
