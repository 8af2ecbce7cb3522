use anyhow::Result;
use console::style;
use grounded::configuration::Settings;
use grounded::models::message::Message;
use grounded::models::role::Role;
use grounded::store::base::ConversationStore;
use grounded::store::factory::open_store;

pub async fn handle_threads(settings: &Settings) -> Result<()> {
    let store = open_store(settings.store.clone().into_config())?;
    let threads = store.thread_ids().await?;
    if threads.is_empty() {
        println!("{}", style("no conversations yet").dim());
    }
    for thread in threads {
        println!("{}", thread);
    }
    Ok(())
}

pub async fn handle_history(settings: &Settings, thread_id: &str) -> Result<()> {
    let store = open_store(settings.store.clone().into_config())?;
    for message in store.get_history(thread_id).await? {
        if let Some(line) = render_message(&message) {
            println!("{}\n", line);
        }
    }
    Ok(())
}

/// Tool traffic is summarised rather than printed in full
fn render_message(message: &Message) -> Option<String> {
    match message.role {
        Role::User => Some(format!("{} {}", style("you:").cyan().bold(), message.text())),
        Role::Assistant if message.has_tool_requests() => Some(
            style(format!(
                "[searched the knowledge base {} time(s)]",
                message.tool_requests().len()
            ))
            .dim()
            .to_string(),
        ),
        Role::Assistant => Some(format!(
            "{} {}",
            style("assistant:").green().bold(),
            message.text()
        )),
        Role::Tool | Role::System => None,
    }
}
