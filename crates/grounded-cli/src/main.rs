mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use grounded::configuration::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::ask::handle_ask;
use commands::chat::handle_chat;
use commands::history::{handle_history, handle_threads};
use commands::ingest::handle_ingest;

const DEFAULT_THREAD: &str = "default_user";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at info level instead of warn (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split, embed and upsert documents into the knowledge index
    Ingest {
        /// Text, markdown or PDF files to load
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a single question and print the answer
    Ask {
        question: String,

        /// Conversation thread the question belongs to
        #[arg(short, long, default_value = DEFAULT_THREAD)]
        thread: String,

        /// Ingest these files before answering
        #[arg(short, long, num_args = 1..)]
        load: Vec<PathBuf>,
    },

    /// Start an interactive chat session
    Chat {
        /// Conversation thread to continue
        #[arg(short, long, default_value = DEFAULT_THREAD)]
        thread: String,

        /// Ingest these files before the session starts
        #[arg(short, long, num_args = 1..)]
        load: Vec<PathBuf>,
    },

    /// List the threads in the conversation store
    Threads,

    /// Print the stored conversation for a thread
    History {
        #[arg(default_value = DEFAULT_THREAD)]
        thread: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::new()?;

    match cli.command {
        Command::Ingest { files } => handle_ingest(&settings, &files).await,
        Command::Ask {
            question,
            thread,
            load,
        } => handle_ask(&settings, &question, &thread, &load).await,
        Command::Chat { thread, load } => handle_chat(&settings, &thread, &load).await,
        Command::Threads => handle_threads(&settings).await,
        Command::History { thread } => handle_history(&settings, &thread).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_defaults_to_shared_thread() {
        let cli = Cli::try_parse_from(["grounded", "ask", "What do you sell?"]).unwrap();
        match cli.command {
            Command::Ask {
                question,
                thread,
                load,
            } => {
                assert_eq!(question, "What do you sell?");
                assert_eq!(thread, "default_user");
                assert!(load.is_empty());
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_chat_accepts_thread_and_files() {
        let cli = Cli::try_parse_from([
            "grounded", "-v", "chat", "--thread", "alice", "--load", "a.md", "b.md",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Chat { thread, load } => {
                assert_eq!(thread, "alice");
                assert_eq!(load, vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_ingest_requires_files() {
        assert!(Cli::try_parse_from(["grounded", "ingest"]).is_err());
    }
}
