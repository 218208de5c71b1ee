// ABOUTME: Entry point for the opencore binary.
// ABOUTME: Loads .env, initializes tracing, builds a swarm from the environment and chats with it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use opencore_agent::Swarm;
use opencore_core::Attachment;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default model for the main agent and new agents (overrides LLM_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Print the swarm topology as JSON after each reply
    #[arg(long)]
    graph: bool,

    /// Print the activity log of each request as JSON after each reply
    #[arg(long)]
    activity: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message to the main agent and print the reply
    Chat {
        message: String,

        /// Text file to inline into the message (repeatable)
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,

        /// Image URL or data URL to send alongside the message (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,
    },
    /// Read messages from stdin line by line
    Repl,
}

fn load_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read attachment {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Attachment::new(name, "text/plain", content))
}

fn image_attachment(index: usize, url: &str) -> Attachment {
    let mime = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|m| m.starts_with("image/"))
        .unwrap_or("image/png");
    Attachment::new(format!("image-{}", index + 1), mime, url)
}

fn print_reports(swarm: &Swarm, cli: &Cli) -> anyhow::Result<()> {
    if cli.graph {
        println!("{}", serde_json::to_string_pretty(&swarm.get_graph_data())?);
    }
    if cli.activity {
        println!("{}", serde_json::to_string_pretty(&swarm.activity_log())?);
    }
    Ok(())
}

async fn repl(swarm: &Swarm, cli: &Cli) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!(
        "opencore ({} on {}). Type 'exit' to quit, '/agents' to list agents.",
        swarm.main_agent_name(),
        swarm.default_model()
    );

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/agents" => println!("{}", swarm.list_agents()),
            "/graph" => println!("{}", serde_json::to_string_pretty(&swarm.get_graph_data())?),
            _ => {
                if let Some(model) = line.strip_prefix("/model ") {
                    swarm.set_default_model(model.trim());
                    println!("Default model set to '{}'.", model.trim());
                    continue;
                }
                let reply = swarm.chat(line, &[]).await;
                println!("{}", reply);
                print_reports(swarm, cli)?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opencore=info,opencore_agent=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let swarm = Swarm::from_env().context("invalid configuration")?;
    if let Some(model) = &cli.model {
        swarm.set_default_model(model);
        swarm
            .update_agent_model(swarm.main_agent_name(), model)
            .await?;
    }

    tracing::info!(
        main_agent = %swarm.main_agent_name(),
        model = %swarm.default_model(),
        "opencore starting up"
    );

    match &cli.command {
        Command::Chat {
            message,
            attachments,
            images,
        } => {
            let mut files = attachments
                .iter()
                .map(|path| load_attachment(path))
                .collect::<anyhow::Result<Vec<_>>>()?;
            files.extend(
                images
                    .iter()
                    .enumerate()
                    .map(|(i, url)| image_attachment(i, url)),
            );

            let reply = swarm.chat(message, &files).await;
            println!("{}", reply);
            print_reports(&swarm, &cli)?;
        }
        Command::Repl => repl(&swarm, &cli).await?,
    }

    Ok(())
}
