use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use claude_codex_bridge::{
    BridgeConfig, BridgeError, ChannelProgress, ClaudeOptions, CodexOptions, ExecRunner,
    ProgressSink, READ_ONLY_TOOLS, Sandbox, ToolResponse, logging,
};

#[derive(Parser)]
#[command(name = "claude-codex-bridge")]
#[command(about = "Run Claude Code or Codex CLI on behalf of the other agent")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.claude-codex-bridge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the normalized result as JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask Codex a question or give it a task
    Codex {
        /// The question or task for Codex
        prompt: String,

        /// Working directory for the agent
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Override the Codex model
        #[arg(long)]
        model: Option<String>,

        /// Sandbox level controlling what Codex can modify
        #[arg(long, value_enum)]
        sandbox: Option<Sandbox>,

        /// Run without approval prompts
        #[arg(long)]
        full_auto: bool,
    },

    /// Ask Claude Code a question or give it a task
    Claude {
        /// The question or task for Claude
        prompt: String,

        /// Working directory for the agent
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Override the Claude model
        #[arg(long)]
        model: Option<String>,

        /// Maximum number of agent turns
        #[arg(long)]
        max_turns: Option<u32>,

        /// Restrict the tools Claude may use (repeatable)
        #[arg(long = "allowed-tool")]
        allowed_tools: Vec<String>,

        /// Restrict Claude to read-only repository tools
        #[arg(long, conflicts_with = "allowed_tools")]
        read_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = BridgeConfig::load(cli.config.as_deref())?;
    let runner = ExecRunner::new(config.exec_settings());

    // Progress goes to stderr so stdout only carries the result.
    let (progress, mut updates) = ChannelProgress::channel();
    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            eprintln!("[{}] {}", update.step, update.message);
        }
    });
    let progress: Arc<dyn ProgressSink> = Arc::new(progress);

    let succeeded = match cli.command {
        Commands::Codex {
            prompt,
            cwd,
            model,
            sandbox,
            full_auto,
        } => {
            let options = CodexOptions {
                working_directory: cwd,
                model,
                sandbox,
                full_auto,
            };
            let result = config
                .codex_adapter()
                .run(&runner, &prompt, &options, Some(progress))
                .await;
            let _ = printer.await;
            match result {
                Ok(result) => emit(&result, ToolResponse::from_codex(&result), cli.json)?,
                Err(err) => report_error(&err, cli.json)?,
            }
        }
        Commands::Claude {
            prompt,
            cwd,
            model,
            max_turns,
            allowed_tools,
            read_only,
        } => {
            drop(progress);
            let _ = printer.await;
            let allowed_tools = if read_only {
                READ_ONLY_TOOLS.iter().map(|t| t.to_string()).collect()
            } else {
                allowed_tools
            };
            let options = ClaudeOptions {
                working_directory: cwd,
                model,
                max_turns,
                allowed_tools,
            };
            match config.claude_adapter().run(&runner, &prompt, &options).await {
                Ok(result) => emit(&result, ToolResponse::from_claude(&result), cli.json)?,
                Err(err) => report_error(&err, cli.json)?,
            }
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Print a result; returns whether it counts as a success.
fn emit<R: Serialize>(result: &R, response: ToolResponse, json: bool) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else if response.is_error {
        eprintln!("{}", response.text);
    } else {
        println!("{}", response.text);
    }
    Ok(!response.is_error)
}

fn report_error(err: &BridgeError, json: bool) -> Result<bool> {
    if json {
        let body = serde_json::json!({ "error": err.to_string(), "code": err.code() });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        eprintln!("Error [{}]: {}", err.code(), err);
    }
    Ok(false)
}
