//! relay CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use cli::RunOptions;
use relay_foundation::RelayConfig;
use relay_server::ToolServer;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// relay - drive coding-agent CLIs through temporary files
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve tool calls as JSON lines on stdin/stdout
    Serve,

    /// List configured targets
    List {
        /// Also query `<command> --version`
        #[arg(long)]
        probe: bool,
    },

    /// Send a prompt to one target
    Run {
        /// Target name
        target: String,

        /// Prompt (read from stdin when omitted)
        prompt: Option<String>,

        #[arg(long)]
        system_prompt: Option<String>,

        /// Extra CLI arg, repeatable (filtered against the target's allow-list)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        /// Timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Conversation id
        #[arg(long)]
        session_id: Option<String>,

        /// Continue the conversation given by --session-id
        #[arg(long, requires = "session_id")]
        resume: bool,

        /// Do not pass --skip-git-repo-check
        #[arg(long)]
        no_skip_git_check: bool,
    },

    /// Send the same prompt to several targets
    Multi {
        prompt: String,

        /// Target name, repeatable (defaults to all targets)
        #[arg(short, long = "target")]
        targets: Vec<String>,

        #[arg(long)]
        system_prompt: Option<String>,

        /// Timeout in seconds for each target
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // stdout은 프로토콜/응답 전용이므로 로그는 stderr
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = RelayConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        RelayConfig::default()
    });
    let server = ToolServer::from_config(&config)?;

    match args.command {
        Command::Serve => cli::serve(server).await,
        Command::List { probe } => cli::list(&server, probe).await,
        Command::Run {
            target,
            prompt,
            system_prompt,
            args,
            timeout,
            session_id,
            resume,
            no_skip_git_check,
        } => {
            let options = RunOptions {
                target,
                prompt,
                system_prompt,
                args,
                timeout,
                session_id,
                resume,
                skip_git_repo_check: !no_skip_git_check,
            };
            cli::run(&server, options).await
        }
        Command::Multi {
            prompt,
            targets,
            system_prompt,
            timeout,
        } => cli::multi(&server, prompt, targets, system_prompt, timeout).await,
    }
}
