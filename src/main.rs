mod api;
mod app;
mod commands;
mod config;
mod errors;
mod logging;
mod output;
mod parse;
mod relay;
mod render;
mod session;

use clap::{Parser, Subcommand};

use crate::app::Runtime;
use crate::commands::chat::ChatArgs;
use crate::commands::config::ConfigCommand;
use crate::commands::relay::RelayArgs;
use crate::commands::render::RenderArgs;
use crate::commands::session::SessionArgs;
use crate::errors::CliError;
use crate::output::OutputMode;

#[derive(Debug, Parser)]
#[command(
    name = "chatrelay",
    version,
    about = "Chat with a generative-language model and render its Markdown replies as safe HTML."
)]
struct Cli {
    #[arg(long, global = true)]
    profile: Option<String>,
    /// Upstream API base URL
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    quiet: bool,
    #[arg(long, global = true, default_value_t = 60_000)]
    timeout: u64,
    /// Character cap applied to replies before rendering
    #[arg(long = "max-chars", global = true)]
    max_chars: Option<usize>,
    #[arg(long, global = true)]
    verbose: bool,
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Send one message and print the rendered reply
    Chat(ChatArgs),
    /// Interactive chat on stdin
    Session(SessionArgs),
    /// Render Markdown from a file or stdin
    Render(RenderArgs),
    /// Answer one JSON chat request from stdin with the relay's status and body
    Relay(RelayArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
        debug: cli.debug,
    };
    logging::init(&output);

    let result = run(cli, output.clone()).await;
    if let Err(err) = result {
        output.print_error(&err);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli, output: OutputMode) -> Result<(), CliError> {
    let config = config::load_config()?;
    let config_path = config::config_path()?;

    let mut runtime = Runtime {
        output,
        config,
        config_path,
        profile_override: cli.profile,
        api_url_override: cli.api_url,
        max_chars_override: cli.max_chars,
        timeout_ms: cli.timeout,
    };

    match cli.command {
        Commands::Config { command } => commands::config::handle(&mut runtime, command).await,
        Commands::Chat(args) => commands::chat::handle(&runtime, args).await,
        Commands::Session(args) => commands::session::handle(&runtime, args).await,
        Commands::Render(args) => commands::render::handle(&runtime, args).await,
        Commands::Relay(args) => commands::relay::handle(&runtime, args).await,
    }
}
