mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "voiceops",
    about = "Voice-driven operations agent: turn a spoken command into a reviewed, audited action plan",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (YAML). A missing file means defaults plus environment.
    #[arg(long, global = true, env = "VOICEOPS_CONFIG", default_value = "voiceops.yaml")]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Interface to bind (default: server.host from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Propose a plan for a command, then approve or reject it
    Plan {
        /// The command, as spoken
        #[arg(required = true, num_args = 1..)]
        transcript: Vec<String>,
        /// Approve without prompting
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Propose and execute a command with no confirmation step
    Run {
        /// The command, as spoken
        #[arg(required = true, num_args = 1..)]
        transcript: Vec<String>,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Audio file (webm, mp3, wav, m4a, ogg)
        file: PathBuf,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve { host, port } => cmd::serve::run(&cli.config, host, port),
        Commands::Plan { transcript, yes } => {
            cmd::plan::run(&cli.config, &transcript.join(" "), yes, cli.json)
        }
        Commands::Run { transcript } => cmd::run::run(&cli.config, &transcript.join(" "), cli.json),
        Commands::Transcribe { file } => cmd::transcribe::run(&cli.config, &file, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&cli.config, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
