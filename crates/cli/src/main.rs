//! Warren CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP gateway
//! - `generate` — Run one advisor request through the pipeline
//! - `corpus`   — Inspect the knowledge corpus
//! - `status`   — Show the effective configuration
//! - `config`   — Print a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use warren_core::generation::{AudienceType, ContentType};

mod commands;

#[derive(Parser)]
#[command(
    name = "warren",
    about = "Warren — compliance-grounded marketing content for financial advisors",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.warren/config.toml)
    #[arg(short, long, global = true, env = "WARREN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate content for a single request
    Generate {
        /// The advisor's request
        #[arg(short, long)]
        message: String,

        /// Target platform (linkedin, twitter, email, blog, ...)
        #[arg(long, default_value = "general", value_parser = commands::parse_enum::<ContentType>)]
        content_type: ContentType,

        /// Intended audience (retirees, prospects, high_net_worth, ...)
        #[arg(long, default_value = "general", value_parser = commands::parse_enum::<AudienceType>)]
        audience: AudienceType,

        /// Existing draft to refine
        #[arg(long)]
        draft: Option<String>,

        /// Audit the draft instead of rewriting it
        #[arg(long, requires = "draft")]
        review: bool,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the knowledge corpus
    Corpus {
        #[command(subcommand)]
        command: CorpusCommand,
    },

    /// Show the effective configuration
    Status,

    /// Print a default config file
    Config,
}

#[derive(Subcommand)]
enum CorpusCommand {
    /// Chunk counts by category
    Stats,

    /// Run retrieval only and show the ranked hits
    Search {
        query: String,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        #[arg(long, value_parser = commands::parse_enum::<ContentType>)]
        content_type: Option<ContentType>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve { port } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::serve::run(config, port).await?
        }
        Commands::Generate {
            message,
            content_type,
            audience,
            draft,
            review,
            json,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let options = commands::generate::GenerateOptions {
                message,
                content_type,
                audience,
                draft,
                review,
                json,
            };
            commands::generate::run(config, options).await?
        }
        Commands::Corpus { command } => {
            let config = commands::load_config(cli.config.as_deref())?;
            match command {
                CorpusCommand::Stats => commands::corpus::stats(&config).await?,
                CorpusCommand::Search {
                    query,
                    top_k,
                    content_type,
                } => commands::corpus::search(&config, &query, top_k, content_type).await?,
            }
        }
        Commands::Status => commands::status::run(cli.config.as_deref())?,
        Commands::Config => commands::config_cmd::run(),
    }

    Ok(())
}
