use clap::{Parser, Subcommand};
use services_rag::Result;
use services_rag::commands::{ask, ingest, serve, show_config, show_status};

#[derive(Parser)]
#[command(name = "services-rag")]
#[command(about = "RAG backend for a government services directory")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved configuration
    Config,
    /// Fetch, parse, and index a services document
    Ingest {
        /// Google Doc id or sharing URL of the services document
        doc: String,
    },
    /// Ask a question against the indexed services
    Ask {
        /// The question to answer
        question: String,
        /// Number of chunks to retrieve (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Start the HTTP API server
    Serve {
        /// Bind host (overrides the configured value)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides the configured value)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show index and backing-service status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            show_config()?;
        }
        Commands::Ingest { doc } => {
            ingest(&doc).await?;
        }
        Commands::Ask { question, limit } => {
            ask(&question, limit).await?;
        }
        Commands::Serve { host, port } => {
            serve(host, port).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
