use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;

use medassist_lib::agents::LlmAgentProvider;
use medassist_lib::api::{serve_until_ctrl_c, ApiContext};
use medassist_lib::config::{self, Config, ConfigError};
use medassist_lib::db::{self, DatabaseError};
use medassist_lib::knowledge::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use medassist_lib::knowledge::{open_retriever, KnowledgeError, KnowledgeIndex, TextSplitter};
use medassist_lib::llm::{LlmClient, LlmError, OllamaClient};

#[derive(Parser)]
#[command(name = "medassist", about = "MedAssist medical assistant backend", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and chat WebSocket until Ctrl-C.
    Serve {
        /// Listen address (overrides MEDASSIST_BIND_ADDR).
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Seed demo accounts and slots if the database has no doctors yet.
        #[arg(long)]
        demo: bool,
    },

    /// Create the database schema, optionally with demo data.
    InitDb {
        #[arg(long)]
        demo: bool,
    },

    /// Embed every text, markdown and XML file under a directory into the knowledge index.
    BuildIndex {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Output file (defaults to MEDASSIST_KNOWLEDGE_INDEX).
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    medassist_lib::init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = Config::from_env()?;

    match cli.command {
        Command::Serve { bind, demo } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            serve(config, demo)
        }
        Command::InitDb { demo } => init_db(&config, demo),
        Command::BuildIndex {
            dir,
            out,
            chunk_size,
            chunk_overlap,
        } => build_index(&config, &dir, out, TextSplitter::new(chunk_size, chunk_overlap)),
    }
}

fn init_db(config: &Config, demo: bool) -> Result<(), CliError> {
    let mut conn = db::open_database(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "Database ready");
    if demo {
        db::seed_demo_data(&mut conn)?;
    }
    Ok(())
}

fn serve(config: Config, demo: bool) -> Result<(), CliError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let mut conn = db::open_database(&config.database_path)?;
    if demo && db::get_doctor_names(&conn)?.is_empty() {
        db::seed_demo_data(&mut conn)?;
    }
    drop(conn);

    // The blocking HTTP client must be built before the async runtime exists.
    let llm: Arc<dyn LlmClient> = Arc::new(OllamaClient::from_config(&config)?);
    match llm.is_model_available(&config.chat_model) {
        Ok(true) => tracing::info!(model = %config.chat_model, "Chat model available"),
        Ok(false) => tracing::warn!(
            model = %config.chat_model,
            "Chat model not installed in Ollama; chat replies will fail until it is pulled"
        ),
        Err(e) => tracing::warn!("{e}; chat replies will fail until Ollama is running"),
    }

    let retriever = open_retriever(&config, llm.clone());
    let agents = Arc::new(LlmAgentProvider::new(&config, llm.clone(), retriever.clone()));
    let addr = config.bind_addr;
    let ctx = ApiContext::new(config, agents, retriever);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve_until_ctrl_c(ctx, addr))?;
    Ok(())
}

fn build_index(
    config: &Config,
    dir: &std::path::Path,
    out: Option<PathBuf>,
    splitter: TextSplitter,
) -> Result<(), CliError> {
    let client = OllamaClient::from_config(config)?;
    let index = KnowledgeIndex::build(dir, &client, &config.embedding_model, &splitter)?;
    let path = out.unwrap_or_else(|| config.knowledge_index_path.clone());
    index.save(&path)?;
    tracing::info!(chunks = index.len(), path = %path.display(), "Knowledge index written");
    Ok(())
}
