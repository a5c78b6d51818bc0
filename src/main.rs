use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use studyhub::config::Config;
use studyhub::db::models::UserRole;
use studyhub::db::Database;
use studyhub::output::terminal;
use studyhub::summary::transcript::{transcript, NO_MESSAGES};

/// StudyHub: study groups with chat, shared files and extractive summaries.
///
/// Summarizes group discussions and uploaded documents by picking the
/// sentences that carry the most frequent terms.
#[derive(Parser)]
#[command(name = "studyhub", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Summarize text from files, or from stdin when no files are given
    Summarize {
        /// PDF or plain-text files to summarize
        files: Vec<PathBuf>,

        /// Sentences per summary (default: 6 for stdin, 7 for documents)
        #[arg(long)]
        max_sentences: Option<usize>,

        /// Number of files to summarize in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Print the text extracted from a PDF or plain-text file
    Extract {
        file: PathBuf,
    },

    /// Summarize a group's chat history and save it
    SummarizeGroup {
        group_id: i64,

        /// Email of the member requesting the summary
        #[arg(long)]
        user: String,

        /// Sentences in the summary (default: 6)
        #[arg(long)]
        max_sentences: Option<usize>,
    },

    /// Give a registered user the admin role (admins can create groups)
    Promote {
        email: String,
    },

    /// Show system status (DB stats, summarizer settings)
    Status,

    /// Start the web server (JSON API + realtime chat)
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("studyhub=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing StudyHub database...");
            let config = Config::load()?;
            let db = init_database(&config).await?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nStudyHub is ready. Register through the API, then run:");
            println!("  studyhub promote you@example.com");
        }

        Commands::Summarize {
            files,
            max_sentences,
            concurrency,
        } => {
            let config = Config::load()?;
            let summarizer = config.create_summarizer()?;

            if files.is_empty() {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read text from stdin")?;
                let max = max_sentences.unwrap_or(config.chat_sentences);
                let summary = summarizer.summarize(&text, max).await?;
                terminal::display_summary("Summary", &summary);
                return Ok(());
            }

            let max = max_sentences.unwrap_or(config.document_sentences);
            let show_progress = files.len() > 1;
            let results = studyhub::pipeline::batch::summarize_files(
                summarizer.as_ref(),
                files,
                max,
                concurrency,
                show_progress,
            )
            .await;

            let mut failed = 0;
            for result in &results {
                let title = result.path.display().to_string();
                match &result.result {
                    Ok(summary) => terminal::display_summary(&title, summary),
                    Err(message) => {
                        failed += 1;
                        println!("\n{} {}: {}", "Skipped".yellow().bold(), title, message);
                    }
                }
            }
            if failed > 0 {
                println!(
                    "\n{} of {} files could not be summarized",
                    failed,
                    results.len()
                );
            }
        }

        Commands::Extract { file } => {
            let text = studyhub::documents::extract_text_blocking(file.clone(), None)
                .await
                .map_err(|e| anyhow::anyhow!("{}: {e}", e.user_message()))?;
            terminal::display_extracted(&file.display().to_string(), &text);
        }

        Commands::SummarizeGroup {
            group_id,
            user,
            max_sentences,
        } => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            let summarizer = config.create_summarizer()?;

            let Some(credentials) = db.get_credentials_by_email(&user).await? else {
                anyhow::bail!("No user registered with email {user}");
            };
            let requester = credentials.user;

            let Some(group) = db.get_group(group_id).await? else {
                anyhow::bail!("Group not found");
            };
            if !group.has_member(requester.id) {
                anyhow::bail!("Not a group member");
            }

            let messages = db.get_group_messages(group_id).await?;
            let Some(text) = transcript(&messages) else {
                println!("{NO_MESSAGES}");
                return Ok(());
            };

            let max = max_sentences.unwrap_or(config.chat_sentences);
            let content = summarizer.summarize(&text, max).await?;
            let saved = db
                .save_summary(
                    group_id,
                    requester.id,
                    studyhub::db::models::SummarySource::Chat,
                    &content,
                )
                .await?;
            terminal::display_group_summary(&group, &messages, &saved);
        }

        Commands::Promote { email } => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            if !db.set_user_role(&email, UserRole::Admin).await? {
                anyhow::bail!("No user registered with email {email}");
            }
            println!("{} {} is now an admin", "✓".green(), email);
        }

        Commands::Status => {
            let config = Config::load()?;
            let db = open_database(&config).await?;
            studyhub::status::show(&db, &config).await?;
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            config.require_web()?;
            let db = init_database(&config).await?;
            let summarizer = config.create_summarizer()?;
            info!(summarizer = summarizer.name(), "Summarizer ready");
            studyhub::web::run_server(config, db, summarizer, port, &bind).await?;
        }
    }

    Ok(())
}

/// Open an existing database: PostgreSQL when DATABASE_URL names one,
/// otherwise the SQLite file at STUDYHUB_DB_PATH.
async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    if let Some(url) = postgres_url(config)? {
        return connect_postgres(url).await;
    }
    open_sqlite(config)
}

/// Like `open_database`, but creates the SQLite file if it is missing.
async fn init_database(config: &Config) -> Result<Arc<dyn Database>> {
    if let Some(url) = postgres_url(config)? {
        return connect_postgres(url).await;
    }
    initialize_sqlite(config)
}

fn postgres_url(config: &Config) -> Result<Option<&str>> {
    match config.database_url.as_deref() {
        Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
            if cfg!(feature = "postgres") {
                info!("Using PostgreSQL backend");
                Ok(Some(url))
            } else {
                anyhow::bail!(
                    "DATABASE_URL points to PostgreSQL but the 'postgres' feature is not compiled in.\n\
                     Rebuild with: cargo build --features postgres"
                )
            }
        }
        _ => Ok(None),
    }
}

#[cfg(feature = "postgres")]
async fn connect_postgres(url: &str) -> Result<Arc<dyn Database>> {
    studyhub::db::connect_postgres(url).await
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_url: &str) -> Result<Arc<dyn Database>> {
    anyhow::bail!("PostgreSQL support is not compiled in")
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &Config) -> Result<Arc<dyn Database>> {
    studyhub::db::open_sqlite(&config.db_path)
}

#[cfg(feature = "sqlite")]
fn initialize_sqlite(config: &Config) -> Result<Arc<dyn Database>> {
    studyhub::db::initialize_sqlite(&config.db_path)
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &Config) -> Result<Arc<dyn Database>> {
    anyhow::bail!("SQLite support is not compiled in; set DATABASE_URL to a PostgreSQL URL")
}

#[cfg(not(feature = "sqlite"))]
fn initialize_sqlite(config: &Config) -> Result<Arc<dyn Database>> {
    open_sqlite(config)
}
