use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use slugline::api::{self, AppState};
use slugline::client::RemoteCatalog;
use slugline::config::Config;
use slugline::db::Database;
use slugline::models::{ContentEntity, MetadataLayer};
use slugline::resolver::{Navigation, ResolveView, Resolver};
use slugline::{headings, metadata, slug};

#[derive(Parser)]
#[command(name = "slugline")]
#[command(about = "Content identity resolution and SEO metadata for content sites")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the canonical slug of some text
    Slug {
        text: Vec<String>,
    },
    /// Print the table of contents of a markdown file as JSON
    Headings {
        file: PathBuf,
        /// Render the file to HTML instead
        #[arg(long)]
        html: bool,
    },
    /// Resolve a slug against the catalog
    Resolve {
        slug: String,
        /// Use a remote catalog API instead of the local database
        #[arg(long)]
        remote: Option<String>,
        /// Visitor session whose hint should be used
        #[arg(long)]
        session: Option<Uuid>,
    },
    /// Replace the local catalog with entities from a JSON file
    Import {
        file: PathBuf,
    },
    /// Print merged metadata for a path
    Meta {
        path: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
    },
}

/// Initialize tracing with output to stderr so command output stays clean on stdout.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "slugline=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = match &config.database_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    let db = db.with_hint_ttl(chrono::Duration::seconds(config.hint_ttl_secs));
    db.migrate()?;
    Ok(db)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    let db = open_database(&config)?;
    let app = api::create_router(AppState::new(db, config.site));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("slugline listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = Config::load();

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            serve(config, port).await?;
        }
        Some(Commands::Slug { text }) => {
            println!("{}", slug::normalize(&text.join(" ")));
        }
        Some(Commands::Headings { file, html }) => {
            let markdown = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if html {
                println!("{}", headings::render_markdown(&markdown).html);
            } else {
                print_json(&headings::extract_headings(&markdown))?;
            }
        }
        Some(Commands::Resolve {
            slug,
            remote,
            session,
        }) => {
            let remote = remote.or_else(|| config.remote_catalog_url.clone());
            let (resolver, hint) = match remote {
                Some(url) => {
                    let catalog = RemoteCatalog::new(url, std::env::var("SLUGLINE_API_KEY").ok());
                    (Resolver::without_hints(Arc::new(catalog)), None)
                }
                None => {
                    let db = open_database(&config)?;
                    let resolver = Resolver::new(Arc::new(db.clone()), Arc::new(db));
                    let hint = match session {
                        Some(session) => resolver.load_hint(session).await,
                        None => None,
                    };
                    (resolver, hint)
                }
            };

            let nav = Navigation::new(slug).with_hint(hint);
            let outcome = resolver.resolve(&nav).await;
            print_json(&ResolveView::from_outcome(&nav, outcome))?;
        }
        Some(Commands::Import { file }) => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let entities: Vec<ContentEntity> =
                serde_json::from_str(&content).context("Failed to parse catalog file")?;
            let db = open_database(&config)?;
            let written = db.replace_catalog(entities)?;
            println!("Imported {} entities", written);
        }
        Some(Commands::Meta {
            path,
            title,
            description,
            keywords,
        }) => {
            let db = open_database(&config)?;
            let page_default = MetadataLayer {
                title,
                description,
                keywords,
            };
            let merged = metadata::page_metadata(&db, &config.site, &page_default, &path).await;
            print_json(&merged)?;
        }
        None => {
            let port = config.port;
            serve(config, port).await?;
        }
    }

    Ok(())
}
