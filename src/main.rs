use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use chatsearch::{Container, ContainerConfig, SearchQuery, SyncOptions, SyncStateRepository};

#[derive(Parser)]
#[command(name = "chatsearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, default_value = "~/.chatsearch")]
    data_dir: String,

    /// Mock embeddings + in-memory vector storage (no network)
    #[arg(long, global = true)]
    mock: bool,

    #[arg(long, global = true)]
    qdrant_url: Option<String>,

    #[arg(long, global = true, default_value = "messages")]
    collection: String,

    /// Operate on the field-encrypted variant (requires MESSAGE_ENCRYPTION_KEY)
    #[arg(long, global = true)]
    encrypted: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Incrementally index new messages from every joined channel
    Sync {
        /// Also fetch and index thread replies
        #[arg(long)]
        threads: bool,

        /// Per-channel message cap (0 = unlimited)
        #[arg(long, default_value = "0")]
        limit: u64,

        /// Sync a single channel, by name or id
        #[arg(short, long)]
        channel: Option<String>,
    },

    /// Semantic search over indexed messages
    Search {
        query: String,

        #[arg(long, default_value = "10")]
        num: usize,

        #[arg(short, long)]
        min_score: Option<f32>,

        /// Restrict to one channel id
        #[arg(short, long)]
        channel: Option<String>,

        /// Oldest unix timestamp to include
        #[arg(long)]
        since: Option<f64>,

        /// Newest unix timestamp to include
        #[arg(long)]
        until: Option<f64>,
    },

    /// Show the conversation around a message
    Context {
        channel_id: String,
        ts: String,

        /// Minutes either side of the message
        #[arg(short, long, default_value = "30")]
        window: u64,
    },

    /// Per-channel sync state and index size
    Status,

    /// Delete the variant's sync state (next sync refetches full history)
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = expand_tilde(&cli.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let container = Container::new(ContainerConfig {
        data_dir,
        mock: cli.mock,
        qdrant_url: cli.qdrant_url.clone(),
        collection: cli.collection.clone(),
        encrypted: cli.encrypted,
    })?;

    match cli.command {
        Commands::Sync {
            threads,
            limit,
            channel,
        } => {
            let use_case = container.sync_use_case()?;
            let options = SyncOptions {
                include_threads: threads,
                message_limit: limit,
                channel_filter: channel,
            };

            let report = use_case.execute(&options).await?;

            println!("Sync complete");
            println!(
                "  channels: {} seen, {} synced, {} failed",
                report.channels_seen, report.channels_synced, report.channels_failed
            );
            println!(
                "  messages: {} fetched, {} indexed, {} skipped",
                report.messages_fetched, report.messages_indexed, report.messages_skipped
            );
            if report.thread_replies_indexed > 0 {
                println!("  thread replies: {}", report.thread_replies_indexed);
            }
            if !report.errors.is_empty() {
                println!("  errors:");
                for error in &report.errors {
                    println!("   - {}", error);
                }
            }
        }

        Commands::Search {
            query,
            num,
            min_score,
            channel,
            since,
            until,
        } => {
            let use_case = container.search_use_case();

            let mut search_query = SearchQuery::new(&query).with_limit(num);
            if let Some(score) = min_score {
                search_query = search_query.with_min_score(score);
            }
            if let Some(channel) = channel {
                search_query = search_query.with_channel(channel);
            }
            if since.is_some() || until.is_some() {
                search_query = search_query
                    .with_time_range(since.unwrap_or(0.0), until.unwrap_or(f64::MAX));
            }

            let results = use_case.execute(search_query).await?;

            if results.is_empty() {
                println!("No results found.");
            } else {
                println!("Found {} results:\n", results.len());
                for (i, result) in results.iter().enumerate() {
                    println!("{}. {}", i + 1, result.display_line());
                }
            }
        }

        Commands::Context {
            channel_id,
            ts,
            window,
        } => {
            let use_case = container.context_use_case();
            let messages = use_case.execute(&channel_id, &ts, window).await?;

            if messages.is_empty() {
                println!("No indexed messages in that window.");
            } else {
                for message in &messages {
                    let author = message.user_name.as_deref().unwrap_or(&message.user_id);
                    let marker = if message.ts == ts { ">" } else { " " };
                    println!(
                        "{} [{}] {}: {}",
                        marker,
                        message.ts,
                        author,
                        message.text.as_deref().unwrap_or("")
                    );
                }
            }
        }

        Commands::Status => {
            let use_case = container.status_use_case();
            let report = use_case.execute().await?;

            let variant = if container.encrypted() {
                "encrypted"
            } else {
                "plaintext"
            };
            println!("Sync status ({})", variant);
            match report.last_full_sync {
                Some(when) => println!("  last full sync: {}", when.to_rfc3339()),
                None => println!("  last full sync: never"),
            }
            println!("  synced messages: {}", report.total_messages);
            println!("  indexed points:  {}", report.indexed_points);

            if !report.channels.is_empty() {
                println!("  channels:");
                for channel in &report.channels {
                    println!(
                        "   #{}: {} messages, cursor {}",
                        channel.channel_name,
                        channel.message_count,
                        channel.last_synced_ts.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Reset => {
            let removed = container.state_repo().reset().await?;
            if removed {
                println!("Sync state deleted. The next sync refetches full history.");
            } else {
                println!("No sync state to delete.");
            }
        }
    }

    Ok(())
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return format!("{}/{}", home.to_string_lossy(), &path[2..]);
        }
    }
    path.to_string()
}
