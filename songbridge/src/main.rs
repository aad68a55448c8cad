//! songbridge - migrate a music library from Spotify to YouTube
//!
//! Thin CLI wiring over the library crates: extract track text from the
//! source catalog, resolve tracks to video identifiers, populate a
//! destination playlist via the Data API or an authenticated browser
//! session.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use songbridge::clients::spotify::{self, SpotifyClient};
use songbridge::clients::youtube::YouTubeClient;
use songbridge::config::AppConfig;
use songbridge::cookies;
use songbridge::pipeline::{Pipeline, PipelineConfig, PopulatePath};
use songbridge::populate::api::{ApiPopulator, PlaylistTarget};
use songbridge::populate::browser::SessionPopulator;
use songbridge::populate::webdriver::WebDriverSession;
use songbridge::populate::PopulationOutcome;
use songbridge::resolver::Resolver;
use songbridge::songfile;
use songbridge_common::events::{EventSink, MigrationEvent};
use songbridge_common::text::{dedupe_preserving_order, filename_slug};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "songbridge", version, about = "Migrate a music library from Spotify to YouTube")]
struct Cli {
    /// Config file path (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract track queries from the source catalog into a text file
    Extract {
        #[command(subcommand)]
        source: ExtractSource,
    },

    /// Resolve a query file into a video identifier artifact
    Resolve {
        /// Query file, one track per line
        input: PathBuf,
        /// Artifact path (default: <input>.ids.txt)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Worker pool width
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Apply an identifier artifact to a destination playlist
    Populate {
        /// Identifier artifact written by `resolve` or `migrate`
        artifact: PathBuf,
        /// Destination playlist name
        #[arg(long)]
        playlist: String,
        /// Execution path
        #[arg(long, value_enum, default_value = "api")]
        path: PathChoice,
    },

    /// Run the full pipeline: resolve, persist the artifact, populate
    Migrate {
        /// Query file, one track per line
        input: PathBuf,
        /// Destination playlist name
        #[arg(long)]
        playlist: String,
        /// Execution path
        #[arg(long, value_enum, default_value = "api")]
        path: PathChoice,
        /// Artifact path (default: <input>.ids.txt)
        #[arg(long)]
        artifact: Option<PathBuf>,
        /// Worker pool width
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Remove duplicate queries from a song file, preserving order
    Dedupe {
        input: PathBuf,
        /// Output path (default: <input>-unique.txt)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Convert a Netscape cookies.txt export to the JSON cookie blob
    Cookies {
        input: PathBuf,
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum ExtractSource {
    /// Extract a playlist by share URL
    Playlist {
        url: String,
        /// Output path (default: <playlist-id>-<name>.txt)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Extract the user's liked songs
    Liked {
        /// Output path
        #[arg(long, default_value = "liked_songs.txt")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PathChoice {
    /// Quota-limited programmatic API
    Api,
    /// Authenticated browser session
    Browser,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current item");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Command::Extract { source } => extract(&config, source).await,
        Command::Resolve {
            input,
            output,
            concurrency,
        } => resolve(&config, cancel, &input, output, concurrency).await,
        Command::Populate {
            artifact,
            playlist,
            path,
        } => populate(&config, cancel, &artifact, playlist, path).await,
        Command::Migrate {
            input,
            playlist,
            path,
            artifact,
            concurrency,
        } => migrate(&config, cancel, &input, playlist, path, artifact, concurrency).await,
        Command::Dedupe { input, output } => dedupe(&input, output),
        Command::Cookies { input, output } => {
            let count = cookies::convert_netscape_file(&input, &output)?;
            println!("Converted {} cookies to {}", count, output.display());
            Ok(())
        }
    }
}

async fn extract(config: &AppConfig, source: ExtractSource) -> Result<()> {
    let client = SpotifyClient::new(config.require_spotify_token()?)?;

    let (tracks, output) = match source {
        ExtractSource::Playlist { url, output } => {
            let tracks = client.get_playlist_tracks(&url).await?;
            let output = match output {
                Some(path) => path,
                None => {
                    let id = spotify::playlist_id_from_url(&url)?;
                    let slug = filename_slug(&client.get_playlist_name(&url).await?);
                    if slug.is_empty() {
                        PathBuf::from(format!("{}.txt", id))
                    } else {
                        PathBuf::from(format!("{}-{}.txt", id, slug))
                    }
                }
            };
            (tracks, output)
        }
        ExtractSource::Liked { output } => (client.get_liked_songs().await?, output),
    };

    let queries: Vec<String> = tracks
        .iter()
        .map(|t| t.to_query())
        .filter(|q| !q.is_empty())
        .collect();

    songfile::write_queries(&output, &queries)?;
    println!("Saved {} track queries to {}", queries.len(), output.display());
    Ok(())
}

async fn resolve(
    config: &AppConfig,
    cancel: CancellationToken,
    input: &Path,
    output: Option<PathBuf>,
    concurrency: Option<usize>,
) -> Result<()> {
    let queries = songfile::read_queries(input)?;
    let client = Arc::new(YouTubeClient::new(config.require_youtube_token()?)?);

    let resolver = Resolver::new(client)
        .with_concurrency(concurrency.unwrap_or(config.concurrency))
        .with_events(spawn_event_logger())
        .with_cancellation(cancel);

    let identifiers = resolver.resolve(&queries).await;

    let output = output.unwrap_or_else(|| default_artifact_path(input));
    songfile::write_identifiers(&output, &identifiers)?;

    let resolved = identifiers.iter().filter(|entry| entry.is_some()).count();
    println!(
        "Resolved {}/{} queries; artifact written to {}",
        resolved,
        queries.len(),
        output.display()
    );
    Ok(())
}

async fn populate(
    config: &AppConfig,
    cancel: CancellationToken,
    artifact: &Path,
    playlist: String,
    path: PathChoice,
) -> Result<()> {
    let identifiers = songfile::read_identifiers(artifact)?;

    let outcome = match path {
        PathChoice::Api => {
            let client = Arc::new(YouTubeClient::new(config.require_youtube_token()?)?);
            let populator = ApiPopulator::new(client)
                .with_policy(config.retry.clone())
                .with_events(spawn_event_logger())
                .with_cancellation(cancel);

            let playlist_id = populator
                .ensure_playlist(&PlaylistTarget::Named(playlist))
                .await?;
            populator.populate(&playlist_id, &identifiers).await
        }
        PathChoice::Browser => {
            let session = connect_browser(config).await?;
            let populator = SessionPopulator::new(playlist, config.snapshot_dir.clone())
                .with_events(spawn_event_logger())
                .with_cancellation(cancel);

            populator.populate(Box::new(session), &identifiers).await?
        }
    };

    print_outcome(&outcome);
    Ok(())
}

async fn migrate(
    config: &AppConfig,
    cancel: CancellationToken,
    input: &Path,
    playlist: String,
    path: PathChoice,
    artifact: Option<PathBuf>,
    concurrency: Option<usize>,
) -> Result<()> {
    let search = Arc::new(YouTubeClient::new(config.require_youtube_token()?)?);

    let populate_path = match path {
        PathChoice::Api => PopulatePath::Api {
            client: search.clone(),
            target: PlaylistTarget::Named(playlist),
        },
        PathChoice::Browser => PopulatePath::Interactive {
            session: Box::new(connect_browser(config).await?),
            playlist_name: playlist,
        },
    };

    let pipeline_config = PipelineConfig {
        concurrency: concurrency.unwrap_or(config.concurrency),
        retry: config.retry.clone(),
        artifact_path: artifact.unwrap_or_else(|| default_artifact_path(input)),
        snapshot_dir: config.snapshot_dir.clone(),
    };

    let report = Pipeline::new(pipeline_config)
        .with_events(spawn_event_logger())
        .with_cancellation(cancel)
        .run(search, populate_path, input)
        .await?;

    println!(
        "Migration finished: {} resolved, {} unresolved, {} added, {} failed",
        report.resolved, report.unresolved, report.added, report.failed
    );
    Ok(())
}

fn dedupe(input: &Path, output: Option<PathBuf>) -> Result<()> {
    let lines = songfile::read_queries(input)?;
    let unique = dedupe_preserving_order(&lines);
    let removed = lines.len() - unique.len();

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("songs");
        input.with_file_name(format!("{}-unique.txt", stem))
    });

    songfile::write_queries(&output, &unique)?;
    println!(
        "Removed {} duplicates; {} unique queries written to {}",
        removed,
        unique.len(),
        output.display()
    );
    Ok(())
}

async fn connect_browser(config: &AppConfig) -> Result<WebDriverSession> {
    let cookies = cookies::load_cookie_file(&config.cookie_file)?;
    let session =
        WebDriverSession::connect(&config.webdriver_url, &cookies, config.element_wait).await?;
    Ok(session)
}

fn default_artifact_path(input: &Path) -> PathBuf {
    input.with_extension("ids.txt")
}

fn print_outcome(outcome: &PopulationOutcome) {
    println!(
        "Population finished: {} added, {} skipped, {} failed{}",
        outcome.added,
        outcome.skipped,
        outcome.failed,
        if outcome.halted {
            " (halted: quota exhausted)"
        } else {
            ""
        }
    );
}

/// Forward pipeline events into the log, one line per completed step.
fn spawn_event_logger() -> EventSink {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                MigrationEvent::TrackResolved {
                    query,
                    video_id,
                    completed,
                    total,
                    ..
                } => match video_id {
                    Some(id) => tracing::info!("[{}/{}] {} -> {}", completed, total, query, id),
                    None => tracing::info!("[{}/{}] {} -> not found", completed, total, query),
                },
                MigrationEvent::ItemAdded { index, video_id, .. } => {
                    tracing::info!("added #{} ({})", index + 1, video_id);
                }
                MigrationEvent::ItemFailed { index, reason, .. } => {
                    tracing::warn!("failed #{}: {}", index + 1, reason);
                }
                MigrationEvent::PopulateHalted { reason, .. } => {
                    tracing::error!("population halted: {}", reason);
                }
                _ => {}
            }
        }
    });

    tx
}
