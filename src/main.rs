mod config;
mod filename;
mod logging;
mod lrclib;
mod models;
mod playlist;
mod ports;
mod services;
#[cfg(test)]
mod test_utils;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    filename::FilenameFormat,
    logging::{init_tracing, shutdown_tracing},
    lrclib::LrclibClient,
    models::{EntryStatus, EntryUpdate, MatchResult, SearchMode, SearchStrategy, TrackQuery},
    services::{
        bulk::{BulkMatchScheduler, CancellationSignal},
        export::{lyrics_content, write_lrc_file, write_selected_lrc_files},
        matching::{search_ranked, search_single},
    },
};

const SERVICE_NAME: &str = "lrc-finder";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, global = true, env = "LRC_FINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `lrc_finder=debug` (default: warn)
    #[arg(long, default_value = "warn", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// OTLP gRPC endpoint to export spans to
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the commands that resolve lyrics.
#[derive(clap::Args, Debug)]
struct StrategyArgs {
    /// Lookup mode: exact, fuzzy or cached (default from config)
    #[arg(short, long)]
    mode: Option<SearchMode>,

    /// Only use the cache-only lookup endpoint
    #[arg(long)]
    no_external: bool,
}

impl StrategyArgs {
    fn apply(&self, mut strategy: SearchStrategy) -> SearchStrategy {
        if let Some(mode) = self.mode {
            strategy.mode = mode;
        }
        if self.no_external {
            strategy.try_external = false;
        }
        strategy
    }
}

/// Flags controlling where `.lrc` files go.
#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Write `.lrc` files for the matches
    #[arg(short, long)]
    write: bool,

    /// Output directory (default from config)
    #[arg(short, long)]
    output_directory: Option<PathBuf>,

    /// File name preset or pattern, e.g. `title-artist` or `{Artist} - {Title}`
    #[arg(long)]
    filename_format: Option<FilenameFormat>,
}

impl OutputArgs {
    fn directory(&self, config: &Config) -> PathBuf {
        self.output_directory
            .clone()
            .unwrap_or_else(|| config.output_directory())
    }

    fn format(&self, config: &Config) -> FilenameFormat {
        self.filename_format
            .clone()
            .unwrap_or_else(|| config.output.filename_format.clone())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the best lyrics match for one song
    Search {
        /// Track title
        #[arg(short, long)]
        title: String,

        /// Artist name
        #[arg(short, long)]
        artist: String,

        /// Album name
        #[arg(long)]
        album: Option<String>,

        /// Track duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Timing offset in seconds written into the `.lrc` file
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset: f64,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Free-text search, listing every result ranked by confidence
    Lookup {
        /// Search text, e.g. "weeknd blinding"
        text: String,

        /// Title to score the results against (default: the search text)
        #[arg(short, long)]
        title: Option<String>,

        /// Artist to score the results against
        #[arg(short, long)]
        artist: Option<String>,

        /// Duration to score the results against, in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Maximum number of results to print
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Match lyrics for every song in a playlist JSON file
    Process {
        /// JSON array of {trackName, artistName, albumName?, duration?, fileName?, id?}
        playlist: PathBuf,

        /// Only process entries with these ids
        #[arg(long = "only", value_name = "ID")]
        only: Vec<String>,

        /// Write the processed playlist with match data to this file
        #[arg(short, long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(
        SERVICE_NAME,
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    )?;

    let result = run(args).await;
    shutdown_tracing(tracer_provider);
    result
}

async fn run(args: Args) -> Result<()> {
    tracing::debug!("Loading configuration");
    let config = {
        if let Some(path) = &args.config {
            Config::from_file(path)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load lrc-finder config")?;

    match args.command {
        Commands::Search {
            title,
            artist,
            album,
            duration,
            offset,
            strategy,
            output,
        } => {
            let client = LrclibClient::new(&config.lrclib)?;
            let strategy = strategy.apply(config.strategy());

            let mut query = TrackQuery::new(title, artist);
            if let Some(album) = album {
                query = query.with_album(album);
            }
            if let Some(duration) = duration {
                query = query.with_duration(duration);
            }

            tracing::info!(?query, mode = %strategy.mode, "Searching for lyrics");
            let Some(result) = search_single(&client, &query, &strategy)
                .await
                .wrap_err("Lyrics search failed")?
            else {
                println!(
                    "No lyrics found for {} - {}",
                    query.artist_name, query.track_name
                );
                return Ok(());
            };

            print_match(&result);

            if output.write {
                let Some(content) = lyrics_content(&result.track, offset) else {
                    println!("Match has no lyrics text, nothing written");
                    return Ok(());
                };
                let file_name = filename::format_filename(&result.track, &output.format(&config));
                let path = write_lrc_file(&output.directory(&config), &file_name, &content)?;
                println!("Wrote {}", path.display());
            }
        }
        Commands::Lookup {
            text,
            title,
            artist,
            duration,
            limit,
        } => {
            let client = LrclibClient::new(&config.lrclib)?;

            let mut query = TrackQuery::new(
                title.unwrap_or_else(|| text.clone()),
                artist.unwrap_or_default(),
            );
            if let Some(duration) = duration {
                query = query.with_duration(duration);
            }

            let results = search_ranked(&client, &text, &query)
                .await
                .wrap_err("Lyrics search failed")?;
            if results.is_empty() {
                println!("No results for \"{}\"", text);
            }
            for (rank, result) in results.iter().take(limit).enumerate() {
                println!(
                    "{:>2}. [{:>3.0}%] {} - {} ({}, {}s) id={}{}",
                    rank + 1,
                    result.confidence_score * 100.0,
                    result.track.artist_name,
                    result.track.track_name,
                    display_album(&result.track.album_name),
                    result.track.duration.round(),
                    result.track.id,
                    if result.track.has_synced_lyrics() {
                        " synced"
                    } else {
                        ""
                    }
                );
            }
        }
        Commands::Process {
            playlist,
            only,
            report,
            strategy,
            output,
        } => {
            process_playlist(&config, &playlist, only, report, &strategy, &output).await?;
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                tracing::debug!("Creating default config");
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}

async fn process_playlist(
    config: &Config,
    playlist_path: &Path,
    only: Vec<String>,
    report: Option<PathBuf>,
    strategy: &StrategyArgs,
    output: &OutputArgs,
) -> Result<()> {
    let mut entries = playlist::load_playlist(playlist_path)?;
    let selection: HashSet<String> = only.into_iter().collect();

    let mut scheduler_config = config.scheduler_config();
    scheduler_config.strategy = strategy.apply(scheduler_config.strategy);

    let client = Arc::new(LrclibClient::new(&config.lrclib)?);
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = BulkMatchScheduler::new(client, scheduler_config).with_updates(tx);

    let cancel = CancellationSignal::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after in-flight lookups");
                cancel.cancel();
            }
        })
    };
    let printer = tokio::spawn(print_updates(rx));

    let summary = scheduler.process(&mut entries, &selection, &cancel).await;

    // Closing the channel ends the printer
    drop(scheduler);
    ctrl_c.abort();
    printer.await.wrap_err("Progress printer failed")?;

    println!(
        "Found {} of {} ({} not found, {} pending, {:.0}% resolved){}",
        summary.found,
        summary.total,
        summary.not_found,
        summary.pending,
        summary.progress(),
        if summary.cancelled { ", cancelled" } else { "" }
    );

    if let Some(report) = report {
        playlist::save_playlist(&report, &entries)?;
        println!("Report written to {}", report.display());
    }

    if output.write {
        let written = write_selected_lrc_files(
            &entries,
            &selection,
            &output.directory(config),
            &output.format(config),
        )?;
        println!("Wrote {} lyrics files", written.len());
    }

    Ok(())
}

async fn print_updates(mut rx: mpsc::UnboundedReceiver<EntryUpdate>) {
    while let Some(update) = rx.recv().await {
        match (&update.status, &update.match_data) {
            (EntryStatus::Found, Some(found)) => println!(
                "[found]     {} ({:.0}% {} - {})",
                update.id,
                found.confidence_score * 100.0,
                found.track.artist_name,
                found.track.track_name
            ),
            (EntryStatus::Searching, _) => {}
            (status, _) => println!("[{:<9}] {}", status.to_string(), update.id),
        }
    }
}

fn display_album(album: &str) -> &str {
    if album.is_empty() { "unknown album" } else { album }
}

fn print_match(result: &MatchResult) {
    let track = &result.track;
    println!("{} - {}", track.artist_name, track.track_name);
    println!("  Album:      {}", display_album(&track.album_name));
    println!("  Duration:   {}s", track.duration.round());
    println!("  LRCLIB id:  {}", track.id);
    println!(
        "  Lyrics:     {}",
        match (track.has_synced_lyrics(), track.has_plain_lyrics()) {
            (true, _) => "synced",
            (false, true) => "plain only",
            (false, false) => if track.instrumental { "instrumental" } else { "none" },
        }
    );
    println!("  Confidence: {:.0}%", result.confidence_score * 100.0);
    for reason in &result.confidence_reasons {
        println!("    - {}", reason);
    }
}
