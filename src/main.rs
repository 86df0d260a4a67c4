use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mysic::app::{App, MessageLevel, Presenter, RequestToken, StatusMessage};
use mysic::config::Config;
use mysic::history::PlayEntry;
use mysic::service::{Artist, Playlist, PlaylistTracks, QueryResult, Session, Track};
use mysic::CatalogContext;

#[derive(Parser, Debug)]
#[command(name = "mysic", version, about = "Browse the OpenWhyd catalog with a local fallback")]
struct Cli {
    /// Config file (default: <config dir>/mysic/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep playlists and history in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Never contact the remote service
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search tracks by title, artist or genre
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// Trending tracks
    Hot,
    /// Recommended artists
    Artists,
    /// Tracks by one artist (name or id)
    Artist { name: String },
    /// List playlists
    Playlists,
    /// Show the tracks of a playlist
    Playlist { id: String },
    /// Create a playlist
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Add a track to a playlist
    Add { playlist_id: String, track_id: String },
    /// Remove a track from a playlist
    Remove { playlist_id: String, track_id: String },
    /// Record a play of a track
    Play { track_id: String },
    /// Recently played tracks
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Sign in to the remote service
    Login { email: String, password: String },
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
}

/// Prints results to stdout, one line per record
#[derive(Default)]
struct TerminalPresenter {
    failed: bool,
}

impl TerminalPresenter {
    fn print_error(&mut self, error: &Option<String>) {
        if let Some(e) = error {
            eprintln!("error: {}", e);
        }
    }

    fn print_track(index: usize, track: &Track) {
        println!(
            "{:>3}. [{}] {} - {} ({}) plays:{} <{}>",
            index + 1,
            track.id,
            track.artist,
            track.title,
            track.duration_label,
            track.play_count,
            track.source_label
        );
    }
}

impl Presenter for TerminalPresenter {
    fn show_tracks(&mut self, _token: RequestToken, heading: &str, result: &QueryResult<Vec<Track>>) {
        self.failed |= !result.success;
        self.print_error(&result.error);
        println!("{}", heading);
        if result.data.is_empty() {
            println!("  (no tracks)");
        }
        for (i, track) in result.data.iter().enumerate() {
            Self::print_track(i, track);
        }
    }

    fn show_artists(&mut self, _token: RequestToken, result: &QueryResult<Vec<Artist>>) {
        self.failed |= !result.success;
        self.print_error(&result.error);
        for artist in &result.data {
            println!(
                "[{}] {} ({}) popularity:{} followers:{} tracks:{}",
                artist.id,
                artist.name,
                artist.genre,
                artist.popularity,
                artist.follower_count,
                artist.track_ids.len()
            );
        }
    }

    fn show_playlists(&mut self, _token: RequestToken, result: &QueryResult<Vec<Playlist>>) {
        self.failed |= !result.success;
        self.print_error(&result.error);
        for playlist in &result.data {
            println!(
                "[{}] {} - {} tracks{}",
                playlist.id,
                playlist.name,
                playlist.track_ids.len(),
                playlist
                    .description
                    .as_deref()
                    .map(|d| format!(" - {}", d))
                    .unwrap_or_default()
            );
        }
    }

    fn show_playlist(&mut self, _token: RequestToken, result: &QueryResult<PlaylistTracks>) {
        self.failed |= !result.success;
        self.print_error(&result.error);
        if !result.success {
            return;
        }
        println!("{} [{}]", result.data.playlist.name, result.data.playlist.id);
        for (i, track) in result.data.tracks.iter().enumerate() {
            Self::print_track(i, track);
        }
    }

    fn show_history(&mut self, _token: RequestToken, entries: &[PlayEntry]) {
        for entry in entries {
            println!("{}  {}", entry.played_at.format("%Y-%m-%d %H:%M:%S"), entry.track_id);
        }
    }

    fn notify(&mut self, message: StatusMessage) {
        match message.level {
            MessageLevel::Info => println!("{}", message.text),
            MessageLevel::Error => {
                self.failed = true;
                eprintln!("error: {}", message.text);
            }
        }
    }

    fn session_changed(&mut self, session: Option<&Session>) {
        match session {
            Some(s) => tracing::info!("Signed in as {}", s.user_id),
            None => tracing::info!("Signed out"),
        }
    }
}

fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("MYSIC_LOG")
                .from_env_lossy(),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load config")?,
    };
    if cli.offline {
        config.remote.enabled = false;
    }

    let context = CatalogContext::from_config(config, cli.ephemeral)?;
    let mut app = App::new(context, TerminalPresenter::default());
    app.start().await;

    match cli.command {
        Command::Search { query } => {
            app.search(&query).await;
        }
        Command::Hot => {
            app.hot().await;
        }
        Command::Artists => {
            app.artists().await;
        }
        Command::Artist { name } => {
            app.open_artist(&name).await;
        }
        Command::Playlists => {
            app.playlists().await;
        }
        Command::Playlist { id } => {
            app.open_playlist(&id).await;
        }
        Command::Create { name, description } => {
            app.create_playlist(&name, &description).await;
        }
        Command::Add {
            playlist_id,
            track_id,
        } => {
            app.add_to_playlist(&playlist_id, &track_id).await;
        }
        Command::Remove {
            playlist_id,
            track_id,
        } => {
            app.remove_from_playlist(&playlist_id, &track_id).await;
        }
        Command::Play { track_id } => {
            app.play(&track_id).await;
        }
        Command::History { limit } => {
            app.history(limit).await;
        }
        Command::Login { email, password } => {
            app.login(&email, &password).await;
        }
        Command::Logout => {
            app.logout().await;
        }
        Command::Whoami => {
            app.who_am_i().await;
        }
    }

    if app.presenter().failed {
        std::process::exit(1);
    }
    Ok(())
}
