use clap::{Parser, Subcommand};

use yt_rank::commands;
use yt_rank::commands::channel::Mode;
use yt_rank::config::load_env;
use yt_rank::ranking::RankWeights;

#[derive(Parser)]
#[command(name = "yt-rank")]
#[command(about = "Fetch all videos from a YouTube channel and rank them by popularity and recency")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank all videos from a channel
    Channel {
        /// Channel ID (e.g., UCBa659QWEk1AI4Tg--mrJ2A)
        channel: String,

        /// Retrieval strategy: search listing, uploads playlist, or both
        #[arg(short, long, default_value = "uploads", value_parser = ["search", "uploads", "combined"])]
        strategy: String,

        /// Weight applied to like counts
        #[arg(long, default_value_t = 1.0)]
        like_weight: f64,

        /// Weight applied to view counts
        #[arg(long, default_value_t = 0.1)]
        view_weight: f64,

        /// Days after which a video's score halves
        #[arg(long, default_value_t = 90.0)]
        half_life_days: f64,

        /// Maximum number of ranked videos to show (default: 20)
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Keep the videos already retrieved if the fetch fails partway
        #[arg(long)]
        partial: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Rank all videos from a playlist
    Playlist {
        /// Playlist ID or URL (e.g., https://youtube.com/playlist?list=PL...)
        playlist: String,

        /// Weight applied to like counts
        #[arg(long, default_value_t = 1.0)]
        like_weight: f64,

        /// Weight applied to view counts
        #[arg(long, default_value_t = 0.1)]
        view_weight: f64,

        /// Days after which a video's score halves
        #[arg(long, default_value_t = 90.0)]
        half_life_days: f64,

        /// Maximum number of ranked videos to show (default: 20)
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Keep the videos already retrieved if the fetch fails partway
        #[arg(long)]
        partial: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Initialize with YouTube Data API key
    Init {
        /// YouTube Data API key
        #[arg(short = 'k', long)]
        api_key: Option<String>,

        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Load environment variables
    load_env();
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Channel {
            channel,
            strategy,
            like_weight,
            view_weight,
            half_life_days,
            limit,
            partial,
            json,
        } => {
            let mode = match strategy.as_str() {
                "search" => Mode::Search,
                "combined" => Mode::Combined,
                _ => Mode::Uploads,
            };
            let weights = RankWeights {
                like_weight,
                view_weight,
                half_life_days,
            };
            commands::channel::run(&channel, mode, &weights, limit, partial, json).await
        }
        Commands::Playlist {
            playlist,
            like_weight,
            view_weight,
            half_life_days,
            limit,
            partial,
            json,
        } => {
            let weights = RankWeights {
                like_weight,
                view_weight,
                half_life_days,
            };
            commands::playlist::run(&playlist, &weights, limit, partial, json).await
        }
        Commands::Init { api_key, force } => commands::init::run(api_key, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
