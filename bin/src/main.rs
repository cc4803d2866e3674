//! tankobon CLI - monitor manga sources and download new chapters.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod display;
mod interval;
mod logging;

use commands::App;

#[derive(Parser)]
#[command(name = "tankobon")]
#[command(about = "Monitor manga sources and download new chapters as CBZ archives", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config.toml. Created with defaults if missing.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Download directory, overriding the configured one
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Write logs to a file instead of stderr. Defaults to tankobon.log in the data directory.
    #[arg(long, global = true, num_args = 0..=1, value_name = "PATH")]
    log_file: Option<Option<PathBuf>>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available connectors
    Connectors,

    /// Search a source for manga by title
    Search {
        /// Title to search for
        title: String,

        /// Connector to search
        #[arg(short, long, default_value = "bato")]
        connector: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the chapters of a manga
    Chapters {
        /// Manga URL on the source
        url: String,

        /// Connector that owns the URL
        #[arg(short, long, default_value = "bato")]
        connector: String,
    },

    /// Download chapters of a manga and wait for them to finish
    Download {
        /// Manga URL on the source
        url: String,

        /// Connector that owns the URL
        #[arg(short, long, default_value = "bato")]
        connector: String,

        /// Chapter number to download (repeatable). Defaults to every chapter not yet downloaded.
        #[arg(short = 'n', long = "chapter")]
        chapters: Vec<String>,

        /// Download selected chapters again even if an archive exists
        #[arg(long)]
        force: bool,
    },

    /// Monitor manga for new chapters until interrupted (Ctrl-C)
    Monitor {
        /// Manga URLs on the source
        #[arg(required = true)]
        urls: Vec<String>,

        /// Connector that owns the URLs
        #[arg(short, long, default_value = "bato")]
        connector: String,

        /// Time between checks (e.g. 90s, 30m, 1h, 01:30:00). Defaults to the configured interval.
        #[arg(short, long, value_parser = interval::parse_interval)]
        interval: Option<Duration>,

        /// Print the job table this often
        #[arg(long, value_parser = interval::parse_interval)]
        report: Option<Duration>,
    },

    /// Show the resolved configuration
    Config {
        /// Print only the path of the config file
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    logging::init(cli.verbose, cli.log_file)?;

    let app = App::load(cli.config, cli.download_dir, cli.quiet)?;

    match command {
        Commands::Connectors => commands::connectors::list_connectors(&app),
        Commands::Search {
            title,
            connector,
            json,
        } => commands::search::search(&app, &connector, &title, json).await,
        Commands::Chapters { url, connector } => {
            commands::chapters::list_chapters(&app, &connector, &url).await
        }
        Commands::Download {
            url,
            connector,
            chapters,
            force,
        } => commands::download::download(&app, &connector, &url, &chapters, force).await,
        Commands::Monitor {
            urls,
            connector,
            interval,
            report,
        } => commands::monitor::monitor(&app, &connector, &urls, interval, report).await,
        Commands::Config { path } => commands::config::show_config(&app, path),
    }
}
