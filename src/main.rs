//! CLI entry point for mdblog

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mdblog::config::BlogConfig;
use mdblog::Blog;

#[derive(Parser)]
#[command(name = "mdblog")]
#[command(version)]
#[command(about = "Serve a folder of markdown files as a blog with comments", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Config file (defaults to blog.yml in the base directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Blog folder
    #[arg(long, global = true)]
    src: Option<PathBuf>,

    /// Template folder
    #[arg(long, global = true)]
    tmpl: Option<PathBuf>,

    /// Path to the file server folder
    #[arg(long, global = true)]
    files: Option<PathBuf>,

    /// Comment store folder
    #[arg(long, global = true)]
    comments: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the blog server
    #[command(alias = "s")]
    Serve {
        /// Listen address of the web server, e.g. ":8001"
        #[arg(short, long)]
        port: Option<String>,
    },

    /// List pages with their comment counts
    List,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "mdblog=debug,tower_http=debug,info"
    } else {
        "mdblog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut config = match &cli.config {
        Some(path) => BlogConfig::load(path)?,
        None => Blog::new(&base_dir)?.config,
    };
    if let Some(src) = cli.src {
        config.source_dir = src;
    }
    if let Some(tmpl) = cli.tmpl {
        config.template_dir = tmpl;
    }
    if let Some(files) = cli.files {
        config.files_dir = files;
    }
    if let Some(comments) = cli.comments {
        config.comments_dir = comments;
    }

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let blog = Blog::with_config(&base_dir, config);
            tracing::debug!("Serving pages from {:?}", blog.source_dir);
            mdblog::server::start(&blog).await?;
        }

        Commands::List => {
            let blog = Blog::with_config(&base_dir, config);
            mdblog::commands::list::run(&blog)?;
        }

        Commands::Version => {
            println!("mdblog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
