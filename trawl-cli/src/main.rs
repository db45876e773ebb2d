//! Trawl CLI - Fetch complete result sets from a search engine

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use trawl_client::HttpTransport;
use trawl_core::config::{parse_duration, DEFAULT_CONFIG};
use trawl_core::{Config, Query, Scroller, TrawlError};

#[derive(Parser)]
#[command(name = "trawl")]
#[command(about = "Fetch every document matching a query via scroll pagination", long_about = None)]
struct Cli {
    /// Config file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search engine base URL (overrides config)
    #[arg(long, global = true, env = "TRAWL_URL")]
    url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Destination path
        #[arg(default_value = "trawl.toml")]
        path: PathBuf,
    },

    /// Fetch all documents matching a query
    Fetch {
        /// Index to search
        index: String,

        /// Page size per request (default from config)
        #[arg(short, long)]
        size: Option<usize>,

        /// Query clause as JSON (default: match_all)
        #[arg(short, long)]
        filter: Option<String>,

        /// Scroll lease, e.g. "1m" (default from config)
        #[arg(long)]
        lease: Option<String>,

        /// Per-request timeout, e.g. "10s" (default from config)
        #[arg(long)]
        timeout: Option<String>,

        /// Print document ids
        #[arg(long)]
        ids: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { ref path } => cmd_init(path),
        Commands::Fetch {
            ref index,
            size,
            ref filter,
            ref lease,
            ref timeout,
            ids,
        } => load_config(cli.config.as_deref()).and_then(|config| {
            cmd_fetch(
                &config,
                FetchArgs {
                    url: cli.url.as_deref(),
                    index,
                    size,
                    filter: filter.as_deref(),
                    lease: lease.as_deref(),
                    timeout: timeout.as_deref(),
                    ids,
                    json: cli.json,
                },
            )
        }),
    };

    if let Err(e) = result {
        if cli.json {
            let error_json = match &e {
                TrawlError::Remote {
                    status,
                    kind,
                    reason,
                } => {
                    serde_json::json!({ "status": status, "type": kind, "reason": reason })
                }
                _ => serde_json::json!({ "type": "error", "reason": e.to_string() }),
            };
            eprintln!("{}", error_json);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

struct FetchArgs<'a> {
    url: Option<&'a str>,
    index: &'a str,
    size: Option<usize>,
    filter: Option<&'a str>,
    lease: Option<&'a str>,
    timeout: Option<&'a str>,
    ids: bool,
    json: bool,
}

fn load_config(path: Option<&Path>) -> trawl_core::Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

fn duration_arg(name: &str, value: Option<&str>, fallback: Duration) -> trawl_core::Result<Duration> {
    match value {
        Some(s) => parse_duration(s)
            .ok_or_else(|| TrawlError::ConfigParse(format!("invalid {name} '{s}'"))),
        None => Ok(fallback),
    }
}

fn cmd_init(path: &Path) -> trawl_core::Result<()> {
    use colored::Colorize;

    if path.exists() {
        return Err(TrawlError::ConfigExists(path.to_path_buf()));
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    println!("{} {}", "Created".green(), path.display());
    Ok(())
}

fn cmd_fetch(config: &Config, args: FetchArgs<'_>) -> trawl_core::Result<()> {
    use colored::Colorize;

    let url = args.url.unwrap_or(&config.engine.url);
    let timeout = duration_arg("timeout", args.timeout, config.request_timeout())?;
    let lease = duration_arg("lease", args.lease, config.lease())?;

    let mut builder = Query::builder().size(args.size.unwrap_or(config.scroll.page_size));
    if let Some(filter) = args.filter {
        builder = builder.filter(serde_json::from_str(filter)?);
    }
    let query = builder.build();

    let transport = HttpTransport::new(url, timeout)?;
    let result = Scroller::new(&transport)
        .with_lease(lease)
        .fetch_all(args.index, &query)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{}: {}  {}: {} ({})  {}: {}",
        "documents".green(),
        result.len(),
        "total".blue(),
        result.total.value,
        result.total.relation.as_str(),
        "rounds".blue(),
        result.rounds
    );
    if args.ids {
        for doc in &result.documents {
            println!("{}", doc.id);
        }
    }
    Ok(())
}
