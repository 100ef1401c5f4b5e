mod handlers;
mod send;
mod server;
mod simulate;
mod storage;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bidlock_core::lock::LockOptions;
use bidlock_core::types::DEFAULT_DESCRIPTION;

#[derive(Parser)]
#[command(
    name = "bidlock",
    about = "bidlock — single-item auctions coordinated through a distributed lock",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every command that touches an auction.
#[derive(Args, Clone, Debug)]
pub struct AuctionArgs {
    /// Storage backend: "memory" or "sqlite:<path>"
    #[arg(long, default_value = "memory", env = "BIDLOCK_STORAGE")]
    pub storage: String,

    /// Item auctioned by this process
    #[arg(long, default_value = "produto1", env = "PRODUCT_ID")]
    pub product_id: String,

    /// Lock time-to-live in milliseconds
    #[arg(long, default_value = "10000", env = "BIDLOCK_LOCK_TTL_MS")]
    pub lock_ttl_ms: u64,

    /// Lock attempts before a command is dropped
    #[arg(long, default_value = "5", env = "BIDLOCK_LOCK_ATTEMPTS")]
    pub lock_attempts: u32,

    /// Events buffered per subscriber before the oldest are dropped
    #[arg(long, default_value = "256", env = "BIDLOCK_MAILBOX")]
    pub mailbox: usize,
}

impl AuctionArgs {
    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            ttl: Duration::from_millis(self.lock_ttl_ms),
            max_attempts: self.lock_attempts,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run an auction server: opens the auction, accepts commands over HTTP,
    /// closes it when time is up
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3100")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Description of the auctioned item
        #[arg(long, default_value = DEFAULT_DESCRIPTION)]
        description: String,

        /// Seconds the auction stays open
        #[arg(long, default_value = "30", env = "BIDLOCK_DURATION_SECS")]
        duration_secs: u64,

        #[command(flatten)]
        auction: AuctionArgs,
    },

    /// Apply one JSON command read from stdin against the store
    Send {
        #[command(flatten)]
        auction: AuctionArgs,
    },

    /// Run bidders against an in-process auction and print the winner
    Simulate {
        /// Number of concurrent bidders
        #[arg(long, default_value = "3")]
        bidders: usize,

        /// Milliseconds between two bids of the same bidder
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        /// Seconds the auction stays open
        #[arg(long, default_value = "10", env = "BIDLOCK_DURATION_SECS")]
        duration_secs: u64,

        #[command(flatten)]
        auction: AuctionArgs,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            port,
            host,
            description,
            duration_secs,
            auction,
        } => {
            server::run(
                &host,
                port,
                auction,
                description,
                Duration::from_secs(duration_secs),
            )
            .await
        }
        Commands::Send { auction } => send::run(auction).await,
        Commands::Simulate {
            bidders,
            interval_ms,
            duration_secs,
            auction,
        } => {
            simulate::run(
                auction,
                bidders,
                Duration::from_millis(interval_ms),
                Duration::from_secs(duration_secs),
            )
            .await
        }
        Commands::Version => {
            println!("bidlock {}", env!("CARGO_PKG_VERSION"));
            println!("Lock-guarded auction coordination");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
