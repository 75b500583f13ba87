//! Bazaar CLI - shop from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Put two tees in the cart and apply a code
//! bazaar cart add tee --title "Logo Tee" --price 24.99 --qty 2 --size M
//! bazaar cart discount SAVE10
//!
//! # Save something for later, then sign in (guest wishlist is merged)
//! bazaar wishlist add mug --title "Mug" --price 12
//! bazaar login --email shopper@example.com
//!
//! # Place the order
//! bazaar checkout --name "Ada" --email ada@example.com --phone 5550102030 \
//!     --address "1 Market St" --city Springfield --postal-code 12345
//! ```
//!
//! State lives in `STOREFRONT_DATA_DIR`; the account wishlist is served from
//! `STOREFRONT_API_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::error::StorefrontError;

mod commands;
mod context;

use commands::{CartAction, CheckoutArgs, WishlistAction};
use context::Context;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Inspect and change the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Sign in with a one-time code and merge the guest wishlist
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Sign out and start a fresh guest wishlist
    Logout,
    /// Place an order for the current cart
    Checkout(CheckoutArgs),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not set up yet
            #[allow(clippy::print_stderr)]
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_cli=info,bazaar_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().without_time().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.report();
        // Flush pending Sentry events before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), StorefrontError> {
    let mut ctx = Context::open(config)?;

    let result = match cli.command {
        Commands::Cart { action } => commands::cart::run(&mut ctx, action),
        Commands::Wishlist { action } => commands::wishlist::run(&mut ctx, action).await,
        Commands::Login { email } => commands::account::login(&ctx, &email).await,
        Commands::Logout => commands::account::logout(&ctx),
        Commands::Checkout(args) => commands::checkout::run(&mut ctx, args).await,
    };

    ctx.print_notices();
    result
}
