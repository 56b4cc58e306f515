//! Grocery Aid CLI - Stores, EAN tools and shopping sessions.
//!
//! # Usage
//!
//! ```bash
//! # List stores
//! grocery-aid stores
//!
//! # Validate an EAN, complete a 12-digit prefix, embed a price
//! grocery-aid ean check 4006381333931
//! grocery-aid ean complete 400638133393
//! grocery-aid ean price 2123456000009 12.34
//!
//! # Work with a store visit
//! grocery-aid visit new <store>
//! grocery-aid visit add <visit> 4006381333931 -q 2
//! grocery-aid visit bins <visit>
//!
//! # Interactive session: scan codes line by line
//! grocery-aid shop --store <store>
//! ```
//!
//! # Commands
//!
//! - `stores` - List stores
//! - `ean` - Offline EAN-13 tools
//! - `visit` - Create, inspect and change store visits
//! - `shop` - Interactive shopping session

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grocery_aid_client::{ApiClient, GroceryAidConfig};
use grocery_aid_core::DEFAULT_QUANTITY;

mod commands;

#[derive(Parser)]
#[command(name = "grocery-aid")]
#[command(author, version, about = "Grocery Aid shopping assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stores
    Stores,
    /// EAN-13 tools (no server needed)
    Ean {
        #[command(subcommand)]
        action: EanAction,
    },
    /// Manage store visits
    Visit {
        #[command(subcommand)]
        action: VisitAction,
    },
    /// Interactive shopping session
    Shop {
        /// Start a new store visit in this store (id or URL)
        #[arg(short, long, conflicts_with = "visit")]
        store: Option<String>,

        /// Continue an existing store visit (id or URL)
        #[arg(short, long)]
        visit: Option<String>,
    },
}

#[derive(Subcommand)]
enum EanAction {
    /// Validate a code and show what it encodes
    Check {
        /// 13-digit code
        code: String,
    },
    /// Append the check digit to a 12-digit prefix
    Complete {
        /// First 12 digits
        prefix: String,
    },
    /// Embed a price into a variable-price code
    Price {
        /// Variable-price code (starts with 2)
        code: String,
        /// Price, e.g. 12.34
        price: Decimal,
    },
}

#[derive(Subcommand)]
enum VisitAction {
    /// Start a store visit
    New {
        /// Store id or URL
        store: String,
    },
    /// Show a store visit and its cart
    Show {
        /// Store visit id or URL
        visit: String,
    },
    /// Add a product to the cart
    Add {
        /// Store visit id or URL
        visit: String,
        /// EAN of the product
        ean: String,
        /// Number of items (ignored for variable-price codes)
        #[arg(short, long, default_value_t = DEFAULT_QUANTITY)]
        quantity: u32,
    },
    /// Change the quantity of a cart line
    Quantity {
        /// Store visit id or URL
        visit: String,
        /// Cart line, starting at 0
        index: usize,
        /// New quantity
        quantity: u32,
    },
    /// Remove a cart line
    Remove {
        /// Store visit id or URL
        visit: String,
        /// Cart line, starting at 0
        index: usize,
    },
    /// Show the cart split into price-limited groups
    Bins {
        /// Store visit id or URL
        visit: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &GroceryAidConfig) -> Option<sentry::ClientInitGuard> {
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

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = match GroceryAidConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grocery_aid=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &GroceryAidConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Ean { action } => match action {
            EanAction::Check { code } => commands::ean::check(&mut out, &code)?,
            EanAction::Complete { prefix } => commands::ean::complete(&mut out, &prefix)?,
            EanAction::Price { code, price } => commands::ean::price(&mut out, &code, price)?,
        },
        Commands::Stores => {
            let api = ApiClient::new(&config.api)?;
            commands::stores::list(&mut out, &api).await?;
        }
        Commands::Visit { action } => {
            let api = ApiClient::new(&config.api)?;
            match action {
                VisitAction::New { store } => commands::visit::create(&mut out, &api, &store).await?,
                VisitAction::Show { visit } => commands::visit::show(&mut out, &api, &visit).await?,
                VisitAction::Add {
                    visit,
                    ean,
                    quantity,
                } => commands::visit::add(&mut out, &api, &visit, &ean, quantity).await?,
                VisitAction::Quantity {
                    visit,
                    index,
                    quantity,
                } => commands::visit::quantity(&mut out, &api, &visit, index, quantity).await?,
                VisitAction::Remove { visit, index } => {
                    commands::visit::remove(&mut out, &api, &visit, index).await?;
                }
                VisitAction::Bins { visit } => commands::visit::bins(&mut out, &api, &visit).await?,
            }
        }
        Commands::Shop { store, visit } => {
            let api = ApiClient::new(&config.api)?;
            let start = match (store, visit) {
                (Some(store), _) => commands::shop::Start::NewVisit(store),
                (None, Some(visit)) => commands::shop::Start::Resume(visit),
                (None, None) => commands::shop::Start::Empty,
            };
            commands::shop::run(&api, start).await?;
        }
    }
    Ok(())
}
