//! El Buen Sabor CLI - drive the client session and cart from a terminal.
//!
//! State lives in a JSON file (`BUEN_SABOR_STORAGE_PATH`), so successive
//! invocations behave like reopening the app: the stored token is re-checked
//! and the cart is restored if someone is still logged in.
//!
//! # Usage
//!
//! ```bash
//! # Store a token obtained from the backend's login endpoint
//! bs-cli login --token eyJhbGciOi...
//!
//! # Who is logged in
//! bs-cli whoami
//!
//! # Cart
//! bs-cli cart add --id 5 --kind manufactured --name "Pizza Muzza" --price 4500
//! bs-cli cart set --id 5 --kind manufactured --quantity 3
//! bs-cli cart remove --id 5
//! bs-cli cart show
//! bs-cli cart clear
//!
//! # Sign out (empties the cart)
//! bs-cli logout
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buen_sabor_client::ClientConfig;
use buen_sabor_core::{ProductId, ProductKind};

mod app;
mod commands;
mod telemetry;

#[derive(Parser)]
#[command(name = "bs-cli")]
#[command(author, version, about = "El Buen Sabor client tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a bearer token and resolve who it belongs to
    Login {
        /// Token returned by the backend
        #[arg(short, long)]
        token: String,
    },
    /// Drop the stored token and empty the cart
    Logout,
    /// Show the current session
    Whoami,
    /// Work with the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List the cart contents and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        #[arg(long)]
        id: ProductId,

        /// Product kind (`manufactured`, `inventory` or `promotion`)
        #[arg(short, long)]
        kind: Option<ProductKind>,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit price
        #[arg(short, long)]
        price: Decimal,

        /// Image URL
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Remove a product; without `--kind`, every kind with that ID
    Remove {
        /// Product ID
        #[arg(long)]
        id: ProductId,

        /// Product kind
        #[arg(short, long)]
        kind: Option<ProductKind>,
    },
    /// Set the quantity of a product; zero or less removes it
    Set {
        /// Product ID
        #[arg(long)]
        id: ProductId,

        /// New quantity
        #[arg(short, long, allow_negative_numbers = true)]
        quantity: i64,

        /// Product kind
        #[arg(short, long)]
        kind: Option<ProductKind>,
    },
    /// Empty the cart, as after a completed checkout
    Clear,
}

fn main() {
    let cli = Cli::parse();

    // Tracing is not up yet, so configuration errors go straight to stderr
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with_config_error(&e),
    };

    // Must be done before the tracing subscriber
    let _sentry_guard = telemetry::init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "buen_sabor_client=info,buen_sabor_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(telemetry::sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stderr)]
fn exit_with_config_error(error: &impl std::fmt::Display) -> ! {
    eprintln!("Failed to load configuration: {error}");
    std::process::exit(2);
}

fn run(cli: Cli, config: &ClientConfig) -> buen_sabor_client::Result<()> {
    let mut app = app::App::open(config);

    match cli.command {
        Commands::Login { token } => commands::session::login(&mut app, &token)?,
        Commands::Logout => commands::session::logout(&mut app),
        Commands::Whoami => commands::session::whoami(&app),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app),
            CartAction::Add {
                id,
                kind,
                name,
                price,
                image_url,
            } => commands::cart::add(&mut app, id, kind, name, price, image_url),
            CartAction::Remove { id, kind } => commands::cart::remove(&mut app, id, kind),
            CartAction::Set { id, quantity, kind } => {
                commands::cart::set(&mut app, id, quantity, kind);
            }
            CartAction::Clear => commands::cart::clear(&mut app),
        },
    }
    Ok(())
}
