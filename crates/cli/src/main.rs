//! GTM Shop CLI - Storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog and fill the cart (works offline)
//! gtm catalog list --category Apparel
//! gtm cart add 1 -q 2
//! gtm cart show
//!
//! # Account and checkout (needs GTM_SUPABASE_URL and GTM_SUPABASE_ANON_KEY)
//! gtm auth sign-in -e ada@example.com -p hunter22
//! gtm checkout card --number "4242 4242 4242 4242" --holder "Ada" \
//!     --expiry 12/29 --cvv 123 --token tok_visa --phone 555-0100 \
//!     --address "1 Way" --city London --state LDN --zip N1 --country UK
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and edit the persisted cart
//! - `catalog` - Browse bundled products
//! - `auth` - Sign up, sign in, sign out
//! - `orders` - Order history
//! - `profile` - View and edit the profile
//! - `contact` - Send a message to the shop
//! - `checkout` - Pay for the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};

use gtm_shop_storefront::config::{CartConfig, StorefrontConfig, TelemetryConfig};
use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::state::AppState;
use gtm_shop_storefront::telemetry;

mod commands;

#[derive(Parser)]
#[command(name = "gtm")]
#[command(author, version, about = "GTM Shop storefront client")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage the account session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// View order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// View and edit the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Send a message to the shop
    Contact {
        /// Your name
        #[arg(short, long)]
        name: String,

        /// Reply address
        #[arg(short, long)]
        email: String,

        /// Subject line
        #[arg(short, long)]
        subject: String,

        /// Message body
        #[arg(short, long)]
        message: String,
    },
    /// Pay for the cart
    Checkout {
        #[command(subcommand)]
        method: CheckoutMethod,
    },
}

impl Commands {
    /// Cart and catalog commands run offline.
    const fn needs_backend(&self) -> bool {
        !matches!(self, Self::Cart { .. } | Self::Catalog { .. })
    }
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and totals
    Show,
    /// Add a product
    Add {
        /// Product id
        id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove {
        /// Product id
        id: String,
    },
    /// Set a product's quantity (0 or less removes it)
    Update {
        /// Product id
        id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Match name, description, or category
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one product
    Show {
        /// Product id
        id: String,
    },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account
    SignUp {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Display name (defaults to the part of the email before `@`)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Sign in
    SignIn {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Sign out (the cart is kept)
    SignOut,
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders, newest first
    List,
    /// Show one order
    Show {
        /// Order id
        id: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile
    Show,
    /// Save the profile
    Update {
        /// Display name (required)
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        zip: Option<String>,

        #[arg(long)]
        country: Option<String>,
    },
}

#[derive(Subcommand)]
enum CheckoutMethod {
    /// Pay by card
    Card {
        /// Card number (validated locally, never sent)
        #[arg(long)]
        number: String,

        /// Cardholder name
        #[arg(long)]
        holder: String,

        /// Expiry as MM/YY
        #[arg(long)]
        expiry: String,

        #[arg(long)]
        cvv: String,

        /// Card token issued by the payment processor
        #[arg(long)]
        token: String,

        #[command(flatten)]
        shipping: ShippingArgs,
    },
    /// Pay with PayPal
    Paypal {
        /// PayPal account email
        #[arg(long)]
        paypal_email: String,

        /// PayPal password (validated locally, never sent)
        #[arg(long)]
        paypal_password: String,

        /// Approved PayPal order id
        #[arg(long)]
        order_id: String,

        #[command(flatten)]
        shipping: ShippingArgs,
    },
}

/// Shipping address. Name and email default to the signed-in user's.
#[derive(Args)]
struct ShippingArgs {
    #[arg(long)]
    full_name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    phone: String,

    #[arg(long)]
    address: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    #[arg(long)]
    zip: String,

    #[arg(long)]
    country: String,
}

#[tokio::main]
async fn main() {
    // Sentry must be initialized before the tracing subscriber
    let telemetry_config = TelemetryConfig::from_env();
    let _sentry_guard = telemetry::init_sentry(&telemetry_config);

    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        e.report();
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {}", e.user_message());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let state = if cli.command.needs_backend() {
        AppState::connect(&StorefrontConfig::from_env()?).await?
    } else {
        AppState::local(&CartConfig::from_env()).await?
    };

    let result = dispatch(&state, cli.command).await;

    // Pending cart writes must land before the process exits
    let report = state.cart().flushed().await;
    if !report.is_ok() {
        tracing::warn!(generation = report.generation, "Cart could not be saved");
    }

    result
}

async fn dispatch(state: &AppState, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(state),
            CartAction::Add { id, quantity } => commands::cart::add(state, &id, quantity)?,
            CartAction::Remove { id } => commands::cart::remove(state, &id),
            CartAction::Update { id, quantity } => commands::cart::update(state, &id, quantity),
            CartAction::Clear => commands::cart::clear(state),
        },
        Commands::Catalog { action } => match action {
            CatalogAction::List { category, search } => {
                commands::catalog::list(state, category.as_deref(), search.as_deref());
            }
            CatalogAction::Show { id } => commands::catalog::show(state, &id)?,
            CatalogAction::Categories => commands::catalog::categories(state),
        },
        Commands::Auth { action } => match action {
            AuthAction::SignUp {
                email,
                password,
                name,
            } => commands::auth::sign_up(state, &email, &password, name.as_deref()).await?,
            AuthAction::SignIn { email, password } => {
                commands::auth::sign_in(state, &email, &password).await?;
            }
            AuthAction::SignOut => commands::auth::sign_out(state).await?,
            AuthAction::Whoami => commands::auth::whoami(state).await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(state).await?,
            OrdersAction::Show { id } => commands::orders::show(state, &id).await?,
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(state).await?,
            ProfileAction::Update {
                name,
                phone,
                address,
                city,
                state: region,
                zip,
                country,
            } => {
                let update = gtm_shop_storefront::models::ProfileUpdate {
                    display_name: None,
                    phone,
                    address,
                    city,
                    state: region,
                    zip_code: zip,
                    country,
                };
                commands::profile::update(state, &name, update).await?;
            }
        },
        Commands::Contact {
            name,
            email,
            subject,
            message,
        } => commands::contact::send(state, &name, &email, &subject, &message).await?,
        Commands::Checkout { method } => match method {
            CheckoutMethod::Card {
                number,
                holder,
                expiry,
                cvv,
                token,
                shipping,
            } => {
                let card = gtm_shop_storefront::services::CardDetails {
                    number,
                    holder,
                    expiry,
                    cvv,
                };
                commands::checkout::card(state, &card, &token, shipping.into()).await?;
            }
            CheckoutMethod::Paypal {
                paypal_email,
                paypal_password,
                order_id,
                shipping,
            } => {
                let credentials = gtm_shop_storefront::services::PaypalCredentials {
                    email: paypal_email,
                    password: paypal_password,
                };
                commands::checkout::paypal(state, &credentials, &order_id, shipping.into()).await?;
            }
        },
    }
    Ok(())
}

impl From<ShippingArgs> for commands::checkout::ShippingInput {
    fn from(args: ShippingArgs) -> Self {
        Self {
            full_name: args.full_name,
            email: args.email,
            phone: args.phone,
            address: args.address,
            city: args.city,
            state: args.state,
            zip_code: args.zip,
            country: args.country,
        }
    }
}
