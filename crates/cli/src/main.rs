//! Threadline CLI - storefront and back-office from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password read from stdin unless --password/THREADLINE_PASSWORD is set)
//! tl login -e shopper@example.com
//!
//! # Browse the catalog
//! tl products --search linen --sort top-discount --max-price 2000
//!
//! # Cart
//! tl cart add 65b0c0ffee M white -q 2
//! tl cart show
//!
//! # Back-office
//! tl admin products list --status inactive
//! tl admin products toggle 65b0c0ffee
//! ```
//!
//! # Environment Variables
//!
//! - `THREADLINE_API_BASE_URL` - Backend base URL (required)
//! - `RUST_LOG` - Log filter (default: `threadline=info`)
//!
//! See `threadline_client::config` for the remaining settings.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use threadline_admin::AdminFilter;
use threadline_core::ProductStatus;
use threadline_storefront::SortOrder;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;
use commands::shop::ProductSearch;

#[derive(Parser)]
#[command(name = "tl")]
#[command(author, version, about = "Threadline storefront and admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long, env = "THREADLINE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget stored credentials
    Logout,
    /// Show the signed-in user's profile
    Whoami,
    /// Search the catalog
    Products {
        /// Text matched against name, description and category
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// newest, price-low-to-high, price-high-to-low, top-discount, name
        #[arg(long, default_value = "newest")]
        sort: SortOrder,

        #[arg(long)]
        min_price: Option<Decimal>,

        #[arg(long)]
        max_price: Option<Decimal>,

        /// Hide sold-out products
        #[arg(long)]
        in_stock: bool,
    },
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage saved products
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// List your orders
    Orders,
    /// Back-office commands
    Admin {
        #[command(subcommand)]
        target: AdminTarget,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add units of a product variant
    Add {
        product_id: String,
        size: String,
        color: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a variant's quantity (0 removes it)
    Set {
        product_id: String,
        size: String,
        color: String,
        quantity: i64,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// List saved products
    List,
    /// Save a product
    Add { product_id: String },
    /// Remove a saved product
    Remove { product_id: String },
}

#[derive(Subcommand)]
enum AdminTarget {
    /// Manage products
    Products {
        #[command(subcommand)]
        action: AdminProductAction,
    },
}

#[derive(Subcommand)]
enum AdminProductAction {
    /// List products
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// active or inactive
        #[arg(long)]
        status: Option<ProductStatus>,
    },
    /// Flip a product between active and inactive
    Toggle { product_id: String },
    /// Delete a product
    Delete { product_id: String },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("threadline=info")),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::from_env()?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&ctx, &email, password).await?;
        }
        Commands::Logout => commands::account::logout(&ctx).await?,
        Commands::Whoami => commands::account::whoami(&ctx).await?,
        Commands::Orders => commands::account::orders(&ctx).await?,
        Commands::Products {
            search,
            category,
            sort,
            min_price,
            max_price,
            in_stock,
        } => {
            let search = ProductSearch {
                search,
                category,
                sort,
                min_price,
                max_price,
                in_stock,
            };
            commands::shop::products(&ctx, search).await?;
        }
        Commands::Cart { action } => match action {
            CartAction::Show => commands::shop::cart_show(&ctx).await?,
            CartAction::Add {
                product_id,
                size,
                color,
                quantity,
            } => commands::shop::cart_add(&ctx, &product_id, &size, &color, quantity).await?,
            CartAction::Set {
                product_id,
                size,
                color,
                quantity,
            } => commands::shop::cart_set(&ctx, &product_id, &size, &color, quantity).await?,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::List => commands::shop::wishlist_list(&ctx).await?,
            WishlistAction::Add { product_id } => {
                commands::shop::wishlist_add(&ctx, &product_id).await?;
            }
            WishlistAction::Remove { product_id } => {
                commands::shop::wishlist_remove(&ctx, &product_id).await?;
            }
        },
        Commands::Admin {
            target: AdminTarget::Products { action },
        } => match action {
            AdminProductAction::List {
                search,
                category,
                status,
            } => {
                let filter = AdminFilter {
                    text: search,
                    category,
                    status,
                };
                commands::admin::list(&ctx, filter).await?;
            }
            AdminProductAction::Toggle { product_id } => {
                commands::admin::toggle(&ctx, &product_id).await?;
            }
            AdminProductAction::Delete { product_id } => {
                commands::admin::delete(&ctx, &product_id).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_product_search() {
        let cli = Cli::try_parse_from([
            "tl",
            "products",
            "--search",
            "linen",
            "--sort",
            "top-discount",
            "--max-price",
            "1999.50",
        ]);
        let Ok(Cli {
            command:
                Commands::Products {
                    search,
                    sort,
                    max_price,
                    ..
                },
        }) = cli
        else {
            panic!("expected products command");
        };
        assert_eq!(search.as_deref(), Some("linen"));
        assert_eq!(sort, SortOrder::TopDiscount);
        assert_eq!(max_price, "1999.50".parse().ok());
    }

    #[test]
    fn test_parses_admin_status_filter() {
        let cli = Cli::try_parse_from(["tl", "admin", "products", "list", "--status", "inactive"]);
        assert!(matches!(
            cli,
            Ok(Cli {
                command: Commands::Admin {
                    target: AdminTarget::Products {
                        action: AdminProductAction::List {
                            status: Some(ProductStatus::Inactive),
                            ..
                        }
                    }
                }
            })
        ));
    }
}
