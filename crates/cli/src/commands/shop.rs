//! Catalog, cart and wishlist commands.

use rust_decimal::Decimal;
use threadline_core::{Price, Product, ProductId, VariantKey};
use threadline_storefront::{CatalogError, ProductQuery, SortOrder};
use tracing::info;

use super::{CommandResult, Context};

/// Catalog search options from the command line.
pub struct ProductSearch {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: SortOrder,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: bool,
}

impl From<ProductSearch> for ProductQuery {
    fn from(search: ProductSearch) -> Self {
        Self {
            text: search.search,
            category: search.category,
            min_price: search.min_price,
            max_price: search.max_price,
            in_stock_only: search.in_stock,
            sort: search.sort,
            ..Self::default()
        }
    }
}

fn price_label(product: &Product) -> String {
    let pricing = product.pricing();
    if pricing.is_discounted() {
        format!(
            "{} (was {}, -{}%)",
            Price::display(pricing.effective()),
            Price::display(pricing.amount),
            pricing.discount_percent().round()
        )
    } else {
        Price::display(pricing.amount)
    }
}

/// Search the catalog.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn products(ctx: &Context, search: ProductSearch) -> CommandResult {
    let query = ProductQuery::from(search);
    let products = ctx.storefront.catalog().search(&query).await?;

    for product in &products {
        let stock = if product.in_stock() { "" } else { "  [sold out]" };
        println!(
            "{:<26} {:<40} {:<14} {}{stock}",
            product.id,
            product.name,
            product.category,
            price_label(product)
        );
    }
    info!(count = products.len(), "products listed");
    Ok(())
}

/// Print the cart with prices from the catalog.
///
/// # Errors
///
/// Returns an error if the cart or catalog cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn cart_show(ctx: &Context) -> CommandResult {
    let cart = ctx.storefront.cart();
    let snapshot = cart.load().await?;
    if snapshot.is_empty() {
        println!("Cart is empty");
        return Ok(());
    }

    let products = ctx.storefront.catalog().products().await?;
    for (product_id, variant, quantity) in snapshot.iter() {
        let name = products
            .iter()
            .find(|p| &p.id == product_id)
            .map_or(product_id.as_str(), |p| p.name.as_str());
        println!("{quantity:>3} x {name} ({variant})");
    }
    println!("{} items, subtotal {}", cart.item_count(), Price::display(cart.subtotal(&products)));
    Ok(())
}

/// Add units of a variant to the cart.
///
/// # Errors
///
/// Returns an error if the product or variant is unknown or the server
/// rejects the change.
pub async fn cart_add(
    ctx: &Context,
    product_id: &str,
    size: &str,
    color: &str,
    quantity: u32,
) -> CommandResult {
    let variant = VariantKey::new(size, color)?;
    let product = ctx
        .storefront
        .catalog()
        .product(&ProductId::new(product_id))
        .await?;

    let cart = ctx.storefront.cart();
    cart.load().await?;
    cart.add(&product, &variant, quantity).await?;
    info!(items = cart.item_count(), "Added to cart");
    Ok(())
}

/// Set a variant's quantity; zero removes it.
///
/// # Errors
///
/// Returns an error if the server rejects the change.
pub async fn cart_set(
    ctx: &Context,
    product_id: &str,
    size: &str,
    color: &str,
    quantity: i64,
) -> CommandResult {
    let variant = VariantKey::new(size, color)?;
    let cart = ctx.storefront.cart();
    cart.load().await?;
    cart.set_quantity(&ProductId::new(product_id), &variant, quantity)
        .await?;
    info!(items = cart.item_count(), "Cart updated");
    Ok(())
}

/// List saved products.
///
/// # Errors
///
/// Returns an error if the wishlist cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn wishlist_list(ctx: &Context) -> CommandResult {
    let ids = ctx.storefront.wishlist().list().await?;
    for id in ids {
        match ctx.storefront.catalog().product(&id).await {
            Ok(product) => println!("{:<26} {:<40} {}", id, product.name, price_label(&product)),
            Err(CatalogError::NotFound(_)) => println!("{id:<26} (no longer available)"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Save a product.
///
/// # Errors
///
/// Returns an error if the server rejects the change.
pub async fn wishlist_add(ctx: &Context, product_id: &str) -> CommandResult {
    let ids = ctx
        .storefront
        .wishlist()
        .add(&ProductId::new(product_id))
        .await?;
    info!(saved = ids.len(), "Added to wishlist");
    Ok(())
}

/// Remove a saved product.
///
/// # Errors
///
/// Returns an error if the server rejects the change.
pub async fn wishlist_remove(ctx: &Context, product_id: &str) -> CommandResult {
    ctx.storefront
        .wishlist()
        .remove(&ProductId::new(product_id))
        .await?;
    info!("Removed from wishlist");
    Ok(())
}
