//! Back-office commands.

use threadline_admin::{AdminFilter, ProductRow};
use threadline_core::{ProductId, ProductStatus};
use tracing::info;

use super::{CommandResult, Context};

/// List products for administrators.
///
/// # Errors
///
/// Returns an error if the user is not an admin or the list cannot be
/// fetched.
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context, filter: AdminFilter) -> CommandResult {
    let products = ctx.admin.list(&filter).await?;
    for product in &products {
        let row = ProductRow::from(product);
        let sale = row
            .list_price
            .map(|list| format!(" (list {list})"))
            .unwrap_or_default();
        println!(
            "{:<26} {:<40} {:<14} {:<8} {:>5}  {}{sale}",
            row.id, row.name, row.category, row.status, row.stock, row.price
        );
    }
    info!(count = products.len(), "products listed");
    Ok(())
}

/// Flip a product between active and inactive.
///
/// # Errors
///
/// Returns an error if the product is unknown or the change is rejected.
pub async fn toggle(ctx: &Context, product_id: &str) -> CommandResult {
    let id = ProductId::new(product_id);
    let current: ProductStatus = ctx.admin.get(&id).await?.status;
    let next = ctx.admin.toggle_status(&id, current).await?;
    info!(product_id = %id, from = %current, to = %next, "Status changed");
    Ok(())
}

/// Delete a product.
///
/// # Errors
///
/// Returns an error if the product is unknown or the deletion is rejected.
pub async fn delete(ctx: &Context, product_id: &str) -> CommandResult {
    let id = ProductId::new(product_id);
    ctx.admin.delete(&id).await?;
    info!(product_id = %id, "Product deleted");
    Ok(())
}
