//! Order history commands.

use gtm_shop_core::OrderId;
use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::models::Order;
use gtm_shop_storefront::state::AppState;

use super::money;

fn reference(order: &Order) -> String {
    order.short_ref().unwrap_or_else(|| "--------".to_string())
}

/// List the signed-in user's orders, newest first.
///
/// # Errors
///
/// Returns `AppError::Auth` without a session, or `AppError::Database` if the
/// backend fails.
pub async fn list(state: &AppState) -> Result<(), AppError> {
    let user = state.auth()?.require_user().await?;
    let orders = state.orders()?.list_for_user(user.id).await?;

    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }

    for order in &orders {
        let placed = order
            .created_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "#{}  {placed:<10}  {:<10}  {:>3} items  {:>10}",
            reference(order),
            order.status.as_str(),
            order.item_count(),
            money(state, order.total_amount),
        );
    }
    Ok(())
}

/// Show one order with its items.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed id, `AppError::NotFound` if
/// the order does not belong to the signed-in user.
pub async fn show(state: &AppState, id: &str) -> Result<(), AppError> {
    let user = state.auth()?.require_user().await?;
    let order_id: OrderId = id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{id} is not an order id")))?;

    let order = state.orders()?.get(order_id).await?;
    if order.user_id != user.id {
        return Err(AppError::NotFound(format!("Order {id}")));
    }

    println!("Order #{} ({})", reference(&order), order.status.as_str());
    if let Some(method) = order.payment_method {
        let payment = order
            .payment_status
            .map_or("pending", |s| s.as_str());
        println!("  Paid by {} ({payment})", method.label());
    }
    for item in &order.items {
        println!(
            "  {:>3} x {:<32} {:>10}",
            item.quantity,
            item.product_name,
            money(state, item.line_total()),
        );
    }
    println!("  Total {}", money(state, order.total_amount));

    let ship = &order.shipping_info;
    println!("  Ship to {}, {}", ship.full_name, ship.address);
    println!(
        "          {}, {} {}, {}",
        ship.city, ship.state, ship.zip_code, ship.country
    );
    Ok(())
}
