//! Cart commands.

use gtm_shop_core::ProductId;
use gtm_shop_storefront::cart::Rehydration;
use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::state::AppState;

use super::money;

/// Print the cart lines and totals.
pub fn show(state: &AppState) {
    let cart = state.cart();

    if let Rehydration::Corrupt(reason) = cart.rehydration() {
        tracing::warn!(reason = %reason, "Saved cart was unreadable and has been reset");
    }

    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }

    for line in cart.lines() {
        println!(
            "{:>4}  {:<32} {:>3} x {:>9} = {:>10}",
            line.product.id,
            line.product.name,
            line.quantity,
            money(state, line.product.price),
            money(state, line.line_total()),
        );
    }
    println!(
        "{} items, total {}",
        cart.cart_item_count(),
        money(state, cart.cart_total())
    );
}

/// Add `quantity` units of a catalog product.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the catalog.
pub fn add(state: &AppState, id: &str, quantity: u32) -> Result<(), AppError> {
    let product = state
        .catalog()
        .get(&ProductId::new(id))
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    let name = product.name.clone();
    state.cart().add_to_cart(product, quantity);
    println!("Added {quantity} x {name}");
    Ok(())
}

/// Remove a product. Removing an absent product does nothing.
pub fn remove(state: &AppState, id: &str) {
    state.cart().remove_from_cart(&ProductId::new(id));
    println!("Removed {id}");
}

/// Set a product's quantity.
pub fn update(state: &AppState, id: &str, quantity: i64) {
    let product_id = ProductId::new(id);
    state.cart().update_quantity(&product_id, quantity);

    match state.cart().line(&product_id) {
        Some(line) => println!("{} now x {}", line.product.name, line.quantity),
        None => println!("{id} is not in the cart"),
    }
}

/// Empty the cart.
pub fn clear(state: &AppState) {
    state.cart().clear_cart();
    println!("Cart cleared");
}
