//! Catalog browsing commands.

use gtm_shop_core::{Product, ProductId};
use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::state::AppState;

use super::money;

fn print_row(state: &AppState, product: &Product) {
    let stock = if product.is_available() { "" } else { "  (out of stock)" };
    println!(
        "{:>4}  {:<32} {:>9}  {}{stock}",
        product.id,
        product.name,
        money(state, product.price),
        product.category,
    );
}

/// List products, optionally narrowed by category and search term.
pub fn list(state: &AppState, category: Option<&str>, search: Option<&str>) {
    let catalog = state.catalog();
    let products: Vec<&Product> = match search {
        Some(term) => catalog.search(term),
        None => catalog.all().iter().collect(),
    };

    let mut shown = 0_usize;
    for product in products
        .into_iter()
        .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
    {
        print_row(state, product);
        shown += 1;
    }

    if shown == 0 {
        println!("No products found");
    }
}

/// Show one product in full.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the catalog.
pub fn show(state: &AppState, id: &str) -> Result<(), AppError> {
    let product = state
        .catalog()
        .get(&ProductId::new(id))
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;

    println!("{}", product.name);
    println!("  {}", product.description);
    println!("  Price:    {}", money(state, product.price));
    println!("  Category: {}", product.category);
    if let Some(rating) = product.rating {
        let reviews = product.reviews.unwrap_or_default();
        println!("  Rating:   {rating:.1} ({reviews} reviews)");
    }
    println!(
        "  Stock:    {}",
        if product.is_available() { "in stock" } else { "out of stock" }
    );
    Ok(())
}

/// List categories in catalog order.
pub fn categories(state: &AppState) {
    for category in state.catalog().categories() {
        println!("{category}");
    }
}
