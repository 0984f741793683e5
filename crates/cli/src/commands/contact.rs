//! Contact form command.

use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::models::ContactMessage;
use gtm_shop_storefront::state::AppState;

/// Validate and store a contact message.
///
/// # Errors
///
/// Returns `AppError::Field` if a field is blank or the email is malformed,
/// or `AppError::Database` if the backend fails.
pub async fn send(
    state: &AppState,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> Result<(), AppError> {
    let message = ContactMessage::new(name, email, subject, message)?;
    state.contact()?.create(&message).await?;
    println!("Thanks {}, we'll get back to you soon", message.name);
    Ok(())
}
