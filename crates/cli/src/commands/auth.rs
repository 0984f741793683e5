//! Account session commands.

use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::state::AppState;

/// Create an account and sign in.
///
/// # Errors
///
/// Returns `AppError::Auth` if the input is invalid, the email is taken, or
/// the email must be confirmed first.
pub async fn sign_up(
    state: &AppState,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<(), AppError> {
    let user = state.auth()?.sign_up(email, password, name).await?;
    println!(
        "Welcome, {}!",
        user.name_or_email().unwrap_or("new customer")
    );
    Ok(())
}

/// Sign in with email and password.
///
/// # Errors
///
/// Returns `AppError::Auth` if the credentials are rejected.
pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    let user = state.auth()?.sign_in(email, password).await?;
    println!("Signed in as {}", user.name_or_email().unwrap_or("customer"));
    Ok(())
}

/// Sign out. The cart is kept.
///
/// # Errors
///
/// Returns `AppError::Auth` if the provider fails.
pub async fn sign_out(state: &AppState) -> Result<(), AppError> {
    state.auth()?.sign_out().await?;
    println!("Signed out");
    Ok(())
}

/// Print the signed-in user.
///
/// # Errors
///
/// Returns `AppError::Config` without a backend.
pub async fn whoami(state: &AppState) -> Result<(), AppError> {
    match state.auth()?.current_user().await {
        Some(user) => {
            println!("{}", user.name_or_email().unwrap_or("customer"));
            if let Some(email) = &user.email {
                println!("  {email}");
            }
            println!("  id {}", user.id);
        }
        None => println!("Not signed in"),
    }
    Ok(())
}
