//! Profile commands.

use gtm_shop_storefront::error::AppError;
use gtm_shop_storefront::models::{ProfileUpdate, UserProfile};
use gtm_shop_storefront::state::AppState;

fn print_profile(profile: &UserProfile) {
    println!("{}", profile.display_name.as_deref().unwrap_or("(no name)"));
    println!("  {}", profile.email);
    let fields = [
        ("Phone", &profile.phone),
        ("Address", &profile.address),
        ("City", &profile.city),
        ("State", &profile.state),
        ("Zip", &profile.zip_code),
        ("Country", &profile.country),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {label:<8} {value}");
        }
    }
}

/// Print the signed-in user's profile.
///
/// # Errors
///
/// Returns `AppError::Profile` without a session or if the backend fails.
pub async fn show(state: &AppState) -> Result<(), AppError> {
    match state.profiles()?.current().await? {
        Some(profile) => print_profile(&profile),
        None => println!("No profile yet. Create one with `gtm profile update --name ...`"),
    }
    Ok(())
}

/// Save the signed-in user's profile.
///
/// # Errors
///
/// Returns `AppError::Profile` if the name is blank, there is no session, or
/// the backend fails.
pub async fn update(state: &AppState, name: &str, update: ProfileUpdate) -> Result<(), AppError> {
    let profile = state.profiles()?.save(name, update).await?;
    println!("Your profile has been updated");
    print_profile(&profile);
    Ok(())
}
