//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email and password accounts, profile bootstrapping
//! - `checkout` - Paying for the cart and clearing it
//! - `payment` - Payment gateway contract and local input validation
//! - `profile` - Editing the signed-in user's profile
//!
//! Services borrow their collaborators (`&'a dyn Trait`) from
//! [`AppState`](crate::state::AppState) and are cheap to build per call.

pub mod auth;
pub mod checkout;
pub mod payment;
pub mod profile;

pub use auth::{AuthError, AuthService, IdentityProvider, MemoryIdentity, SignUpOutcome};
pub use checkout::{CheckoutError, CheckoutService, Receipt};
pub use payment::{
    CardDetails, PaymentError, PaymentGateway, PaymentOutcome, PaymentRequest, PaypalCredentials,
    RecordingGateway,
};
pub use profile::{ProfileError, ProfileService};
