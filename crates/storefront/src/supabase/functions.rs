//! Payment processing through a hosted edge function.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;
use url::Url;

use super::{SupabaseClient, SupabaseError};
use crate::services::payment::{PaymentError, PaymentGateway, PaymentOutcome, PaymentRequest};

/// Gateway that invokes `/functions/v1/{name}` with the user's session.
#[derive(Debug, Clone)]
pub struct EdgeFunctionGateway {
    client: SupabaseClient,
    function: String,
}

impl EdgeFunctionGateway {
    /// Create a gateway calling the function named `function`.
    #[must_use]
    pub fn new(client: SupabaseClient, function: impl Into<String>) -> Self {
        Self {
            client,
            function: function.into(),
        }
    }

    fn function_url(&self) -> Result<Url, SupabaseError> {
        self.client
            .endpoint(&format!("/functions/v1/{}", self.function.trim_matches('/')))
    }
}

#[async_trait]
impl PaymentGateway for EdgeFunctionGateway {
    #[instrument(skip(self, request), fields(method = %request.method, amount = %request.amount))]
    async fn process(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        let url = self.function_url()?;
        let http = self
            .client
            .request(Method::POST, url)
            .json(&request.to_body());

        let outcome: PaymentOutcome = self.client.send_json(http).await?;

        if outcome.success {
            tracing::info!(payment_id = ?outcome.payment_id, "Payment function approved charge");
        } else {
            tracing::warn!(error = ?outcome.error, "Payment function declined charge");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::SupabaseConfig;

    #[test]
    fn test_function_url() {
        let client = SupabaseClient::new(&SupabaseConfig {
            url: Url::parse("https://abc.supabase.co").unwrap(),
            anon_key: SecretString::from("anon"),
            payment_function: "process-payment".to_string(),
            email_redirect_url: None,
        });
        let gateway = EdgeFunctionGateway::new(client, "/process-payment");
        assert_eq!(
            gateway.function_url().unwrap().as_str(),
            "https://abc.supabase.co/functions/v1/process-payment"
        );
    }
}
