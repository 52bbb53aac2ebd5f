//! The payment gateway seam.
//!
//! Business logic only ever sees the [`PaymentGateway`] trait. The real adapter talks to Stripe
//! through [`stripe_tools`]; the deterministic [`TestGateway`] lets the full pipeline be
//! rehearsed without external dependencies. Which one serves a deployment is decided once, at
//! composition time in [`crate::server::run_server`], never by environment checks inside the
//! confirmation code path.

use bpg_common::Money;
use stripe_tools::{helpers::filter_method_types, IntentStatus, StripeApi, StripeApiError};
use thiserror::Error;

/// What the storefront needs to carry a payment forward: the intent id for later confirmation,
/// and the client secret it hands to the card widget.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub payment_intent_id: String,
    pub client_secret: String,
}

/// The read-back of an intent. The local system only ever inspects `status` and `amount`.
#[derive(Debug, Clone)]
pub struct PaymentIntentView {
    pub id: String,
    pub amount: Money,
    pub status: IntentStatus,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Payment gateway request failed. {0}")]
    Api(#[from] StripeApiError),
    #[error("Unknown payment intent {0}")]
    UnknownIntent(String),
}

#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Reserves `amount` with the payment authority for later capture. Method types that cannot
    /// settle in `currency` are filtered out before the call.
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
        method_types: &[String],
    ) -> Result<IntentHandle, GatewayError>;

    /// Retrieves the intent so the caller can check its status and amount.
    async fn confirm(&self, intent_id: &str) -> Result<PaymentIntentView, GatewayError>;
}

//--------------------------------------   StripeGateway     ---------------------------------------------------------
#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }
}

impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
        method_types: &[String],
    ) -> Result<IntentHandle, GatewayError> {
        let method_types = filter_method_types(currency, method_types);
        let intent = self.api.create_payment_intent(amount, currency, &method_types).await?;
        let client_secret = intent.client_secret.unwrap_or_default();
        Ok(IntentHandle { payment_intent_id: intent.id, client_secret })
    }

    async fn confirm(&self, intent_id: &str) -> Result<PaymentIntentView, GatewayError> {
        let intent = self.api.fetch_payment_intent(intent_id).await?;
        Ok(PaymentIntentView { id: intent.id, amount: intent.amount, status: intent.status })
    }
}

//--------------------------------------    TestGateway      ---------------------------------------------------------
pub const TEST_INTENT_PREFIX: &str = "pi_test_";

/// A deterministic stand-in for the payment authority.
///
/// Intent ids encode the currency and amount, so `confirm` can synthesize a `succeeded` view
/// without any state; creating the same intent twice yields the same id and secret. This is what
/// makes full pipeline rehearsal reproducible.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestGateway;

impl TestGateway {
    pub fn new() -> Self {
        Self
    }
}

impl PaymentGateway for TestGateway {
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
        _method_types: &[String],
    ) -> Result<IntentHandle, GatewayError> {
        let payment_intent_id = format!("{TEST_INTENT_PREFIX}{}_{}", currency.to_ascii_lowercase(), amount.value());
        let client_secret = format!("{payment_intent_id}_secret");
        Ok(IntentHandle { payment_intent_id, client_secret })
    }

    async fn confirm(&self, intent_id: &str) -> Result<PaymentIntentView, GatewayError> {
        let amount = intent_id
            .strip_prefix(TEST_INTENT_PREFIX)
            .and_then(|rest| rest.rsplit('_').next())
            .and_then(|cents| cents.parse::<i64>().ok())
            .ok_or_else(|| GatewayError::UnknownIntent(intent_id.to_string()))?;
        Ok(PaymentIntentView {
            id: intent_id.to_string(),
            amount: Money::new(amount),
            status: IntentStatus::Succeeded,
        })
    }
}
