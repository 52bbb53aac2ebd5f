use std::{env, time::Duration};

use bpg_common::Secret;
use log::*;

pub const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct StripeConfig {
    /// Base URL of the Stripe API. Only overridden in tests.
    pub api_url: String,
    /// The secret API key ("sk_live_..." / "sk_test_...").
    pub secret_key: Secret<String>,
    /// The webhook endpoint signing secret ("whsec_...").
    pub webhook_secret: Secret<String>,
    /// Hard deadline for a single call to the payment authority. The request thread blocks on
    /// gateway responses, so calls must not be allowed to hang for the lifetime of the socket.
    pub request_timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_STRIPE_API_URL.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = env::var("BPG_STRIPE_API_URL").ok().unwrap_or_else(|| DEFAULT_STRIPE_API_URL.to_string());
        let secret_key = env::var("BPG_STRIPE_SECRET_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ BPG_STRIPE_SECRET_KEY is not set. Calls to the payment authority will be rejected.");
            String::default()
        });
        let webhook_secret = env::var("BPG_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ BPG_STRIPE_WEBHOOK_SECRET is not set. Incoming webhook signatures cannot be verified without it."
            );
            String::default()
        });
        let request_timeout = env::var("BPG_STRIPE_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for BPG_STRIPE_TIMEOUT. {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Self {
            api_url,
            secret_key: Secret::new(secret_key),
            webhook_secret: Secret::new(webhook_secret),
            request_timeout,
        }
    }
}
