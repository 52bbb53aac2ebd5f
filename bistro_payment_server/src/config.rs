use std::env;

use bistro_order_engine::pricing::{PricingConfig, DEFAULT_TAX_RATE_BPS};
use bpg_common::{helpers::parse_boolean_flag, Money, Secret};
use chrono::Duration;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use stripe_tools::{webhook::DEFAULT_TOLERANCE_SECS, StripeConfig};

use crate::errors::ServerError;

const DEFAULT_BPG_HOST: &str = "127.0.0.1";
const DEFAULT_BPG_PORT: u16 = 8360;
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(24);
const DEFAULT_DELIVERY_FEE_CENTS: i64 = 399;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The single authoritative tax rate and delivery fee. These are deployment configuration;
    /// no request input can influence them.
    pub pricing: PricingConfig,
    pub stripe: StripeConfig,
    /// When true, the deterministic test gateway serves the payment routes instead of Stripe.
    /// The choice is made once at startup; request handling never consults the environment.
    pub payment_test_mode: bool,
    /// If false, webhook signature checks are skipped. **DANGER**: only for local development.
    pub webhook_signature_checks: bool,
    /// Replay-tolerance window for webhook signatures, in seconds.
    pub webhook_tolerance_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BPG_HOST.to_string(),
            port: DEFAULT_BPG_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            pricing: PricingConfig::default(),
            stripe: StripeConfig::default(),
            payment_test_mode: false,
            webhook_signature_checks: true,
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BPG_HOST").ok().unwrap_or_else(|| DEFAULT_BPG_HOST.into());
        let port = env::var("BPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BPG_PORT. {e} Using the default, {DEFAULT_BPG_PORT}, instead."
                    );
                    DEFAULT_BPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BPG_PORT);
        let database_url = env::var("BPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BPG_DATABASE_URL is not set. Please set it to the URL for the orders database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let pricing = pricing_from_env();
        let stripe = StripeConfig::new_from_env_or_default();
        let payment_test_mode = parse_boolean_flag(env::var("BPG_PAYMENT_TEST_MODE").ok(), false);
        let webhook_signature_checks = parse_boolean_flag(env::var("BPG_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        if !webhook_signature_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Do not run a production instance like this.");
        }
        let webhook_tolerance_secs = env::var("BPG_WEBHOOK_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for BPG_WEBHOOK_TOLERANCE. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_TOLERANCE_SECS);
        Self {
            host,
            port,
            database_url,
            auth,
            pricing,
            stripe,
            payment_test_mode,
            webhook_signature_checks,
            webhook_tolerance_secs,
        }
    }
}

/// The pricing constants. The source system this replaces had drifted to three different tax
/// rates across endpoints; here there is exactly one, configurable per deployment.
fn pricing_from_env() -> PricingConfig {
    let tax_rate_bps = env::var("BPG_TAX_RATE_BPS")
        .map_err(|_| {
            info!(
                "🪛️ BPG_TAX_RATE_BPS is not set. Using the default rate of {DEFAULT_TAX_RATE_BPS} basis points."
            )
        })
        .and_then(|s| {
            s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for BPG_TAX_RATE_BPS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_TAX_RATE_BPS);
    let delivery_fee = env::var("BPG_DELIVERY_FEE_CENTS")
        .map_err(|_| {
            info!(
                "🪛️ BPG_DELIVERY_FEE_CENTS is not set. Using the default fee of {DEFAULT_DELIVERY_FEE_CENTS} cents."
            )
        })
        .and_then(|s| {
            s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for BPG_DELIVERY_FEE_CENTS. {e}"))
        })
        .ok()
        .map(Money::new)
        .unwrap_or(Money::new(DEFAULT_DELIVERY_FEE_CENTS));
    let currency = env::var("BPG_CURRENCY")
        .map(|s| s.to_ascii_lowercase())
        .ok()
        .unwrap_or_else(|| bpg_common::DEFAULT_CURRENCY.to_string());
    PricingConfig { tax_rate_bps, delivery_fee, currency }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared HS256 secret used to validate access tokens from the identity provider.
    pub jwt_secret: Secret<String>,
    /// Validity period for tokens issued by operational tooling.
    pub token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this, since every session invalidates all previously issued tokens. Set BPG_JWT_SECRET \
             instead. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret), token_lifetime: DEFAULT_TOKEN_LIFETIME }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("BPG_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [BPG_JWT_SECRET]")))?;
        if secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "BPG_JWT_SECRET must be at least 32 bytes long.".to_string(),
            ));
        }
        let token_lifetime = env::var("BPG_TOKEN_LIFETIME")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for BPG_TOKEN_LIFETIME. {e}"))
                    .ok()
            })
            .map(Duration::hours)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Ok(Self { jwt_secret: Secret::new(secret), token_lifetime })
    }
}
