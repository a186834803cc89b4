use std::{env, time::Duration};

use log::*;
use market_order_engine::helpers::PricingPolicy;
use mos_common::{helpers::parse_boolean_flag, Money, Secret, DEFAULT_CURRENCY};
use stripe_tools::signature::DEFAULT_TOLERANCE_SECS;

const DEFAULT_MOS_HOST: &str = "127.0.0.1";
const DEFAULT_MOS_PORT: u16 = 8360;
const DEFAULT_SHIPPING_FEE_CENTS: i64 = 1000;
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SUCCESS_URL: &str = "http://localhost:3000/checkout/success";
const DEFAULT_CANCEL_URL: &str = "http://localhost:3000/checkout/cancel";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The currency payments are denominated in. Orders themselves are currency-agnostic integers.
    pub currency: String,
    pub pricing: PricingPolicy,
    pub gateway: GatewayConfig,
    /// Fallback redirect targets for hosted checkout when the client supplies none.
    pub success_url: String,
    pub cancel_url: String,
}

/// Payment-gateway settings. When `enabled` is false every payment endpoint answers 503 and webhook
/// deliveries are rejected; the rest of the order flow keeps working.
#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub api_base: Option<String>,
    pub secret_key: Secret<String>,
    pub publishable_key: String,
    pub webhook_secret: Secret<String>,
    pub timeout: Duration,
    pub signature_tolerance_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MOS_HOST.to_string(),
            port: DEFAULT_MOS_PORT,
            database_url: String::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            pricing: PricingPolicy::default(),
            gateway: GatewayConfig::default(),
            success_url: DEFAULT_SUCCESS_URL.to_string(),
            cancel_url: DEFAULT_CANCEL_URL.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MOS_HOST").ok().unwrap_or_else(|| DEFAULT_MOS_HOST.into());
        let port = env::var("MOS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for MOS_PORT. {e} Using the default, {DEFAULT_MOS_PORT}, instead.");
                    DEFAULT_MOS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MOS_PORT);
        let database_url = env::var("MOS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MOS_DATABASE_URL is not set. Please set it to the URL for the order database.");
            String::default()
        });
        let currency = env::var("MOS_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY.into());
        let pricing = configure_pricing();
        let gateway = GatewayConfig::from_env_or_default();
        let success_url = env::var("MOS_SUCCESS_URL").ok().unwrap_or_else(|| DEFAULT_SUCCESS_URL.into());
        let cancel_url = env::var("MOS_CANCEL_URL").ok().unwrap_or_else(|| DEFAULT_CANCEL_URL.into());
        Self { host, port, database_url, currency, pricing, gateway, success_url, cancel_url }
    }
}

fn configure_pricing() -> PricingPolicy {
    let defaults = PricingPolicy::default();
    let tax_basis_points = env::var("MOS_TAX_BASIS_POINTS")
        .ok()
        .and_then(|s| {
            s.parse::<u32>()
                .map_err(|e| {
                    warn!("🪛️ MOS_TAX_BASIS_POINTS is not a valid number ({e}). Using the default.");
                    e
                })
                .ok()
        })
        .unwrap_or(defaults.tax_basis_points);
    let shipping_fee = env::var("MOS_SHIPPING_FEE_CENTS")
        .ok()
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| {
                    warn!("🪛️ MOS_SHIPPING_FEE_CENTS is not a valid number ({e}). Using the default.");
                    e
                })
                .ok()
        })
        .map(Money::from_cents)
        .unwrap_or(Money::from_cents(DEFAULT_SHIPPING_FEE_CENTS));
    PricingPolicy { tax_basis_points, shipping_fee }
}

impl GatewayConfig {
    pub fn from_env_or_default() -> Self {
        let enabled = parse_boolean_flag(env::var("MOS_STRIPE_ENABLED").ok(), false);
        let secret_key = env::var("MOS_STRIPE_SECRET_KEY").ok().unwrap_or_else(|| {
            if enabled {
                warn!("🪛️ MOS_STRIPE_ENABLED is set but MOS_STRIPE_SECRET_KEY is missing. Payments will fail.");
            }
            String::default()
        });
        let publishable_key = env::var("MOS_STRIPE_PUBLISHABLE_KEY").ok().unwrap_or_default();
        let webhook_secret = env::var("MOS_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            if enabled {
                warn!("🪛️ MOS_STRIPE_WEBHOOK_SECRET is not set. Webhook deliveries will be rejected.");
            }
            String::default()
        });
        let api_base = env::var("MOS_STRIPE_API_URL").ok();
        let timeout = env::var("MOS_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS));
        Self {
            enabled,
            api_base,
            secret_key: Secret::new(secret_key),
            publishable_key,
            webhook_secret: Secret::new(webhook_secret),
            timeout,
            signature_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }
}
