//! Wallet tuning knobs.
//!
//! Everything has a sensible mainnet default; `from_env` overrides from the
//! environment for deployments that need different fees or polling budgets.

use std::time::Duration;

use anyhow::{Context, Result};

/// Value attached to a jetton transfer to cover sub-account gas (0.1 TON).
pub const DEFAULT_ATTACH_FEE: u128 = 100_000_000;

/// Notification value forwarded to the recipient owner on jetton transfers.
pub const DEFAULT_FORWARD_AMOUNT: u128 = 1;

/// Wallet id baked into standard v3/v4 wallet contracts on the basechain.
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// TON attached to each jetton transfer message.
    pub attach_fee: u128,
    /// Forward amount inside the jetton transfer body.
    pub forward_amount: u128,
    /// Delay between confirmation polls.
    pub poll_interval: Duration,
    /// Polls before a submission or deployment is declared timed out.
    pub max_poll_attempts: u32,
    /// Seconds a signed external message stays valid.
    pub message_ttl: i64,
    /// Workchain the wallet contract lives in.
    pub workchain: i32,
    pub wallet_id: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        WalletConfig {
            attach_fee: DEFAULT_ATTACH_FEE,
            forward_amount: DEFAULT_FORWARD_AMOUNT,
            poll_interval: Duration::from_millis(100),
            max_poll_attempts: 600,
            message_ttl: 60,
            workchain: 0,
            wallet_id: DEFAULT_WALLET_ID,
        }
    }
}

impl WalletConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = WalletConfig::default();

        Ok(WalletConfig {
            attach_fee: env_or("TON_WALLET_ATTACH_FEE", defaults.attach_fee)?,
            forward_amount: env_or("TON_WALLET_FORWARD_AMOUNT", defaults.forward_amount)?,
            poll_interval: Duration::from_millis(env_or(
                "TON_WALLET_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            max_poll_attempts: env_or("TON_WALLET_MAX_POLL_ATTEMPTS", defaults.max_poll_attempts)?,
            message_ttl: env_or("TON_WALLET_MESSAGE_TTL", defaults.message_ttl)?,
            workchain: env_or("TON_WALLET_WORKCHAIN", defaults.workchain)?,
            wallet_id: env_or("TON_WALLET_ID", defaults.wallet_id)?,
        })
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
