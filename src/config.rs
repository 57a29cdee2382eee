//! Configuration management
//!
//! Settings come from a TOML file (`[network]`, `[strategy]`); secrets come
//! from the environment (.env supported) and override the file.
//!
//! Created: 2026-10-19

use std::path::Path;
use std::str::FromStr;

use alloy::primitives::{address, Address, U256};
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

// ── Ethereum mainnet Uniswap deployments ────────────────────────────
pub const UNIVERSAL_ROUTER: Address = address!("3fC91A3afd70395Cd496C647d5a6CC9D4B2b7FAD");
pub const SWAP_ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
pub const V3_FACTORY: Address = address!("1F98431c8aD98523631AE4a59f267346ea31F984");
pub const TICK_LENS: Address = address!("bfd8137f7d1516D3ea5cA83523914859ec47F573");

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Signing key, only from the environment
    #[serde(skip)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_universal_router")]
    pub universal_router: Address,
    #[serde(default = "default_swap_router")]
    pub swap_router: Address,
    #[serde(default = "default_factory")]
    pub factory: Address,
    #[serde(default = "default_tick_lens")]
    pub tick_lens: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Only victims spending this token are considered (None = any)
    #[serde(default)]
    pub base_token: Option<Address>,
    #[serde(default = "default_attack_budget", deserialize_with = "de_u256")]
    pub attack_budget_wei: U256,
    /// Minimum profit in whole input-token units
    #[serde(default)]
    pub min_profit: Decimal,
    /// Bitmap words loaded on each side of the current tick
    #[serde(default = "default_tick_word_radius")]
    pub tick_word_radius: i16,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_evaluations: usize,
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

fn default_rpc_url() -> String { "ws://127.0.0.1:8546".to_string() }
fn default_chain_id() -> u64 { 1 }
fn default_universal_router() -> Address { UNIVERSAL_ROUTER }
fn default_swap_router() -> Address { SWAP_ROUTER }
fn default_factory() -> Address { V3_FACTORY }
fn default_tick_lens() -> Address { TICK_LENS }
fn default_attack_budget() -> U256 { U256::from(40_000_000_000_000_000u64) }
fn default_tick_word_radius() -> i16 { 4 }
fn default_deadline_secs() -> u64 { 900 }
fn default_max_concurrent() -> usize { 16 }
fn default_true() -> bool { true }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            universal_router: UNIVERSAL_ROUTER,
            swap_router: SWAP_ROUTER,
            factory: V3_FACTORY,
            tick_lens: TICK_LENS,
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_token: None,
            attack_budget_wei: default_attack_budget(),
            min_profit: Decimal::ZERO,
            tick_word_radius: default_tick_word_radius(),
            deadline_secs: default_deadline_secs(),
            max_concurrent_evaluations: default_max_concurrent(),
            dry_run: true,
        }
    }
}

/// Token amounts may be written as integers or as (decimal or 0x) strings,
/// since TOML integers stop at i64.
fn de_u256<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<U256, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(U256::from(v)),
        Raw::Str(s) => U256::from_str(s.trim()).map_err(serde::de::Error::custom),
    }
}

impl BotConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenv::dotenv().ok();

        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file falls back to defaults (plus environment).
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }

        dotenv::dotenv().ok();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// RPC_URL and PRIVATE_KEY from the environment take precedence.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(url) = lookup("RPC_URL").filter(|v| !v.is_empty()) {
            self.network.rpc_url = url;
        }
        if let Some(key) = lookup("PRIVATE_KEY").filter(|v| !v.is_empty()) {
            self.private_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.strategy.dry_run && self.private_key.is_none() {
            bail!("PRIVATE_KEY must be set when dry_run = false");
        }
        if self.strategy.tick_word_radius < 0 {
            bail!("tick_word_radius must be >= 0");
        }
        if self.strategy.max_concurrent_evaluations == 0 {
            bail!("max_concurrent_evaluations must be > 0");
        }
        Ok(())
    }
}
