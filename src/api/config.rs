//! Purpose: Registry-wide defaults copied into every context at creation.
//! Exports: `ContextConfig`.
//! Role: Seeds worker-pool size and the bound-state defaults; loadable from JSON or environment.
//! Invariants: A config that reaches a context has already passed `validate`.
#![allow(clippy::result_large_err)]

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};

pub const ENV_WORKER_THREADS: &str = "MESHCUT_WORKER_THREADS";
pub const ENV_GP_CONSTANT: &str = "MESHCUT_GP_CONSTANT";
pub const ENV_GP_ATTEMPTS: &str = "MESHCUT_GP_ATTEMPTS";

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    /// Worker pool size for multi-threaded contexts; 0 lets rayon decide.
    pub worker_threads: usize,
    pub general_position_constant: f64,
    pub general_position_attempts: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            general_position_constant: 1e-4,
            general_position_attempts: 4,
        }
    }
}

impl ContextConfig {
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let config: ContextConfig = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message("invalid context config")
                .with_source(err)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by any `MESHCUT_*` variables that are set.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = ContextConfig::default();
        if let Some(value) = lookup(ENV_WORKER_THREADS) {
            config.worker_threads = parse_var(ENV_WORKER_THREADS, &value)?;
        }
        if let Some(value) = lookup(ENV_GP_CONSTANT) {
            config.general_position_constant = parse_var(ENV_GP_CONSTANT, &value)?;
        }
        if let Some(value) = lookup(ENV_GP_ATTEMPTS) {
            config.general_position_attempts = parse_var(ENV_GP_ATTEMPTS, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.general_position_constant.is_finite() || self.general_position_constant <= 0.0 {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("general_position_constant must be finite and positive"));
        }
        if self.general_position_attempts == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("general_position_attempts must be at least 1"));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| {
        Error::new(ErrorKind::InvalidArgument).with_message(format!("{name}: invalid value {value:?}"))
    })
}
