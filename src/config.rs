use std::{env, str::FromStr};

use crate::{
    error::{LaeErr, Result},
    scheduling::DEFAULT_FATIGUE_RANGE,
};

/// Environment variable holding the seed of the fatigue factor generator.
pub const SEED_VAR: &str = "LAE_SEED";

/// Environment variable selecting the nesting strategy, `left` or `balanced`.
pub const NESTING_VAR: &str = "LAE_NESTING";

/// How n-ary associative operations are split into binary ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestingConfig {
    #[default]
    LeftLeaning,
    Balanced,
}

impl FromStr for NestingConfig {
    type Err = LaeErr;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "left-leaning" => Ok(Self::LeftLeaning),
            "balanced" => Ok(Self::Balanced),
            other => Err(LaeErr::InvalidConfiguration(format!(
                "unknown nesting strategy {other:?}"
            ))),
        }
    }
}

/// Startup parameters of a `LinearAlgebraEngine`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    threads: usize,
    fatigue_range: (f64, f64),
    seed: Option<u64>,
    nesting: NestingConfig,
}

impl EngineConfig {
    /// Creates a new `EngineConfig` with the default fatigue range, no seed and left nesting.
    ///
    /// # Arguments
    /// * `threads` - The amount of workers in the pool.
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            fatigue_range: DEFAULT_FATIGUE_RANGE,
            seed: None,
            nesting: NestingConfig::default(),
        }
    }

    /// Creates a new `EngineConfig` overriding the defaults from `LAE_SEED` and `LAE_NESTING`.
    ///
    /// # Returns
    /// An `InvalidConfiguration` error if a variable is set to an unparsable value.
    pub fn from_env(threads: usize) -> Result<Self> {
        let mut config = Self::new(threads);

        if let Ok(seed) = env::var(SEED_VAR) {
            let seed = seed.trim().parse::<u64>().map_err(|e| {
                LaeErr::InvalidConfiguration(format!("{SEED_VAR}={seed:?} is not a valid seed: {e}"))
            })?;
            config = config.with_seed(seed);
        }

        if let Ok(nesting) = env::var(NESTING_VAR) {
            config = config.with_nesting(nesting.parse()?);
        }

        Ok(config)
    }

    pub fn with_fatigue_range(mut self, low: f64, high: f64) -> Self {
        self.fatigue_range = (low, high);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_nesting(mut self, nesting: NestingConfig) -> Self {
        self.nesting = nesting;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn fatigue_range(&self) -> (f64, f64) {
        self.fatigue_range
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn nesting(&self) -> NestingConfig {
        self.nesting
    }
}
