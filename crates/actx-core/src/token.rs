//! Token estimation and pressure telemetry.

use serde::{Deserialize, Serialize};

use crate::config::TokenApproach;

/// Stateless token estimator for one counting approach.
pub struct TokenMeter {
    approach: TokenApproach,
}

impl TokenMeter {
    pub fn new(approach: TokenApproach) -> Self {
        Self { approach }
    }

    /// Estimated token count for `text`.
    ///
    /// For `chardiv4` this is `floor(chars / 4)` — a deliberately cheap
    /// approximation; the interface stays fixed if better strategies land.
    pub fn count(&self, text: &str) -> u64 {
        match self.approach {
            TokenApproach::CharDiv4 => (text.chars().count() / 4) as u64,
        }
    }

    /// Pressure ratio `count / limit`, unclamped (values above 1.0 signal
    /// over-budget). Callers guarantee `limit > 0` via config validation.
    pub fn pressure(&self, count: u64, limit: u64) -> f64 {
        count as f64 / limit as f64
    }

    /// Token metrics annotation for one piece of content.
    pub fn metrics(&self, text: &str, limit: u64) -> TokenMetrics {
        let token_count = self.count(text);
        TokenMetrics {
            token_count,
            token_limit: limit,
            token_pressure: self.pressure(token_count, limit),
        }
    }
}

/// The token telemetry attached to operation results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    pub token_count: u64,
    pub token_limit: u64,
    pub token_pressure: f64,
}
