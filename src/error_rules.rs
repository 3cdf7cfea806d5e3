//! Classification of upstream error bodies.
//!
//! Providers signal overload and quota problems with status codes plus free-form
//! wording, so the mapping is data rather than code: a versioned rule set with a
//! built-in default that can be replaced from a JSON file at startup.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{PrismError, Result};

pub const SUPPORTED_RULES_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRules {
    pub version: u32,
    pub overloaded: OverloadRule,
    pub quota: QuotaRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverloadRule {
    pub status: u16,
    /// Matched case-insensitively against the raw error body.
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRule {
    pub status: u16,
}

impl Default for ErrorRules {
    fn default() -> Self {
        Self {
            version: SUPPORTED_RULES_VERSION,
            overloaded: OverloadRule {
                status: 503,
                markers: vec!["overloaded".to_string()],
            },
            quota: QuotaRule { status: 429 },
        }
    }
}

impl ErrorRules {
    pub fn from_json(raw: &str) -> Result<Self> {
        let rules: ErrorRules = serde_json::from_str(raw)?;
        if rules.version != SUPPORTED_RULES_VERSION {
            return Err(PrismError::Config(format!(
                "unsupported error rules version {} (expected {})",
                rules.version, SUPPORTED_RULES_VERSION
            ))
            .into());
        }
        Ok(rules)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let rules = Self::from_json(&raw)?;
        tracing::info!("Loaded error rules v{} from {:?}", rules.version, path);
        Ok(rules)
    }

    pub fn classify(&self, status: StatusCode, body: String) -> PrismError {
        if status.as_u16() == self.overloaded.status && self.is_overload_body(&body) {
            PrismError::Overloaded(body)
        } else if status.as_u16() == self.quota.status {
            PrismError::QuotaExceeded(body)
        } else {
            PrismError::Upstream(status, body)
        }
    }

    fn is_overload_body(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        self.overloaded
            .markers
            .iter()
            .any(|m| lower.contains(&m.to_lowercase()))
    }
}
