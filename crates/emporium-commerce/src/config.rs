//! Core configuration.
//!
//! Built once at process start and passed to the services; nothing in this
//! crate reads the environment.

use serde::{Deserialize, Serialize};

use crate::money::Currency;
use crate::CommerceError;

/// Settings for the commerce core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommerceConfig {
    /// The single currency the store sells in.
    #[serde(default)]
    pub currency: Currency,

    /// Upper bound on the quantity of one product in one cart line.
    #[serde(default = "default_max_quantity_per_item")]
    pub max_quantity_per_item: i64,

    #[serde(default)]
    pub checkout: CheckoutPolicy,
}

/// Knobs that change what checkout writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPolicy {
    /// Increment the applied coupon's usage count when an order is placed.
    #[serde(default)]
    pub count_coupon_usage: bool,
}

fn default_max_quantity_per_item() -> i64 {
    99
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            max_quantity_per_item: default_max_quantity_per_item(),
            checkout: CheckoutPolicy::default(),
        }
    }
}

impl CommerceConfig {
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.max_quantity_per_item < 1 {
            return Err(CommerceError::validation(
                "max_quantity_per_item must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CommerceConfig::default();
        assert_eq!(config.currency, Currency::USD);
        assert_eq!(config.max_quantity_per_item, 99);
        assert!(!config.checkout.count_coupon_usage);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: CommerceConfig =
            serde_json::from_str(r#"{"currency":"EUR","checkout":{"count_coupon_usage":true}}"#)
                .unwrap();
        assert_eq!(config.currency, Currency::EUR);
        assert_eq!(config.max_quantity_per_item, 99);
        assert!(config.checkout.count_coupon_usage);
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let config = CommerceConfig {
            max_quantity_per_item: 0,
            ..CommerceConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
