//! DRC configuration loading
//!
//! A configuration file is JSON holding the design rules and the layer
//! stack. Either part may be omitted: rules fall back to their defaults and
//! the stack to a plain two-layer board.

use crate::board::LayerStack;
use crate::drc::DesignRules;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcConfig {
    #[serde(default)]
    pub rules: DesignRules,
    #[serde(default = "LayerStack::two_layer")]
    pub stack: LayerStack,
}

impl Default for DrcConfig {
    fn default() -> Self {
        Self { rules: DesignRules::default(), stack: LayerStack::two_layer() }
    }
}

impl DrcConfig {
    /// Read and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("[Config] Loaded {} ({} layers)", path.display(), config.stack.layer_count());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: DrcConfig = serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rules = &self.rules;
        ensure!(rules.bloat >= 0, "bloat must not be negative, got {}", rules.bloat);
        ensure!(rules.shrink >= 0, "shrink must not be negative, got {}", rules.shrink);
        for (name, value) in [
            ("min_wid", rules.min_wid),
            ("min_slk", rules.min_slk),
            ("min_drill", rules.min_drill),
            ("min_ring", rules.min_ring),
        ] {
            ensure!(value >= 0, "{} must not be negative, got {}", name, value);
        }
        self.stack.validate().context("Inconsistent layer stack")?;
        ensure!(
            self.stack.copper_layers().next().is_some(),
            "layer stack has no copper layer"
        );
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = DrcConfig::from_json_str("{}").unwrap();
        assert_eq!(config.rules, DesignRules::default());
        assert_eq!(config.stack.copper_layers().count(), 2);
    }

    #[test]
    fn test_custom_stack() {
        let json = r#"{
            "rules": { "bloat": 100000, "min_drill": 200000 },
            "stack": {
                "layers": [
                    { "name": "top", "kind": "copper", "group": 0 },
                    { "name": "gnd", "kind": "copper", "group": 1, "no_drc": true },
                    { "name": "bottom", "kind": "copper", "group": 2 },
                    { "name": "silk", "kind": "silk", "side": "Top" }
                ],
                "groups": ["top", "gnd", "bottom"],
                "top_group": 0,
                "bottom_group": 2
            }
        }"#;
        let config = DrcConfig::from_json_str(json).unwrap();
        assert_eq!(config.rules.bloat, 100_000);
        assert_eq!(config.rules.shrink, 254_000);
        assert_eq!(config.stack.layer_index("gnd"), Some(1));
        assert!(config.stack.is_no_drc(1));
        assert_eq!(config.stack.silk_layers().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_rejects_negative_rules() {
        let err = DrcConfig::from_json_str(r#"{"rules": {"bloat": -5}}"#).unwrap_err();
        assert!(err.to_string().contains("bloat"));
    }

    #[test]
    fn test_rejects_ungrouped_copper() {
        let json = r#"{"stack": {
            "layers": [{ "name": "top", "kind": "copper" }],
            "groups": ["top"], "top_group": 0, "bottom_group": 0
        }}"#;
        assert!(DrcConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = DrcConfig::default();
        let again = DrcConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(again.rules, config.rules);
        assert_eq!(again.stack.layer_count(), 4);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = DrcConfig::load("/nonexistent/drc.json").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }
}
