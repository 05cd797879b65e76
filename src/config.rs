//! Runtime configuration for the service, assembled from CLI flags and environment.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const VIRUSTOTAL_BASE_URL: &str = "https://www.virustotal.com";
pub const RXNORM_BASE_URL: &str = "https://rxnav.nlm.nih.gov";

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    /// Directory served as static fallback (stylesheet).
    pub ui_dir: PathBuf,
    pub virustotal: VirusTotalConfig,
    pub rxnorm: RxNormConfig,
    pub shelf: ShelfPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            ui_dir: PathBuf::from("ui"),
            virustotal: VirusTotalConfig::default(),
            rxnorm: RxNormConfig::default(),
            shelf: ShelfPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirusTotalConfig {
    /// `None` makes every lookup fail with a "not configured" error.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Pause between submitting a URL and fetching its analysis.
    pub analysis_delay: Duration,
    pub timeout: Duration,
}

impl Default for VirusTotalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: VIRUSTOTAL_BASE_URL.to_string(),
            analysis_delay: Duration::from_secs(3),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RxNormConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Name looked up for every scan; GTINs cannot be searched directly.
    pub product_name: String,
    pub timeout: Duration,
}

impl Default for RxNormConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: RXNORM_BASE_URL.to_string(),
            product_name: "Paracetamol".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Minimum remaining shelf life for a sealed pack to be accepted for recycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShelfPolicy {
    pub min_shelf_life_days: i64,
}

impl Default for ShelfPolicy {
    fn default() -> Self {
        Self { min_shelf_life_days: 180 }
    }
}

impl ShelfPolicy {
    /// Human phrase for the minimum, e.g. "6-month" for 180 days.
    pub fn minimum_phrase(&self) -> String {
        let d = self.min_shelf_life_days;
        if d > 0 && d % 30 == 0 {
            format!("{}-month", d / 30)
        } else {
            format!("{d}-day")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_phrase_prefers_months() {
        assert_eq!(ShelfPolicy::default().minimum_phrase(), "6-month");
        assert_eq!(ShelfPolicy { min_shelf_life_days: 45 }.minimum_phrase(), "45-day");
    }
}
