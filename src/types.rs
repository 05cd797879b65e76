use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Body of `POST /scan_barcode`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    pub barcode: String,
    #[serde(default)]
    pub is_sealed: bool,
}

/// Validity report for one scanned pack.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub name: String,
    pub expiry_date: String,
    pub status: String, // "valid" | "expired"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rxcui: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScanResult {
    pub fn is_valid(&self) -> bool {
        self.status == "valid"
    }
}

/// Recycling eligibility of a scanned pack.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Expired,
    UnsealedDisposal,
    ReadyForRecycle,
    Available,
}

/// Body of `POST /api/check-url`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlCheckRequest {
    pub url: String,
}

/// Aggregated vendor verdicts for one URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UrlCheckResult {
    pub url: String,
    pub malicious: u64,
    pub suspicious: u64,
    pub harmless: u64,
    pub undetected: u64,
    pub total: u64,
    #[serde(default)]
    pub details: BTreeMap<String, VendorVerdict>,
    pub safety_level: SafetyLevel,
}

/// One vendor's verdict as reported by the aggregation API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VendorVerdict {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Aggregated tri-state verdict. Unknown wire values read as `Safe`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SafetyLevel {
    Dangerous,
    Suspicious,
    #[default]
    Safe,
}

impl SafetyLevel {
    /// Derive the level from vendor counters.
    pub fn from_counts(malicious: u64, suspicious: u64) -> Self {
        if malicious > 0 || suspicious > 2 {
            SafetyLevel::Dangerous
        } else if suspicious > 0 {
            SafetyLevel::Suspicious
        } else {
            SafetyLevel::Safe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SafetyLevel::Dangerous => "dangerous",
            SafetyLevel::Suspicious => "suspicious",
            SafetyLevel::Safe => "safe",
        }
    }
}

impl From<String> for SafetyLevel {
    fn from(s: String) -> Self {
        match s.as_str() {
            "dangerous" => SafetyLevel::Dangerous,
            "suspicious" => SafetyLevel::Suspicious,
            _ => SafetyLevel::Safe,
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of vendor categories; used for badge classes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictCategory {
    Harmless,
    Undetected,
    Suspicious,
    Malicious,
    Timeout,
    TypeUnsupported,
    Unknown,
}

impl VerdictCategory {
    pub fn parse(s: &str) -> Self {
        match s {
            "harmless" => VerdictCategory::Harmless,
            "undetected" => VerdictCategory::Undetected,
            "suspicious" => VerdictCategory::Suspicious,
            "malicious" => VerdictCategory::Malicious,
            "timeout" => VerdictCategory::Timeout,
            "type-unsupported" => VerdictCategory::TypeUnsupported,
            _ => VerdictCategory::Unknown,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            VerdictCategory::Harmless => "harmless",
            VerdictCategory::Undetected => "undetected",
            VerdictCategory::Suspicious => "suspicious",
            VerdictCategory::Malicious => "malicious",
            VerdictCategory::Timeout => "timeout",
            VerdictCategory::TypeUnsupported => "type-unsupported",
            VerdictCategory::Unknown => "unknown",
        }
    }
}

/// JSON shape of every error response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}
