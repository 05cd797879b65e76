//! VirusTotal v3 URL reputation lookups.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::VirusTotalConfig;
use crate::error::CheckError;
use crate::types::{SafetyLevel, UrlCheckResult, VendorVerdict};
use crate::ui::CheckBackend;

#[derive(Debug, Deserialize)]
struct UrlObject {
    data: UrlData,
}

#[derive(Debug, Deserialize)]
struct UrlData {
    attributes: UrlAttributes,
}

#[derive(Debug, Deserialize)]
struct UrlAttributes {
    #[serde(default)]
    last_analysis_stats: AnalysisStats,
    #[serde(default)]
    last_analysis_results: BTreeMap<String, VendorVerdict>,
}

#[derive(Debug, Deserialize, Default)]
struct AnalysisStats {
    #[serde(default)]
    malicious: u64,
    #[serde(default)]
    suspicious: u64,
    #[serde(default)]
    harmless: u64,
    #[serde(default)]
    undetected: u64,
}

/// Identifier VirusTotal uses for a URL object: unpadded URL-safe base64.
pub fn url_id(url: &str) -> String {
    URL_SAFE_NO_PAD.encode(url.as_bytes())
}

/// Path segment of the public report page: padded standard base64.
pub fn report_id(url: &str) -> String {
    STANDARD.encode(url.as_bytes())
}

/// Link to the public detection report for `url`.
pub fn report_link(url: &str) -> String {
    format!("https://www.virustotal.com/gui/url/{}/detection", report_id(url))
}

#[derive(Clone, Debug)]
pub struct VirusTotalClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    analysis_delay: Duration,
}

impl VirusTotalClient {
    pub fn new(cfg: &VirusTotalConfig) -> Result<Self, CheckError> {
        let http = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            analysis_delay: cfg.analysis_delay,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Submit `url` for analysis, wait, then fetch and aggregate the verdicts.
    pub async fn check_url(&self, url: &str) -> Result<UrlCheckResult, CheckError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CheckError::EmptyUrl);
        }
        let key = self.api_key.as_deref().ok_or(CheckError::NotConfigured)?;

        let submit = self
            .http
            .post(format!("{}/api/v3/urls", self.base_url))
            .header("x-apikey", key)
            .form(&[("url", url)])
            .send()
            .await?;
        if submit.status() != StatusCode::OK {
            debug!(status = %submit.status(), "virustotal submit rejected");
            return Err(CheckError::SubmitFailed);
        }

        if !self.analysis_delay.is_zero() {
            tokio::time::sleep(self.analysis_delay).await;
        }

        let analysis = self
            .http
            .get(format!("{}/api/v3/urls/{}", self.base_url, url_id(url)))
            .header("x-apikey", key)
            .send()
            .await?;
        if analysis.status() != StatusCode::OK {
            debug!(status = %analysis.status(), "virustotal analysis fetch rejected");
            return Err(CheckError::RetrieveFailed);
        }
        let body = analysis.text().await?;
        let object: UrlObject =
            serde_json::from_str(&body).map_err(|e| CheckError::Unexpected(e.to_string()))?;

        let result = aggregate(url, object.data.attributes);
        info!(url, level = %result.safety_level, total = result.total, "url checked");
        Ok(result)
    }
}

fn aggregate(url: &str, attrs: UrlAttributes) -> UrlCheckResult {
    let stats = attrs.last_analysis_stats;
    UrlCheckResult {
        url: url.to_string(),
        malicious: stats.malicious,
        suspicious: stats.suspicious,
        harmless: stats.harmless,
        undetected: stats.undetected,
        total: attrs.last_analysis_results.len() as u64,
        details: attrs.last_analysis_results,
        safety_level: SafetyLevel::from_counts(stats.malicious, stats.suspicious),
    }
}

impl CheckBackend for VirusTotalClient {
    type Error = CheckError;

    async fn check_url(&self, url: &str) -> Result<UrlCheckResult, CheckError> {
        VirusTotalClient::check_url(self, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_id_is_unpadded_url_safe() {
        assert_eq!(url_id("http://a.b/?x=1"), "aHR0cDovL2EuYi8_eD0x");
        assert!(!url_id("ab").ends_with('='));
    }

    #[test]
    fn report_link_uses_standard_base64() {
        assert_eq!(
            report_link("ab"),
            "https://www.virustotal.com/gui/url/YWI=/detection"
        );
    }

    #[test]
    fn total_counts_vendor_entries() {
        let attrs: UrlAttributes = serde_json::from_str(
            r#"{
                "last_analysis_stats": {"malicious": 0, "suspicious": 1, "harmless": 2, "timeout": 4},
                "last_analysis_results": {
                    "A": {"category": "harmless", "result": "clean"},
                    "B": {"category": "suspicious"}
                }
            }"#,
        )
        .unwrap();
        let r = aggregate("http://x", attrs);
        assert_eq!(r.total, 2);
        assert_eq!(r.undetected, 0);
        assert_eq!(r.safety_level, SafetyLevel::Suspicious);
    }
}
