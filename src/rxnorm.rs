//! RxNorm name standardisation.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::RxNormConfig;

/// A standardised drug concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub name: String,
    pub rxcui: String,
}

#[derive(Debug, Deserialize)]
struct DrugsResponse {
    #[serde(rename = "drugGroup", default)]
    drug_group: Option<DrugGroup>,
}

#[derive(Debug, Deserialize)]
struct DrugGroup {
    #[serde(rename = "conceptGroup", default)]
    concept_group: Vec<ConceptGroup>,
}

#[derive(Debug, Deserialize)]
struct ConceptGroup {
    #[serde(rename = "conceptProperties", default)]
    concept_properties: Vec<ConceptProperties>,
}

#[derive(Debug, Deserialize)]
struct ConceptProperties {
    rxcui: String,
    name: String,
}

#[derive(Clone, Debug)]
pub struct RxNormClient {
    http: reqwest::Client,
    base_url: String,
}

impl RxNormClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    pub fn from_config(cfg: &RxNormConfig) -> reqwest::Result<Self> {
        Self::new(cfg.base_url.clone(), cfg.timeout)
    }

    /// Look up `name`; `Ok(None)` when RxNorm knows no concept for it.
    pub async fn lookup(&self, name: &str) -> reqwest::Result<Option<Concept>> {
        let resp = self
            .http
            .get(format!("{}/REST/drugs.json", self.base_url))
            .query(&[("name", name)])
            .send()
            .await?
            .error_for_status()?;
        let body: DrugsResponse = resp.json().await?;
        let concept = body
            .drug_group
            .into_iter()
            .flat_map(|g| g.concept_group)
            .find_map(|g| g.concept_properties.into_iter().next())
            .map(|p| Concept { name: p.name, rxcui: p.rxcui });
        Ok(concept)
    }

    /// Standardised `(name, rxcui)`, falling back to the input name on any failure.
    pub async fn standardize(&self, name: &str) -> (String, Option<String>) {
        match self.lookup(name).await {
            Ok(Some(c)) => {
                debug!(input = name, rxcui = %c.rxcui, "rxnorm concept found");
                (c.name, Some(c.rxcui))
            }
            Ok(None) => (name.to_string(), None),
            Err(e) => {
                warn!("rxnorm lookup failed: {e}");
                (name.to_string(), None)
            }
        }
    }
}
