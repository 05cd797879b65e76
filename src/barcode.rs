use time::{Date, Month, OffsetDateTime};
use tracing::debug;

use crate::config::ShelfPolicy;
use crate::error::ScanError;
use crate::rxnorm::RxNormClient;
use crate::types::{Disposition, ScanRequest, ScanResult};
use crate::ui::ScanBackend;

/// ASCII group separator, the transmitted form of FNC1.
const GS: char = '\u{1d}';

/// Fields extracted from a GS1 barcode. Missing AIs stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gs1Fields {
    pub gtin: Option<String>,
    pub batch: Option<String>,
    /// Raw AI 17 value, `YYMMDD`.
    pub expiry: Option<String>,
    pub serial: Option<String>,
}

/// Parse decoded barcode text into GS1 fields.
///
/// Supported notations:
/// - bracketed: `(01)09501101530003(17)251231(10)AB12`; a batch runs to the next `(`
/// - raw element string, optionally with a `]d2`-style symbology prefix, variable
///   fields terminated by GS (0x1D) or end of input
pub fn parse_gs1(raw: &str) -> Gs1Fields {
    let raw = raw.trim();
    if raw.contains('(') {
        parse_bracketed(raw)
    } else {
        parse_element_string(raw)
    }
}

fn parse_bracketed(raw: &str) -> Gs1Fields {
    let fixed = |ai: &str, len: usize| -> Option<String> {
        let start = raw.find(ai)? + ai.len();
        raw.get(start..start + len).map(str::to_string)
    };

    let batch = raw.find("(10)").and_then(|i| {
        let rest = &raw[i + 4..];
        let end = rest.find('(').unwrap_or(rest.len());
        let b = rest[..end].trim();
        (!b.is_empty()).then(|| b.to_string())
    });
    let serial = raw.find("(21)").and_then(|i| {
        let rest = &raw[i + 4..];
        let end = rest.find('(').unwrap_or(rest.len());
        let s = rest[..end].trim();
        (!s.is_empty()).then(|| s.to_string())
    });

    Gs1Fields {
        gtin: fixed("(01)", 14),
        batch,
        expiry: fixed("(17)", 6),
        serial,
    }
}

fn parse_element_string(raw: &str) -> Gs1Fields {
    let mut rest = raw;
    if rest.starts_with(']') {
        rest = rest.get(3..).unwrap_or("");
    }
    let mut out = Gs1Fields::default();

    loop {
        rest = rest.trim_start_matches(GS);
        let Some(ai) = rest.get(..2) else { break };
        let body = &rest[2..];
        let (value, tail) = match ai {
            "01" => match take_fixed(body, 14) {
                Some(v) => v,
                None => break,
            },
            "11" | "13" | "15" | "16" | "17" => match take_fixed(body, 6) {
                Some(v) => v,
                None => break,
            },
            "10" | "21" => {
                let end = body.find(GS).unwrap_or(body.len());
                (&body[..end], &body[end..])
            }
            _ => {
                debug!(ai, "unsupported GS1 application identifier, stopping");
                break;
            }
        };
        match ai {
            "01" => out.gtin = Some(value.to_string()),
            "17" => out.expiry = Some(value.to_string()),
            "10" if !value.is_empty() => out.batch = Some(value.to_string()),
            "21" if !value.is_empty() => out.serial = Some(value.to_string()),
            _ => {}
        }
        rest = tail;
    }
    out
}

fn take_fixed(s: &str, len: usize) -> Option<(&str, &str)> {
    let v = s.get(..len)?;
    v.bytes().all(|b| b.is_ascii_digit()).then(|| (v, &s[len..]))
}

/// Parse an AI 17 `YYMMDD` value. Day `00` means the last day of the month.
pub fn parse_expiry(yymmdd: &str) -> Result<Date, ScanError> {
    let invalid = || ScanError::InvalidDate(yymmdd.to_string());
    if yymmdd.len() != 6 || !yymmdd.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let num = |r: std::ops::Range<usize>| yymmdd[r].parse::<u8>().map_err(|_| invalid());
    let year = 2000 + i32::from(num(0..2)?);
    let month = Month::try_from(num(2..4)?).map_err(|_| invalid())?;
    let day = match num(4..6)? {
        0 => time::util::days_in_year_month(year, month),
        d => d,
    };
    Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}

/// Classify a pack; returns the disposition and the whole days left until expiry.
pub fn classify(expiry: Date, today: Date, sealed: bool, policy: ShelfPolicy) -> (Disposition, i64) {
    let remaining = (expiry - today).whole_days();
    let disposition = if remaining < 0 {
        Disposition::Expired
    } else if !sealed {
        Disposition::UnsealedDisposal
    } else if remaining >= policy.min_shelf_life_days {
        Disposition::ReadyForRecycle
    } else {
        Disposition::Available
    };
    (disposition, remaining)
}

/// Server side of `POST /scan_barcode`.
#[derive(Clone, Debug)]
pub struct BarcodeService {
    names: Option<RxNormClient>,
    product_name: String,
    policy: ShelfPolicy,
}

impl BarcodeService {
    pub fn new(names: Option<RxNormClient>, product_name: impl Into<String>, policy: ShelfPolicy) -> Self {
        Self { names, product_name: product_name.into(), policy }
    }

    pub async fn scan(&self, req: &ScanRequest) -> Result<ScanResult, ScanError> {
        self.scan_on(req, OffsetDateTime::now_utc().date()).await
    }

    /// Same as [`scan`](Self::scan) with an explicit "today".
    pub async fn scan_on(&self, req: &ScanRequest, today: Date) -> Result<ScanResult, ScanError> {
        let fields = parse_gs1(&req.barcode);
        let raw_expiry = fields.expiry.as_deref().ok_or(ScanError::MissingExpiry)?;
        let expiry = parse_expiry(raw_expiry)?;

        let (name, rxcui) = match &self.names {
            Some(client) => client.standardize(&self.product_name).await,
            None => (self.product_name.clone(), None),
        };

        let (disposition, remaining) = classify(expiry, today, req.is_sealed, self.policy);
        let expiry_date = expiry.to_string();
        let message = self.message(&name, rxcui.as_deref(), fields.batch.as_deref(), &expiry_date, disposition, remaining);
        debug!(gtin = ?fields.gtin, ?disposition, remaining, "barcode classified");

        Ok(ScanResult {
            name,
            expiry_date,
            status: if disposition == Disposition::Expired { "expired" } else { "valid" }.to_string(),
            gtin: fields.gtin,
            batch: fields.batch,
            rxcui,
            disposition: Some(disposition),
            remaining_days: Some(remaining),
            message: Some(message),
        })
    }

    fn message(
        &self,
        name: &str,
        rxcui: Option<&str>,
        batch: Option<&str>,
        expiry_date: &str,
        disposition: Disposition,
        remaining: i64,
    ) -> String {
        let head = format!(
            "{name} (RxCUI: {}) Batch {}: ",
            rxcui.unwrap_or("N/A"),
            batch.unwrap_or("N/A")
        );
        let tail = match disposition {
            Disposition::Expired => "❌ EXPIRED. Must be disposed.".to_string(),
            Disposition::UnsealedDisposal => {
                "⚠️ UNSEALED. Disposal required, ineligible for recycling.".to_string()
            }
            Disposition::ReadyForRecycle => format!(
                "✅ READY FOR RECYCLING! Expires {expiry_date}. Meets {} minimum.",
                self.policy.minimum_phrase()
            ),
            Disposition::Available => {
                format!("⏳ VALID, but insufficient time for recycling ({remaining} days left).")
            }
        };
        head + &tail
    }
}

impl ScanBackend for BarcodeService {
    type Error = ScanError;

    async fn scan_barcode(&self, req: &ScanRequest) -> Result<ScanResult, ScanError> {
        self.scan(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn bracketed_fields() {
        let f = parse_gs1("(01)09501101530003(17)251231(10)AB12(21)S9");
        assert_eq!(f.gtin.as_deref(), Some("09501101530003"));
        assert_eq!(f.expiry.as_deref(), Some("251231"));
        assert_eq!(f.batch.as_deref(), Some("AB12"));
        assert_eq!(f.serial.as_deref(), Some("S9"));
    }

    #[test]
    fn bracketed_batch_runs_to_end() {
        let f = parse_gs1("(17)270101(10)LOT-7");
        assert_eq!(f.batch.as_deref(), Some("LOT-7"));
        assert_eq!(f.gtin, None);
    }

    #[test]
    fn element_string_with_prefix_and_separator() {
        let f = parse_gs1("]d201095011015300031725123110AB12\u{1d}21XYZ");
        assert_eq!(f.gtin.as_deref(), Some("09501101530003"));
        assert_eq!(f.expiry.as_deref(), Some("251231"));
        assert_eq!(f.batch.as_deref(), Some("AB12"));
        assert_eq!(f.serial.as_deref(), Some("XYZ"));
    }

    #[test]
    fn element_string_stops_at_unknown_ai() {
        let f = parse_gs1("0109501101530003990000");
        assert_eq!(f.gtin.as_deref(), Some("09501101530003"));
        assert_eq!(f.expiry, None);
    }

    #[test]
    fn short_expiry_is_missing() {
        assert_eq!(parse_gs1("(17)2512").expiry, None);
    }

    #[test]
    fn expiry_day_zero_is_month_end() {
        assert_eq!(parse_expiry("240200").unwrap(), date!(2024 - 02 - 29));
        assert_eq!(parse_expiry("251231").unwrap(), date!(2025 - 12 - 31));
        assert!(parse_expiry("251301").is_err());
        assert!(parse_expiry("25a231").is_err());
    }

    #[test]
    fn classification_boundaries() {
        let p = ShelfPolicy::default();
        let today = date!(2025 - 01 - 01);
        assert_eq!(classify(date!(2024 - 12 - 31), today, true, p), (Disposition::Expired, -1));
        assert_eq!(classify(today, today, false, p).0, Disposition::UnsealedDisposal);
        let edge = today + time::Duration::days(180);
        assert_eq!(classify(edge, today, true, p), (Disposition::ReadyForRecycle, 180));
        assert_eq!(classify(edge - time::Duration::days(1), today, true, p).0, Disposition::Available);
    }

    #[tokio::test]
    async fn service_reports_expired_without_lookup() {
        let svc = BarcodeService::new(None, "Paracetamol", ShelfPolicy::default());
        let req = ScanRequest { barcode: "(01)09501101530003(17)200101(10)B1".into(), is_sealed: true };
        let res = svc.scan_on(&req, date!(2025 - 01 - 01)).await.unwrap();
        assert_eq!(res.status, "expired");
        assert_eq!(res.expiry_date, "2020-01-01");
        assert_eq!(
            res.message.as_deref(),
            Some("Paracetamol (RxCUI: N/A) Batch B1: ❌ EXPIRED. Must be disposed.")
        );
    }

    #[tokio::test]
    async fn service_rejects_missing_expiry() {
        let svc = BarcodeService::new(None, "Paracetamol", ShelfPolicy::default());
        let req = ScanRequest { barcode: "(01)09501101530003".into(), is_sealed: false };
        let err = svc.scan_on(&req, date!(2025 - 01 - 01)).await.unwrap_err();
        assert_eq!(err.to_string(), "Barcode invalid or Expiry Date not found (AI 17).");
    }

    async fn message_for(barcode: &str, sealed: bool) -> String {
        let svc = BarcodeService::new(None, "Paracetamol", ShelfPolicy::default());
        let req = ScanRequest { barcode: barcode.into(), is_sealed: sealed };
        let res = svc.scan_on(&req, date!(2025 - 01 - 01)).await.unwrap();
        assert_eq!(res.status, "valid");
        res.message.unwrap_or_default()
    }

    #[tokio::test]
    async fn unsealed_pack_needs_disposal() {
        assert_eq!(
            message_for("(17)251231", false).await,
            "Paracetamol (RxCUI: N/A) Batch N/A: ⚠️ UNSEALED. Disposal required, ineligible for recycling."
        );
    }

    #[tokio::test]
    async fn sealed_pack_with_long_shelf_life_is_recyclable() {
        assert_eq!(
            message_for("(17)251231(10)L9", true).await,
            "Paracetamol (RxCUI: N/A) Batch L9: ✅ READY FOR RECYCLING! Expires 2025-12-31. Meets 6-month minimum."
        );
    }

    #[tokio::test]
    async fn sealed_pack_near_expiry_counts_days_left() {
        assert_eq!(
            message_for("(17)250301", true).await,
            "Paracetamol (RxCUI: N/A) Batch N/A: ⏳ VALID, but insufficient time for recycling (59 days left)."
        );
    }
}
