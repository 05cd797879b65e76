//! Pure mapping from view state to HTML markup, via autoescaped Tera templates.

use std::sync::OnceLock;

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::RenderError;
use crate::types::{SafetyLevel, ScanResult, UrlCheckResult, VerdictCategory};
use crate::ui::{ScanView, UrlCheckView};
use crate::virustotal::report_id;

/// Fixed presentation of a safety level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub class: &'static str,
    pub icon: &'static str,
    pub title: &'static str,
    pub color: &'static str,
}

impl SafetyLevel {
    pub fn presentation(self) -> Presentation {
        match self {
            SafetyLevel::Dangerous => Presentation {
                class: "dangerous",
                icon: "⚠️",
                title: "DANGEROUS - Do Not Visit",
                color: "#c62828",
            },
            SafetyLevel::Suspicious => Presentation {
                class: "suspicious",
                icon: "⚡",
                title: "SUSPICIOUS - Proceed with Caution",
                color: "#e65100",
            },
            SafetyLevel::Safe => Presentation {
                class: "safe",
                icon: "✅",
                title: "SAFE - No Threats Detected",
                color: "#2e7d32",
            },
        }
    }
}

const STATS: [(&str, &str); 4] = [
    ("Malicious", "#f44336"),
    ("Suspicious", "#ff9800"),
    ("Harmless", "#4caf50"),
    ("Undetected", "#9e9e9e"),
];

const BASE: &str = r#"<!doctype html><html lang="en"><head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>{{ title }}</title><link rel="stylesheet" href="/style.css"></head><body><main class="container">{% block body %}{% endblock body %}</main></body></html>"#;

const URL_RESULT: &str = r#"<div class="result-card {{ result.look.class }}"><div class="result-header"><div class="result-icon">{{ result.look.icon }}</div><div><div class="result-title" style="color: {{ result.look.color }}">{{ result.look.title }}</div><div class="result-url">{{ result.url }}</div></div></div><div class="stats-grid">{% for s in result.stats %}<div class="stat-box"><div class="stat-number" style="color: {{ s.color }};">{{ s.count }}</div><div class="stat-label">{{ s.label }}</div></div>{% endfor %}</div></div><div class="card"><h3>Security Vendor Analysis ({{ result.total }} vendors)</h3><div class="vendors-list">{% for v in result.vendors %}<div class="vendor-item"><span class="vendor-name">{{ v.name }}</span><span class="badge {{ v.badge }}">{{ v.category }}</span></div>{% endfor %}</div><div class="actions"><a class="btn-secondary" href="/">Check Another URL</a><a class="btn" href="https://www.virustotal.com/gui/url/{{ result.report_id }}/detection" target="_blank" rel="noopener noreferrer">📊 View Full Report</a></div></div>"#;

const CHECK_PAGE: &str = r#"{% extends "base.html" %}{% block body %}<h1>URL Safety Check</h1><nav><a href="/scan">Scan a pack</a></nav><form class="card" method="post" action="/check"><input id="urlInput" name="url" type="text" placeholder="https://example.com" value="{{ input }}" autofocus><button id="checkBtn" type="submit"{% if loading %} disabled{% endif %}><span id="btnText">{% if loading %}<div class="spinner"></div> {% endif %}{{ button_label }}</span></button></form><div id="errorBox" class="error{% if not error %} hidden{% endif %}">{% if error %}{{ error }}{% endif %}</div><div id="resultSection" class="result{% if not result %} hidden{% endif %}">{% if result %}{% include "url_result.html" %}{% endif %}</div><div id="infoBox" class="card info{% if not info_visible %} hidden{% endif %}"><h3>How it works</h3><p>The URL is submitted to VirusTotal and checked by dozens of security vendors. Results usually take a few seconds.</p></div>{% endblock body %}"#;

const SCAN_RESULT: &str = r#"<b style="color:{{ scan.color }}">{{ scan.name }}</b><br>Expiry Date: {{ scan.expiry_date }}<br>Status: {{ scan.status }}{% if scan.message %}<br>{{ scan.message }}{% endif %}"#;

const SCAN_PANEL: &str = r#"{% if state == "scanning" %}Scanning...{% elif state == "error" %}{{ error }}{% elif state == "result" %}{% include "scan_result.html" %}{% endif %}"#;

const SCAN_PAGE: &str = r#"{% extends "base.html" %}{% block body %}<h1>Medicine Pack Scan</h1><nav><a href="/">Check a URL</a></nav><form class="card" method="post" action="/scan"><input id="barcodeInput" name="barcode" type="text" placeholder="(01)...(17)YYMMDD(10)..." autofocus><label><input type="checkbox" name="is_sealed" value="true"> Sealed</label><button type="submit">Submit</button></form><div id="result" class="card">{% include "scan_panel.html" %}</div>{% endblock body %}"#;

static ENGINE: OnceLock<Tera> = OnceLock::new();

/// Templates are compiled once; names end in `.html` so autoescape applies.
fn engine() -> Result<&'static Tera, RenderError> {
    if let Some(tera) = ENGINE.get() {
        return Ok(tera);
    }
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", BASE),
        ("url_result.html", URL_RESULT),
        ("check.html", CHECK_PAGE),
        ("scan_result.html", SCAN_RESULT),
        ("scan_panel.html", SCAN_PANEL),
        ("scan.html", SCAN_PAGE),
    ])?;
    Ok(ENGINE.get_or_init(|| tera))
}

fn render(name: &str, context: &Context) -> Result<String, RenderError> {
    Ok(engine()?.render(name, context)?)
}

#[derive(Serialize)]
struct StatBlock {
    label: &'static str,
    color: &'static str,
    count: u64,
}

#[derive(Serialize)]
struct VendorRow<'a> {
    name: &'a str,
    category: &'a str,
    badge: &'static str,
}

#[derive(Serialize)]
struct ResultModel<'a> {
    look: Presentation,
    url: &'a str,
    stats: Vec<StatBlock>,
    total: u64,
    vendors: Vec<VendorRow<'a>>,
    report_id: String,
}

impl<'a> ResultModel<'a> {
    fn new(r: &'a UrlCheckResult) -> Self {
        let counts = [r.malicious, r.suspicious, r.harmless, r.undetected];
        Self {
            look: r.safety_level.presentation(),
            url: &r.url,
            stats: STATS
                .iter()
                .zip(counts)
                .map(|(&(label, color), count)| StatBlock { label, color, count })
                .collect(),
            total: r.total,
            vendors: r
                .details
                .iter()
                .map(|(name, v)| VendorRow {
                    name,
                    category: &v.category,
                    badge: VerdictCategory::parse(&v.category).css_class(),
                })
                .collect(),
            report_id: report_id(&r.url),
        }
    }
}

#[derive(Serialize)]
struct ScanModel<'a> {
    color: &'static str,
    name: &'a str,
    expiry_date: &'a str,
    status: String,
    message: Option<&'a str>,
}

impl<'a> ScanModel<'a> {
    fn new(r: &'a ScanResult) -> Self {
        Self {
            color: if r.is_valid() { "green" } else { "red" },
            name: &r.name,
            expiry_date: &r.expiry_date,
            status: r.status.to_uppercase(),
            message: r.message.as_deref(),
        }
    }
}

/// Text shown in the error box.
pub fn error_text(message: &str) -> String {
    format!("❌ {message}")
}

/// Result card plus vendor list for one check.
pub fn render_url_result(r: &UrlCheckResult) -> Result<String, RenderError> {
    let mut ctx = Context::new();
    ctx.insert("result", &ResultModel::new(r));
    render("url_result.html", &ctx)
}

/// Validity line for one scanned pack, green when valid.
pub fn render_scan_result(r: &ScanResult) -> Result<String, RenderError> {
    let mut ctx = Context::new();
    ctx.insert("scan", &ScanModel::new(r));
    render("scan_result.html", &ctx)
}

/// Full URL-check page for the given state.
pub fn render_check_page(view: &UrlCheckView) -> Result<String, RenderError> {
    let mut ctx = Context::new();
    ctx.insert("title", "URL Safety Check");
    ctx.insert("input", &view.input);
    ctx.insert("loading", &view.loading);
    ctx.insert("button_label", view.button_label());
    ctx.insert("error", &view.error.as_deref().map(error_text));
    ctx.insert("result", &view.result.as_ref().map(ResultModel::new));
    ctx.insert("info_visible", &view.info_visible);
    render("check.html", &ctx)
}

fn scan_context(view: &ScanView) -> Context {
    let mut ctx = Context::new();
    let (state, error, scan) = match view {
        ScanView::Idle => ("idle", None, None),
        ScanView::Scanning => ("scanning", None, None),
        ScanView::Error(e) => ("error", Some(e.as_str()), None),
        ScanView::Result(r) => ("result", None, Some(ScanModel::new(r))),
    };
    ctx.insert("state", state);
    ctx.insert("error", &error);
    ctx.insert("scan", &scan);
    ctx
}

/// Scan panel content for the given state.
pub fn render_scan_view(view: &ScanView) -> Result<String, RenderError> {
    render("scan_panel.html", &scan_context(view))
}

/// Full scan page; the form accepts codes typed by keyboard-wedge scanners.
pub fn render_scan_page(view: &ScanView) -> Result<String, RenderError> {
    let mut ctx = scan_context(view);
    ctx.insert("title", "Medicine Pack Scan");
    render("scan.html", &ctx)
}

/// Plain-text form of the scan panel, for terminals.
pub fn scan_view_text(view: &ScanView) -> String {
    match view {
        ScanView::Idle => String::new(),
        ScanView::Scanning => "Scanning...".to_string(),
        ScanView::Error(e) => e.clone(),
        ScanView::Result(r) => {
            let mut s = format!("{} | Expiry Date: {} | Status: {}", r.name, r.expiry_date, r.status.to_uppercase());
            if let Some(msg) = &r.message {
                s.push_str("\n  ");
                s.push_str(msg);
            }
            s
        }
    }
}
