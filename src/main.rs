use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use scancheck::client::ApiClient;
use scancheck::config::{self, Config, RxNormConfig, ShelfPolicy, VirusTotalConfig};
use scancheck::types::UrlCheckResult;
use scancheck::ui::{self, UrlCheckView};
use scancheck::widget::{BarcodeWidget, CameraConstraint, LineReaderWidget, ScanConfig};
use scancheck::{render, server};

/// scancheck: medicine pack validity and URL threat checks with a tiny embedded web UI.
#[derive(Debug, Parser)]
#[command(
    name = "scancheck",
    version,
    about = "Medicine pack validity and URL threat checks with a tiny embedded web UI.",
    long_about = None
)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service and web UI.
    Serve(ServeArgs),
    /// Check one URL against a running service.
    Check {
        /// URL to check.
        url: String,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// Write the result as pretty JSON to this path (optional).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Read decoded barcodes from stdin (one per line) and validate each.
    Scan {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// Packs are still sealed.
        #[arg(long, default_value_t = false)]
        sealed: bool,
        /// Maximum decodes per second.
        #[arg(long, default_value_t = 10)]
        fps: u32,
    },
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long, default_value = config::DEFAULT_BIND)]
    bind: String,

    /// Directory with static UI assets.
    #[arg(long = "ui-dir", default_value = "ui")]
    ui_dir: PathBuf,

    #[arg(long = "vt-api-key", env = "VT_API_KEY", hide_env_values = true)]
    vt_api_key: Option<String>,

    #[arg(long = "vt-base-url", default_value = config::VIRUSTOTAL_BASE_URL)]
    vt_base_url: String,

    /// Wait between URL submission and analysis fetch, in milliseconds.
    #[arg(long = "analysis-delay-ms", default_value_t = 3000)]
    analysis_delay_ms: u64,

    /// Upstream request timeout in seconds.
    #[arg(long = "timeout-secs", default_value_t = 10)]
    timeout_secs: u64,

    #[arg(long = "rxnorm-url", default_value = config::RXNORM_BASE_URL)]
    rxnorm_url: String,

    /// Skip RxNorm name standardisation.
    #[arg(long = "no-rxnorm", default_value_t = false)]
    no_rxnorm: bool,

    /// Product name reported for scanned packs.
    #[arg(long = "product-name", default_value = "Paracetamol")]
    product_name: String,

    #[arg(long = "min-shelf-life-days", default_value_t = 180)]
    min_shelf_life_days: i64,
}

impl ServeArgs {
    fn into_config(self) -> Config {
        let timeout = Duration::from_secs(self.timeout_secs);
        Config {
            bind: self.bind,
            ui_dir: self.ui_dir,
            virustotal: VirusTotalConfig {
                api_key: self.vt_api_key,
                base_url: self.vt_base_url,
                analysis_delay: Duration::from_millis(self.analysis_delay_ms),
                timeout,
            },
            rxnorm: RxNormConfig {
                enabled: !self.no_rxnorm,
                base_url: self.rxnorm_url,
                product_name: self.product_name,
                timeout,
            },
            shelf: ShelfPolicy { min_shelf_life_days: self.min_shelf_life_days },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "scancheck=debug,tower_http=debug" } else { "scancheck=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match cli.command {
        Command::Serve(args) => serve(args.into_config()).await,
        Command::Check { url, server, output } => check(&url, &server, output).await,
        Command::Scan { server, sealed, fps } => scan(&server, sealed, fps).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    println!("scancheck configuration:");
    println!("  bind         : {}", cfg.bind);
    println!("  ui_dir       : {}", cfg.ui_dir.display());
    println!("  virustotal   : {}", cfg.virustotal.base_url);
    println!("  api_key      : {}", if cfg.virustotal.api_key.is_some() { "<set>" } else { "<none>" });
    println!(
        "  rxnorm       : {}",
        if cfg.rxnorm.enabled { cfg.rxnorm.base_url.as_str() } else { "<disabled>" }
    );
    println!("  min_shelf    : {} days", cfg.shelf.min_shelf_life_days);

    let shutdown = CancellationToken::new();
    let on_ctrlc = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        on_ctrlc.cancel();
    });
    println!("Press Ctrl+C to stop the server...");
    server::spawn_server(cfg, shutdown).await
}

async fn check(url: &str, server: &str, output: Option<PathBuf>) -> Result<()> {
    let client = ApiClient::new(server, Duration::from_secs(60))?;
    let mut view = UrlCheckView::with_input(url);
    ui::check_url(&mut view, &client).await;

    if let Some(err) = &view.error {
        bail!("{}", render::error_text(err));
    }
    let Some(result) = &view.result else {
        bail!("no result returned");
    };
    print_result_table(result);
    if let Some(path) = output.as_deref() {
        write_result_json(path, result)
            .with_context(|| format!("failed to write JSON to {}", path.display()))?;
        println!("Wrote JSON result to {}", path.display());
    }
    Ok(())
}

async fn scan(server: &str, sealed: bool, fps: u32) -> Result<()> {
    let client = ApiClient::new(server, Duration::from_secs(30))?;
    let stdin = BufReader::new(tokio::io::stdin());
    let decodes = LineReaderWidget::new(stdin)
        .start(CameraConstraint::default(), ScanConfig { fps, ..ScanConfig::default() })?;
    println!("Waiting for barcodes on stdin (Ctrl+D to finish)...");
    ui::run_scan_flow(decodes, &client, sealed, |view| {
        println!("{}", render::scan_view_text(view));
    })
    .await;
    Ok(())
}

fn print_result_table(r: &UrlCheckResult) {
    let p = r.safety_level.presentation();
    println!("\n{} {}", p.icon, p.title);
    println!("  url        : {}", r.url);
    println!("  malicious  : {}", r.malicious);
    println!("  suspicious : {}", r.suspicious);
    println!("  harmless   : {}", r.harmless);
    println!("  undetected : {}", r.undetected);

    let vendor_w = r.details.keys().map(|k| k.len()).max().unwrap_or(0).max("vendor".len());
    let cat_w = "category".len().max(16);
    println!("\nSecurity Vendor Analysis ({} vendors)", r.total);
    println!("{:<vendor_w$}  {:<cat_w$}", "vendor", "category", vendor_w = vendor_w, cat_w = cat_w);
    println!("{:-<vendor_w$}  {:-<cat_w$}", "", "", vendor_w = vendor_w, cat_w = cat_w);
    for (vendor, verdict) in &r.details {
        println!(
            "{:<vendor_w$}  {:<cat_w$}",
            vendor,
            verdict.category,
            vendor_w = vendor_w,
            cat_w = cat_w
        );
    }
}

fn write_result_json(path: &std::path::Path, result: &UrlCheckResult) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, result)?;
    Ok(())
}
