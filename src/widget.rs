//! Scanner widget contract: start a capture and receive decoded texts as messages.

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Which camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraConstraint {
    pub facing_mode: FacingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on decode events per second.
    pub fps: u32,
    /// Side of the square scan region, in pixels.
    pub qrbox: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { fps: 10, qrbox: 250 }
    }
}

impl ScanConfig {
    fn min_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }
}

/// A capture device that yields decoded barcode texts.
///
/// The receiver delivers one decode at a time; the channel closes when the
/// device stops.
pub trait BarcodeWidget {
    fn start(self, camera: CameraConstraint, config: ScanConfig) -> Result<mpsc::Receiver<String>>;
}

/// Keyboard-wedge scanners: one decoded code per input line.
pub struct LineReaderWidget<R> {
    reader: R,
}

impl<R> LineReaderWidget<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R> BarcodeWidget for LineReaderWidget<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn start(self, camera: CameraConstraint, config: ScanConfig) -> Result<mpsc::Receiver<String>> {
        debug!(?camera, fps = config.fps, qrbox = config.qrbox, "line reader widget started");
        let (tx, rx) = mpsc::channel(1);
        let interval = config.min_interval();
        let mut lines = self.reader.lines();

        tokio::spawn(async move {
            let mut last: Option<Instant> = None;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(l)) => l,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("scanner input error: {e}");
                        break;
                    }
                };
                let code = line.trim();
                if code.is_empty() {
                    continue;
                }
                if let Some(prev) = last {
                    time::sleep_until(prev + interval).await;
                }
                last = Some(Instant::now());
                if tx.send(code.to_string()).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_trimmed_non_blank_lines() {
        let input: &[u8] = b"  (17)251231 \n\n(01)123\n";
        let mut rx = LineReaderWidget::new(input)
            .start(CameraConstraint::default(), ScanConfig { fps: 1000, qrbox: 250 })
            .unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("(17)251231"));
        assert_eq!(rx.recv().await.as_deref(), Some("(01)123"));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn defaults_match_widget_contract() {
        let c = ScanConfig::default();
        assert_eq!((c.fps, c.qrbox), (10, 250));
        assert_eq!(CameraConstraint::default().facing_mode, FacingMode::Environment);
    }
}
