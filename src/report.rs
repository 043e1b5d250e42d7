//! Periodic JSON reports of registry contents.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::config::ReporterConfig;
use crate::error::Result;
use crate::meter::{Clock, MeterSnapshot};
use crate::registry::MeterRegistry;

/// One rendered report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// RFC 3339 UTC time the report was taken
    pub timestamp: String,
    /// Snapshots keyed by meter name
    pub meters: BTreeMap<String, MeterSnapshot>,
}

/// Renders registry snapshots on a fixed interval.
pub struct Reporter<C: Clock + Clone> {
    registry: Arc<MeterRegistry<C>>,
    config: ReporterConfig,
}

impl<C: Clock + Clone> Reporter<C> {
    /// Create a reporter for `registry`.
    pub fn new(registry: Arc<MeterRegistry<C>>, config: ReporterConfig) -> Self {
        Self { registry, config }
    }

    /// Capture the current state of every meter.
    pub fn collect(&self) -> Report {
        Report {
            timestamp: chrono::Utc::now().to_rfc3339(),
            meters: self.registry.snapshot(),
        }
    }

    /// Render one report as JSON.
    pub fn render(&self) -> Result<String> {
        let report = self.collect();
        let rendered = if self.config.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(rendered)
    }

    /// Write one report followed by a newline.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, out: &mut W) -> Result<()> {
        let mut rendered = self.render()?;
        rendered.push('\n');
        out.write_all(rendered.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }

    /// Report to stdout every interval until `shutdown` resolves, then once more.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; skip it so reports start one period in.
        ticker.tick().await;

        info!(interval_secs = period.as_secs(), "Reporter started");

        let mut stdout = tokio::io::stdout();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!(meters = self.registry.len(), "Writing report");
                    self.write_to(&mut stdout).await?;
                }
                _ = &mut shutdown => {
                    break;
                }
            }
        }

        self.write_to(&mut stdout).await?;
        info!("Reporter stopped");
        Ok(())
    }
}
