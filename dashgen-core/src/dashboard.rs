//! Scan, render, apply and publish behind one handle

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::config::DashConfig;
use crate::metadata::{BatchDriver, BatchReport, MetadataReader, Record, UpdateRequest};
use crate::publish::{PublishOutcome, publish_if_enabled};
use crate::render::{HtmlRenderer, OutputGenerator, RenderFormat};

/// Result of an apply run
#[derive(Debug)]
pub struct ApplyResult {
    pub report: BatchReport,
    pub outputs: Vec<PathBuf>,
    pub publish: PublishOutcome,
}

/// Main dashboard interface
pub struct Dashboard {
    config: DashConfig,
    base_dir: PathBuf,
    reader: MetadataReader,
    driver: BatchDriver,
    output: OutputGenerator,
    /// Held while outputs are regenerated and published
    outputs: Mutex<()>,
}

impl Dashboard {
    /// Dashboard working from the current directory
    pub fn new(config: DashConfig) -> Result<Self> {
        Self::with_base_dir(config, PathBuf::from("."))
    }

    /// Dashboard whose update paths and repository live under `base_dir`
    pub fn with_base_dir(config: DashConfig, base_dir: impl Into<PathBuf>) -> Result<Self> {
        config.validate().context("Invalid dashboard configuration")?;
        let base_dir = base_dir.into();

        Ok(Self {
            reader: MetadataReader::new(config.clone()),
            driver: BatchDriver::with_base_dir(config.clone(), base_dir.clone()),
            output: OutputGenerator::new(config.clone()),
            outputs: Mutex::new(()),
            config,
            base_dir,
        })
    }

    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    pub fn scan(&self) -> Vec<Record> {
        self.reader.scan()
    }

    /// Scan and write the requested outputs
    pub fn render(&self, formats: &[RenderFormat]) -> Result<Vec<PathBuf>> {
        let _guard = self.lock_outputs();
        self.output.generate(&self.scan(), formats)
    }

    fn lock_outputs(&self) -> MutexGuard<'_, ()> {
        self.outputs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Scan and render the dashboard page without writing it
    pub fn render_html(&self) -> String {
        HtmlRenderer::new(&self.config).render(&self.scan())
    }

    pub fn apply(&self, requests: &[UpdateRequest]) -> BatchReport {
        self.driver.apply_batch(requests)
    }

    pub fn driver(&self) -> &BatchDriver {
        &self.driver
    }

    /// Apply `requests`, regenerate `formats` and publish when enabled.
    /// Outputs are regenerated even when some entries were skipped.
    pub fn apply_and_publish(
        &self,
        requests: &[UpdateRequest],
        formats: &[RenderFormat],
        publish: bool,
    ) -> Result<ApplyResult> {
        let report = self.apply(requests);
        self.finish(report, formats, publish)
    }

    /// Regenerate outputs and publish after a batch has been applied. The scan,
    /// the output writes and the commit run under one lock, so concurrent
    /// batches finish one after another and the last one sees every edit.
    pub fn finish(&self, report: BatchReport, formats: &[RenderFormat], publish: bool) -> Result<ApplyResult> {
        let _guard = self.lock_outputs();
        let outputs =
            if formats.is_empty() { Vec::new() } else { self.output.generate(&self.scan(), formats)? };

        let publish = if publish {
            publish_if_enabled(&self.base_dir, &self.config.publish)
        } else {
            PublishOutcome::Skipped("not requested".to_string())
        };

        info!("Apply finished: {}; publish: {:?}", report.summary(), publish);
        Ok(ApplyResult { report, outputs, publish })
    }
}
