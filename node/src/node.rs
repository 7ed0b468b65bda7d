//! The spamdb node: an LMDB-backed reputation ledger with metrics.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use spamdb_ledger::{LedgerError, ProvisionSummary, ReportReceipt, ReputationLedger};
use spamdb_store::{NumberAggregate, StoreError};
use spamdb_store_lmdb::{check_data_dir, check_integrity, IntegrityReport, LmdbEnvironment, LmdbStore};
use spamdb_types::{Clock, DayIndex, SystemClock};

use crate::{NodeConfig, NodeError, NodeMetrics};

/// A running reputation store.
///
/// Opening the node opens (or creates) the LMDB environment, verifies it,
/// and provisions the full day window for every configured country code.
pub struct SpamDbNode<C: Clock = SystemClock> {
    config: NodeConfig,
    env: LmdbEnvironment,
    ledger: ReputationLedger<LmdbStore, C>,
    metrics: Arc<NodeMetrics>,
}

impl SpamDbNode<SystemClock> {
    /// Open a node on wall-clock time.
    pub fn open(config: NodeConfig) -> Result<Self, NodeError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SpamDbNode<C> {
    /// Open a node whose notion of "today" comes from `clock`.
    pub fn with_clock(config: NodeConfig, clock: C) -> Result<Self, NodeError> {
        config.validate()?;
        check_data_dir(&config.data_dir).map_err(NodeError::Config)?;

        let env = LmdbEnvironment::open(&config.data_dir, config.max_dbs, config.map_size)?;
        let report = check_integrity(&env)?;
        if !report.is_healthy() {
            for error in &report.errors {
                tracing::error!(%error, "integrity check failed");
            }
            return Err(StoreError::Corruption(format!(
                "{} integrity errors in {}",
                report.errors.len(),
                config.data_dir.display()
            ))
            .into());
        }
        tracing::info!(
            slots = report.slots_checked,
            numbers = report.numbers_checked,
            "integrity check passed"
        );

        let ledger = ReputationLedger::new(env.store(), clock, config.ledger_config())?;
        let metrics = Arc::new(NodeMetrics::new());

        let node = Self {
            config,
            env,
            ledger,
            metrics,
        };
        for country in &node.config.country_codes {
            node.provision_window(country)?;
        }

        tracing::info!(
            data_dir = %node.config.data_dir.display(),
            countries = node.config.country_codes.len(),
            window_days = node.config.window_days,
            day_capacity = node.config.day_capacity,
            "spamdb node ready"
        );
        Ok(node)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ReputationLedger<LmdbStore, C> {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// Prometheus text output, or `None` when metrics are disabled.
    pub fn metrics_text(&self) -> Option<String> {
        self.config
            .enable_metrics
            .then(|| self.metrics.encode_text())
    }

    /// Re-run the startup integrity check.
    pub fn integrity_check(&self) -> Result<IntegrityReport, NodeError> {
        Ok(check_integrity(&self.env)?)
    }

    pub fn provision_day(&self, country: &str, day_index: u64) -> Result<(), NodeError> {
        self.ledger.provision_day(country, day_index)?;
        self.refresh_slot_gauge()
    }

    pub fn provision_window(&self, country: &str) -> Result<ProvisionSummary, NodeError> {
        let summary = self.ledger.provision_window(country)?;
        self.refresh_slot_gauge()?;
        Ok(summary)
    }

    pub fn report(
        &self,
        country: &str,
        number: &str,
        category: i8,
    ) -> Result<ReportReceipt, NodeError> {
        let started = Instant::now();
        let result = self.ledger.report(country, number, category);
        self.metrics
            .report_time_us
            .observe(started.elapsed().as_secs_f64() * 1_000_000.0);

        match result {
            Ok(receipt) => {
                self.metrics.reports_accepted.inc();
                if receipt.rotated {
                    self.metrics.day_rotations.inc();
                }
                Ok(receipt)
            }
            Err(e) => {
                self.metrics.reports_rejected.inc();
                if e.is_capacity_exceeded() {
                    self.metrics.reports_capacity_exceeded.inc();
                }
                Err(e.into())
            }
        }
    }

    pub fn query(&self, country: &str, number: &str) -> Result<NumberAggregate, NodeError> {
        self.metrics.queries.inc();
        Ok(self.ledger.query(country, number)?)
    }

    pub fn query_recent(
        &self,
        country: &str,
        number: &str,
    ) -> Result<Option<NumberAggregate>, NodeError> {
        self.metrics.queries.inc();
        Ok(self.ledger.query_recent(country, number)?)
    }

    pub fn download(
        &self,
        country: &str,
        day_indices: &[u64],
    ) -> Result<BTreeSet<String>, NodeError> {
        self.record_download(self.ledger.download(country, day_indices))
    }

    pub fn download_recent(
        &self,
        country: &str,
        days_back: u64,
    ) -> Result<BTreeSet<String>, NodeError> {
        self.record_download(self.ledger.download_recent(country, days_back))
    }

    pub fn day_index_for_offset(&self, offset: i64) -> DayIndex {
        self.ledger.day_index_for_offset(offset)
    }

    /// Slots are never unbound, so allocated logs equals bound slots.
    fn refresh_slot_gauge(&self) -> Result<(), NodeError> {
        let bound = self.env.meta_store().allocated_logs()?;
        self.metrics.provisioned_slots.set(bound as i64);
        Ok(())
    }

    fn record_download(
        &self,
        result: Result<BTreeSet<String>, LedgerError>,
    ) -> Result<BTreeSet<String>, NodeError> {
        let numbers = result?;
        self.metrics.downloads.inc();
        self.metrics.downloaded_numbers.inc_by(numbers.len() as u64);
        Ok(numbers)
    }
}
