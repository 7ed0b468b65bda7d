//! `ReputationLedger`, the report protocol over any day-log + number store.

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use spamdb_store::{
    AppendOutcome, DayLogStore, NumberAggregate, NumberEntry, NumberStore, StoreError,
};
use spamdb_types::{
    Category, Clock, CountryCode, DayIndex, DayWindow, EpochDay, NumberKey, StoreParams,
    Timestamp,
};

use crate::LedgerError;

/// Ledger behaviour on top of the store geometry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub params: StoreParams,
    /// Log a number at most once per day. Its aggregate still counts every
    /// report.
    pub skip_repeat_same_day: bool,
}

/// What a successful report did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportReceipt {
    pub key: NumberKey,
    pub category: Category,
    pub day: EpochDay,
    pub slot: DayIndex,
    /// Entry written in today's log, `None` if the append was suppressed.
    pub entry_index: Option<u64>,
    /// The append reset a log left over from an earlier cycle.
    pub rotated: bool,
    pub aggregate: NumberAggregate,
}

/// Outcome of provisioning a whole window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub provisioned: u64,
    pub already_provisioned: u64,
}

pub struct ReputationLedger<S, C> {
    store: S,
    clock: C,
    config: LedgerConfig,
    window: DayWindow,
}

impl<S, C> ReputationLedger<S, C>
where
    S: DayLogStore + NumberStore,
    C: Clock,
{
    /// Fails if the configured window has zero days or a zero-length day.
    pub fn new(store: S, clock: C, config: LedgerConfig) -> Result<Self, LedgerError> {
        let window = config.params.window()?;
        Ok(Self {
            store,
            clock,
            config,
            window,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    pub fn today(&self) -> EpochDay {
        self.window.epoch_day(self.clock.now())
    }

    /// Slot `offset` days from today; negative offsets look back.
    pub fn day_index_for_offset(&self, offset: i64) -> DayIndex {
        self.window.slot_at_offset(self.today(), offset)
    }

    /// Bind a fresh log to one slot of `country`.
    pub fn provision_day(&self, country: &str, day_index: u64) -> Result<(), LedgerError> {
        let country = CountryCode::new(country)?;
        let day = self.window.index(day_index)?;
        self.store
            .provision(&country, day, self.config.params.day_capacity)?;
        tracing::debug!(%country, slot = day.get(), "provisioned day slot");
        Ok(())
    }

    /// Report a number under `category` (wire code) on today's date.
    ///
    /// By default the log append runs first, so a full log rejects the
    /// report before the aggregate is touched. With `skip_repeat_same_day`
    /// the increment runs first: it reads the previous `last_reported` in the
    /// same atomic step, and only the first report of the day is appended.
    pub fn report(
        &self,
        country: &str,
        number: &str,
        category: i8,
    ) -> Result<ReportReceipt, LedgerError> {
        let key = NumberKey::parse(country, number)?;
        let category = Category::from_code(category);
        let now = self.clock.now();
        let day = self.window.epoch_day(now);
        let slot = self.window.slot_of(day);

        let (appended, aggregate) = if self.config.skip_repeat_same_day {
            let outcome = self.store.increment(&key, category, now)?;
            let appended = if outcome.is_first_since(self.window.start_of_day(day)) {
                Some(self.append_entry(&key, slot, day, now)?)
            } else {
                None
            };
            (appended, outcome.aggregate)
        } else {
            let appended = self.append_entry(&key, slot, day, now)?;
            let outcome = self.store.increment(&key, category, now)?;
            (Some(appended), outcome.aggregate)
        };
        let entry_index = appended.map(|a| a.index);
        let rotated = appended.is_some_and(|a| a.rotated);

        tracing::debug!(
            %key,
            %category,
            slot = slot.get(),
            entry = ?entry_index,
            rotated,
            "report recorded"
        );

        Ok(ReportReceipt {
            key,
            category,
            day,
            slot,
            entry_index,
            rotated,
            aggregate,
        })
    }

    /// Cumulative counters for a number. `NotFound` if never reported.
    pub fn query(&self, country: &str, number: &str) -> Result<NumberAggregate, LedgerError> {
        let key = NumberKey::parse(country, number)?;
        Ok(self.store.query(&key)?)
    }

    /// Counters for a number reported within the window, else `None`.
    pub fn query_recent(
        &self,
        country: &str,
        number: &str,
    ) -> Result<Option<NumberAggregate>, LedgerError> {
        match self.query(country, number) {
            Ok(aggregate) => {
                let fresh = aggregate.reported_within(self.window.span_secs(), self.clock.now());
                Ok(fresh.then_some(aggregate))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Distinct numbers logged in the given slots.
    ///
    /// Each slot is read as the most recent day, up to today, that maps to
    /// it; a log still holding an older cycle contributes nothing.
    pub fn download(
        &self,
        country: &str,
        day_indices: &[u64],
    ) -> Result<BTreeSet<String>, LedgerError> {
        let country = CountryCode::new(country)?;
        let today = self.today();
        let requests = day_indices
            .iter()
            .map(|&i| {
                let slot = self.window.index(i)?;
                Ok((slot, self.window.latest_day_for_slot(slot, today)))
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;
        let numbers = self.store.read_window(&country, &requests)?;
        tracing::debug!(%country, slots = requests.len(), numbers = numbers.len(), "download");
        Ok(numbers)
    }

    /// Download today and the `days_back` days before it.
    pub fn download_recent(
        &self,
        country: &str,
        days_back: u64,
    ) -> Result<BTreeSet<String>, LedgerError> {
        let days_back = days_back.min(self.window.window_days - 1) as i64;
        let indices: Vec<u64> = (-days_back..=0)
            .map(|offset| self.day_index_for_offset(offset).get())
            .collect();
        self.download(country, &indices)
    }

    fn append_entry(
        &self,
        key: &NumberKey,
        slot: DayIndex,
        day: EpochDay,
        now: Timestamp,
    ) -> Result<AppendOutcome, LedgerError> {
        let entry = NumberEntry::from_number(&key.number);
        self.store
            .append(&key.country, slot, day, &entry, now)
            .map_err(|e| {
                if let StoreError::CapacityExceeded { capacity, .. } = &e {
                    tracing::warn!(
                        country = %key.country,
                        slot = slot.get(),
                        capacity,
                        "daily log full, report rejected"
                    );
                }
                e.into()
            })
    }
}

impl<S, C> ReputationLedger<S, C>
where
    S: DayLogStore + NumberStore + Sync,
    C: Clock,
{
    /// Provision every slot of the window for `country`, in parallel.
    ///
    /// Slots that are already bound are counted, not treated as failures.
    pub fn provision_window(&self, country: &str) -> Result<ProvisionSummary, LedgerError> {
        let country = CountryCode::new(country)?;
        let capacity = self.config.params.day_capacity;
        let slots: Vec<DayIndex> = self.window.slots().collect();

        let fresh = slots
            .par_iter()
            .map(|&day| match self.store.provision(&country, day, capacity) {
                Ok(_) => Ok(true),
                Err(StoreError::AlreadyProvisioned { .. }) => Ok(false),
                Err(e) => Err(e),
            })
            .collect::<Result<Vec<bool>, StoreError>>()?;

        let provisioned = fresh.iter().filter(|f| **f).count() as u64;
        let summary = ProvisionSummary {
            provisioned,
            already_provisioned: slots.len() as u64 - provisioned,
        };
        tracing::info!(
            %country,
            provisioned = summary.provisioned,
            already = summary.already_provisioned,
            capacity,
            "provisioned day window"
        );
        Ok(summary)
    }
}
