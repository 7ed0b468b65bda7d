//! Both storage traits behind one handle, for components that need the pair.

use spamdb_store::{
    AppendOutcome, DayLogHeader, DayLogSnapshot, DayLogStore, DaySlot, IncrementOutcome,
    NumberAggregate, NumberEntry, NumberStore, StoreError,
};
use spamdb_types::{Category, CountryCode, DayIndex, EpochDay, NumberKey, StoreAddress, Timestamp};

use crate::{LmdbDayLogStore, LmdbNumberStore};

pub struct LmdbStore {
    pub days: LmdbDayLogStore,
    pub numbers: LmdbNumberStore,
}

impl DayLogStore for LmdbStore {
    fn provision(
        &self,
        country: &CountryCode,
        day: DayIndex,
        capacity: u64,
    ) -> Result<DaySlot, StoreError> {
        self.days.provision(country, day, capacity)
    }

    fn day_slot(&self, country: &CountryCode, day: DayIndex) -> Result<DaySlot, StoreError> {
        self.days.day_slot(country, day)
    }

    fn append(
        &self,
        country: &CountryCode,
        day: DayIndex,
        owner_day: EpochDay,
        entry: &NumberEntry,
        now: Timestamp,
    ) -> Result<AppendOutcome, StoreError> {
        self.days.append(country, day, owner_day, entry, now)
    }

    fn read_day(
        &self,
        country: &CountryCode,
        day: DayIndex,
    ) -> Result<DayLogSnapshot, StoreError> {
        self.days.read_day(country, day)
    }

    fn header(&self, country: &CountryCode, day: DayIndex) -> Result<DayLogHeader, StoreError> {
        self.days.header(country, day)
    }
}

impl NumberStore for LmdbStore {
    fn ensure(&self, key: &NumberKey) -> Result<StoreAddress, StoreError> {
        self.numbers.ensure(key)
    }

    fn increment(
        &self,
        key: &NumberKey,
        category: Category,
        now: Timestamp,
    ) -> Result<IncrementOutcome, StoreError> {
        self.numbers.increment(key, category, now)
    }

    fn query(&self, key: &NumberKey) -> Result<NumberAggregate, StoreError> {
        self.numbers.query(key)
    }

    fn number_count(&self) -> Result<u64, StoreError> {
        self.numbers.number_count()
    }
}
