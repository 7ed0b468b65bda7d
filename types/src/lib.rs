//! Fundamental types for the spamdb number reputation store.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! number keys, report categories, day-window arithmetic, timestamps, storage
//! addresses, store parameters, and key validation errors.

pub mod address;
pub mod category;
pub mod day;
pub mod error;
pub mod number;
pub mod params;
pub mod time;

pub use address::StoreAddress;
pub use category::Category;
pub use day::{DayIndex, DayWindow, EpochDay};
pub use error::KeyError;
pub use number::{CountryCode, NumberKey, PhoneNumber};
pub use params::StoreParams;
pub use time::{Clock, SystemClock, Timestamp};
