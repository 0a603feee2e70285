//! Core domain types for whitelist root synchronization.
//!
//! Provides the canonical `Address` type, the ordered and persisted
//! `AddressSet`, the storage abstraction behind it, and the clock used to
//! make time-dependent behavior testable. Every other rootsync crate builds
//! on these primitives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod error;
pub mod models;
pub mod set;
pub mod storage;
pub mod time;

pub use address::Address;
pub use error::{CoreError, Result};
pub use models::{PublicationRecord, Root, EMPTY_ROOT};
pub use set::AddressSet;
pub use storage::{AddressStore, FileAddressStore};
pub use time::{Clock, RealClock, TestClock};
