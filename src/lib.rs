//! Loader and derivation layer of the TrendSense dashboard.
//!
//! A [`registry::Registry`] reads the generated CSV exports into one immutable
//! [`registry::Snapshot`]; the functions in [`data::derive`] and
//! [`dashboard`] turn a snapshot into chart and table inputs.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod registry;

pub use catalog::Catalog;
pub use config::Config;
pub use error::{DeriveError, LoadError, LoadErrorKind, NotLoaded};
pub use registry::{Registry, Snapshot};
