//! ntpman library: NTP header codec, query engine and poll loop.

pub mod adapters;
pub mod config;
pub mod domain;
mod error;
pub mod fmt;
pub mod ntp;
pub mod services;
pub mod stats;
pub mod tui;

pub use adapters::ntp_client::QueryEngine;
pub use config::{LoadPolicy, ProbeConfig};
pub use domain::ntp::{PollReport, QueryResult, Target};
pub use error::NtpmanError;
pub use ntp::{NtpHeader, from_ntp_timestamp, to_ntp_timestamp};
pub use services::poll::{PollLoop, PollSettings, Reporter};
pub use services::query::query_one;
pub use services::targets::load_targets;
