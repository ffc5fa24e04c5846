pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{AccessRule, InMemoryStore, RuleTableReviewer};
pub use config::BrokerConfig;
pub use core::broker::Broker;
pub use domain::model::{BindOutcome, BindRequest, BindResponse, BindStatus, ProtocolResponse};
pub use utils::error::{BrokerError, Result};
