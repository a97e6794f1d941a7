pub mod error;
pub mod config;
pub mod validation;
pub mod contracts;
pub mod jwt;
pub mod shell;
pub mod output;
pub mod types;
pub mod actions;

pub use actions::PortfolioActions;
pub use config::RebalancerConfig;
pub use error::RebalancerError;
pub use shell::{CommandFailure, CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use types::*;
