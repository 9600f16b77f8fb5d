mod application;
pub mod data;
mod runtime_config;
mod scheduler;

pub use application::{Application, ApplicationError};
pub use runtime_config::RuntimeConfig;
