mod config;

pub use config::{ConfigError, MirrorConfig};
