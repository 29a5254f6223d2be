// src/lib.rs

pub mod config;
pub mod error;
pub mod intent;
pub mod protocol;
pub mod server;
pub mod services;
pub mod session;
pub mod utils;

pub use config::BridgeConfig;
pub use error::{BackendError, ConfigError, ProtocolError};
pub use intent::{DeviceCommand, Intent, classify};
pub use server::Dispatcher;
pub use session::Session;
