//! senvec core: configuration, error type, model catalogue.

pub mod config;
pub mod error;
pub mod model;

pub use config::{SenvecConfig, StoreBackend};
pub use error::{Error, Result};
pub use model::ModelKind;
