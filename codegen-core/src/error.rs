// codegen-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {

    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
    },

    #[error("Invalid endpoint '{url}': {message}")]
    InvalidEndpoint {
        url: String,
        message: String,
    },

    #[error("Invalid worker spec '{spec}': {message}")]
    InvalidWorkerSpec {
        spec: String,
        message: String,
    },

    #[error("Missing session config key '{key}'")]
    MissingConfigKey {
        key: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error at '{path}': {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Worker '{slot}' failed: {message}")]
    Worker {
        slot: String,
        message: String,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

// Convenience constructors
impl CoordinatorError {

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn invalid_endpoint(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn invalid_worker_spec(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidWorkerSpec {
            spec: spec.into(),
            message: message.into(),
        }
    }

    pub fn missing_config_key(key: impl Into<String>) -> Self {
        Self::MissingConfigKey { key: key.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn io_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn worker(slot: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Worker {
            slot: slot.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
