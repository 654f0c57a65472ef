//! Message model for coordinator traffic.
//!
//! A single envelope type carries every message exchanged through the
//! file queue: the one-time session initialization, candidate points
//! inbound from the tuning server, and result replies outbound.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One typed scalar of a candidate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointValue {
    Int(i64),
    Real(f64),
    Str(String),
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

/// One candidate configuration proposed by the optimizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointMessage {
    pub values: Vec<PointValue>,
}

impl PointMessage {
    pub fn new(values: Vec<PointValue>) -> Self {
        Self { values }
    }

    /// Renders the values space-separated, the form handed to
    /// generation scripts as a single argument.
    pub fn values_string(&self) -> String {
        self.values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Session configuration delivered by the tuning server at init time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionInit {
    /// Application name; generation scripts are named after it.
    pub app_name: String,
    /// Session configuration key/value pairs.
    pub cfg: HashMap<String, String>,
}

impl SessionInit {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            cfg: HashMap::new(),
        }
    }

    pub fn with_cfg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.cfg.insert(key.into(), value.into());
        self
    }
}

/// Request/reply marker on the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Request,
    Ok,
    Fail,
}

/// Message body: either session configuration or a candidate point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    Session(SessionInit),
    Point(PointMessage),
}

/// The envelope payload written to and read from queue files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub status: MessageStatus,
    pub body: MessageBody,
}

impl Message {
    pub fn request(body: MessageBody) -> Self {
        Self {
            status: MessageStatus::Request,
            body,
        }
    }

    pub fn reply_ok(body: MessageBody) -> Self {
        Self {
            status: MessageStatus::Ok,
            body,
        }
    }

    /// Returns the candidate point, if this message carries one.
    pub fn point(&self) -> Option<&PointMessage> {
        match &self.body {
            MessageBody::Point(p) => Some(p),
            MessageBody::Session(_) => None,
        }
    }

    /// Returns the session init payload, if this message carries one.
    pub fn session(&self) -> Option<&SessionInit> {
        match &self.body {
            MessageBody::Session(s) => Some(s),
            MessageBody::Point(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_string() {
        let point = PointMessage::new(vec![
            PointValue::Int(4),
            PointValue::Real(0.5),
            PointValue::Str("unroll".to_string()),
        ]);
        assert_eq!(point.values_string(), "4 0.5 unroll");
    }

    #[test]
    fn test_values_string_empty() {
        assert_eq!(PointMessage::default().values_string(), "");
    }

    #[test]
    fn test_body_accessors() {
        let point = Message::request(MessageBody::Point(PointMessage::new(vec![
            PointValue::Int(1),
        ])));
        assert!(point.point().is_some());
        assert!(point.session().is_none());

        let init = Message::request(MessageBody::Session(SessionInit::new("gemm")));
        assert!(init.session().is_some());
        assert!(init.point().is_none());
        assert_eq!(init.session().unwrap().app_name, "gemm");
    }

    #[test]
    fn test_session_init_cfg() {
        let init = SessionInit::new("gemm")
            .with_cfg("codegen_slave_path", "/scratch/codegen")
            .with_cfg("codegen_slave_list", "alpha 2");
        assert_eq!(
            init.cfg.get("codegen_slave_list").map(String::as_str),
            Some("alpha 2")
        );
    }
}
