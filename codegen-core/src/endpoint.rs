// codegen-core/src/endpoint.rs

//! Scheme-tagged endpoint descriptors.
//!
//! Endpoints name the three locations a session cares about: the
//! coordinator's own inbox/outbox directory, the artifact target, and
//! the optional reply destination. Two schemes are recognized:
//!
//! - `dir://<path>`: a local directory, no host.
//! - `ssh://[user@]host[:port]/path`: a remote host and path.
//!
//! `tcp://` is reserved for a future socket transport and rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    Dir,
    Ssh,
}

/// A parsed endpoint, immutable for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub user: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: PathBuf,
}

impl Endpoint {
    /// Parses an endpoint URI string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` for unknown or reserved schemes, a
    /// missing path separator, an empty host, or an unparsable port.
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(path) = url.strip_prefix("dir://") {
            if path.is_empty() {
                return Err(CoordinatorError::invalid_endpoint(url, "empty path"));
            }
            return Ok(Self {
                scheme: Scheme::Dir,
                user: String::new(),
                host: String::new(),
                port: None,
                path: PathBuf::from(path),
            });
        }

        if let Some(rest) = url.strip_prefix("ssh://") {
            return Self::parse_ssh(url, rest);
        }

        if url.starts_with("tcp://") {
            return Err(CoordinatorError::invalid_endpoint(
                url,
                "tcp transport is reserved and not implemented",
            ));
        }

        Err(CoordinatorError::invalid_endpoint(url, "unknown scheme"))
    }

    fn parse_ssh(url: &str, rest: &str) -> Result<Self> {
        let (user, rest) = match rest.split_once('@') {
            Some((user, tail)) => (user.to_string(), tail),
            None => (String::new(), rest),
        };

        let Some((authority, path)) = rest.split_once('/') else {
            return Err(CoordinatorError::invalid_endpoint(url, "no path separator"));
        };
        if path.is_empty() {
            return Err(CoordinatorError::invalid_endpoint(url, "empty path"));
        }

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    CoordinatorError::invalid_endpoint(url, format!("invalid port '{port}'"))
                })?;
                (host, Some(port))
            }
            None => (authority, None),
        };
        if host.is_empty() {
            return Err(CoordinatorError::invalid_endpoint(url, "empty host"));
        }

        Ok(Self {
            scheme: Scheme::Ssh,
            user,
            host: host.to_string(),
            port,
            path: PathBuf::from(path),
        })
    }

    /// Parses an endpoint that must name a local directory.
    pub fn parse_dir(url: &str) -> Result<Self> {
        let endpoint = Self::parse(url)?;
        if endpoint.scheme != Scheme::Dir {
            return Err(CoordinatorError::invalid_endpoint(
                url,
                "a dir:// endpoint is required here",
            ));
        }
        Ok(endpoint)
    }

    pub fn is_dir(&self) -> bool {
        self.scheme == Scheme::Dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders the `[user@]host:path` form used by copy commands.
    pub fn scp_destination(&self) -> String {
        let mut dest = String::new();
        if !self.user.is_empty() {
            dest.push_str(&self.user);
            dest.push('@');
        }
        dest.push_str(&self.host);
        dest.push(':');
        dest.push_str(&self.path.to_string_lossy());
        dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dir() {
        let ep = Endpoint::parse("dir:///tmp/codegen").unwrap();
        assert_eq!(ep.scheme, Scheme::Dir);
        assert!(ep.host.is_empty());
        assert!(ep.user.is_empty());
        assert_eq!(ep.port, None);
        assert_eq!(ep.path, PathBuf::from("/tmp/codegen"));
    }

    #[test]
    fn test_parse_ssh_minimal() {
        let ep = Endpoint::parse("ssh://node7/scratch/out").unwrap();
        assert_eq!(ep.scheme, Scheme::Ssh);
        assert_eq!(ep.host, "node7");
        assert!(ep.user.is_empty());
        assert_eq!(ep.port, None);
        assert_eq!(ep.path, PathBuf::from("scratch/out"));
    }

    #[test]
    fn test_parse_ssh_full() {
        let ep = Endpoint::parse("ssh://tuner@node7:2222/scratch/out").unwrap();
        assert_eq!(ep.user, "tuner");
        assert_eq!(ep.host, "node7");
        assert_eq!(ep.port, Some(2222));
        assert_eq!(ep.path, PathBuf::from("scratch/out"));
    }

    #[test]
    fn test_tcp_rejected() {
        let err = Endpoint::parse("tcp://node7:2048/queue").unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        assert!(Endpoint::parse("nfs://node7/queue").is_err());
        assert!(Endpoint::parse("not a url").is_err());
    }

    #[test]
    fn test_ssh_missing_path() {
        assert!(Endpoint::parse("ssh://node7").is_err());
        assert!(Endpoint::parse("ssh://node7/").is_err());
    }

    #[test]
    fn test_ssh_empty_host() {
        assert!(Endpoint::parse("ssh:///scratch/out").is_err());
        assert!(Endpoint::parse("ssh://user@/scratch/out").is_err());
    }

    #[test]
    fn test_ssh_bad_port() {
        assert!(Endpoint::parse("ssh://node7:harbor/scratch").is_err());
        assert!(Endpoint::parse("ssh://node7:70000/scratch").is_err());
    }

    #[test]
    fn test_parse_dir_rejects_ssh() {
        assert!(Endpoint::parse_dir("ssh://node7/scratch").is_err());
        assert!(Endpoint::parse_dir("dir:///tmp/inbox").is_ok());
    }

    #[test]
    fn test_scp_destination() {
        let ep = Endpoint::parse("ssh://tuner@node7/scratch/out").unwrap();
        assert_eq!(ep.scp_destination(), "tuner@node7:scratch/out");

        let ep = Endpoint::parse("ssh://node7/scratch/out").unwrap();
        assert_eq!(ep.scp_destination(), "node7:scratch/out");
    }
}
