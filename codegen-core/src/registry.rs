// codegen-core/src/registry.rs

//! Worker registry parsing.
//!
//! A host-spec string names the fixed set of generation slots for a
//! session. The grammar is comma-separated `<hostname> <count>`
//! entries; each entry contributes `count` slots named
//! `<hostname>_1 .. <hostname>_<count>`. Registry construction is
//! all-or-nothing: any malformed entry fails the whole parse.

use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};

/// One unit of bounded generation concurrency, bound to a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSlot {
    /// Logical host name plus a numeric suffix distinguishing
    /// concurrent slots on the same host, e.g. `node7_2`.
    pub hostname: String,
}

impl WorkerSlot {
    /// The host identity without the slot-disambiguating suffix.
    pub fn logical_host(&self) -> &str {
        match self.hostname.rsplit_once('_') {
            Some((host, _)) => host,
            None => &self.hostname,
        }
    }
}

/// Parses a host-spec string into an ordered slot list.
///
/// # Errors
///
/// Returns `InvalidWorkerSpec` for an empty host, a missing, zero or
/// unparsable count, or trailing text before the next comma. No slots
/// are produced on failure.
pub fn parse_host_spec(spec: &str) -> Result<Vec<WorkerSlot>> {
    let mut slots = Vec::new();

    for entry in spec.split(',') {
        let mut tokens = entry.split_whitespace();

        let host = tokens
            .next()
            .ok_or_else(|| CoordinatorError::invalid_worker_spec(spec, "empty entry"))?;

        let count = tokens
            .next()
            .ok_or_else(|| {
                CoordinatorError::invalid_worker_spec(spec, format!("missing count for '{host}'"))
            })?
            .parse::<u32>()
            .map_err(|_| {
                CoordinatorError::invalid_worker_spec(spec, format!("invalid count for '{host}'"))
            })?;
        if count == 0 {
            return Err(CoordinatorError::invalid_worker_spec(
                spec,
                format!("count for '{host}' must be positive"),
            ));
        }

        if let Some(extra) = tokens.next() {
            return Err(CoordinatorError::invalid_worker_spec(
                spec,
                format!("trailing text '{extra}' after '{host} {count}'"),
            ));
        }

        for i in 1..=count {
            slots.push(WorkerSlot {
                hostname: format!("{host}_{i}"),
            });
        }
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(slots: &[WorkerSlot]) -> Vec<&str> {
        slots.iter().map(|s| s.hostname.as_str()).collect()
    }

    #[test]
    fn test_parse_basic() {
        let slots = parse_host_spec("alpha 2, beta 1").unwrap();
        assert_eq!(names(&slots), vec!["alpha_1", "alpha_2", "beta_1"]);
    }

    #[test]
    fn test_slot_count_is_sum_of_entries() {
        let slots = parse_host_spec("a 3, b 2, c 4").unwrap();
        assert_eq!(slots.len(), 9);
    }

    #[test]
    fn test_declaration_order() {
        let slots = parse_host_spec("zeta 1, alpha 2").unwrap();
        assert_eq!(names(&slots), vec!["zeta_1", "alpha_1", "alpha_2"]);
    }

    #[test]
    fn test_single_entry_no_comma() {
        let slots = parse_host_spec("local 1").unwrap();
        assert_eq!(names(&slots), vec!["local_1"]);
    }

    #[test]
    fn test_whitespace_tolerant() {
        let slots = parse_host_spec("  alpha   2 ,beta 1").unwrap();
        assert_eq!(names(&slots), vec!["alpha_1", "alpha_2", "beta_1"]);
    }

    #[test]
    fn test_missing_count() {
        assert!(parse_host_spec("alpha").is_err());
        assert!(parse_host_spec("alpha 2, beta").is_err());
    }

    #[test]
    fn test_invalid_count() {
        assert!(parse_host_spec("alpha two").is_err());
        assert!(parse_host_spec("alpha -1").is_err());
        assert!(parse_host_spec("alpha 0").is_err());
    }

    #[test]
    fn test_trailing_text() {
        assert!(parse_host_spec("alpha 2 extra").is_err());
        assert!(parse_host_spec("alpha 2 extra, beta 1").is_err());
    }

    #[test]
    fn test_empty_entries() {
        assert!(parse_host_spec("").is_err());
        assert!(parse_host_spec("alpha 2,").is_err());
        assert!(parse_host_spec("alpha 2,,beta 1").is_err());
    }

    #[test]
    fn test_all_or_nothing() {
        // A late malformed entry must not leak slots from earlier ones.
        let err = parse_host_spec("alpha 4, beta nine").unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidWorkerSpec { .. }));
    }

    #[test]
    fn test_logical_host() {
        let slots = parse_host_spec("node7 2").unwrap();
        assert_eq!(slots[0].logical_host(), "node7");
        assert_eq!(slots[1].logical_host(), "node7");

        // Hosts containing underscores keep everything before the
        // final suffix.
        let slots = parse_host_spec("rack_a 1").unwrap();
        assert_eq!(slots[0].hostname, "rack_a_1");
        assert_eq!(slots[0].logical_host(), "rack_a");
    }
}
