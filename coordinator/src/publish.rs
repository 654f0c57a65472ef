//! Result publication.
//!
//! Completed steps are written as `code_complete.<step>` envelopes in
//! the local outbox. When the session configures a reply endpoint, the
//! file is additionally copied there and the local copy removed; relay
//! failure is the one tolerated partial failure: the local file then
//! remains as the record of truth.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use codegen_core::{Endpoint, Message, Result, RetryConfig};

use crate::queue;

pub struct ResultPublisher {
    outbox: PathBuf,
    reply: Option<Endpoint>,
    retry: RetryConfig,
    /// Copy program for the remote relay. Overridable so tests can
    /// substitute a local shim for `scp`.
    relay_program: String,
}

impl ResultPublisher {
    pub fn new(outbox: impl Into<PathBuf>, reply: Option<Endpoint>, retry: RetryConfig) -> Self {
        Self {
            outbox: outbox.into(),
            reply,
            retry,
            relay_program: "scp".to_string(),
        }
    }

    #[must_use]
    pub fn with_relay_program(mut self, program: impl Into<String>) -> Self {
        self.relay_program = program.into();
        self
    }

    /// Publishes the outcome message for a completed step.
    ///
    /// Returns the path of the local result file; when the relay
    /// succeeded the file at that path no longer exists.
    pub async fn publish(&self, message: &Message, step: i64) -> Result<PathBuf> {
        let path = queue::result_path(&self.outbox, step);
        queue::write_message(&path, message).await?;
        tracing::debug!(step, path = %path.display(), "result written");

        if let Some(reply) = &self.reply {
            if self.relay(&path, reply).await {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), "failed to remove relayed result: {e}");
                }
            } else {
                tracing::warn!(
                    step,
                    destination = %reply.scp_destination(),
                    "result relay failed; keeping local file {}",
                    path.display()
                );
            }
        }

        Ok(path)
    }

    fn relay_args(&self, file: &Path, reply: &Endpoint) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(port) = reply.port {
            args.push("-P".to_string());
            args.push(port.to_string());
        }
        args.push(file.to_string_lossy().into_owned());
        args.push(reply.scp_destination());
        args
    }

    /// Copies a result file to the reply endpoint, retrying per the
    /// configured policy. Returns true on success.
    async fn relay(&self, file: &Path, reply: &Endpoint) -> bool {
        let mut attempt = 0;
        loop {
            let status = Command::new(&self.relay_program)
                .args(self.relay_args(file, reply))
                .status()
                .await;

            match status {
                Ok(status) if status.success() => return true,
                Ok(status) => {
                    tracing::warn!(attempt, "relay copy exited with {status}");
                }
                Err(e) => {
                    tracing::warn!(attempt, "relay copy failed to run: {e}");
                }
            }

            if !self.retry.should_retry(attempt) {
                return false;
            }
            tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
            attempt += 1;
        }
    }
}
