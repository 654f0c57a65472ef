//! The coordinator's control loop.
//!
//! A single task owns all session state: it polls the queue directory
//! for the initialization file or the next-expected candidate, assigns
//! points to free worker slots in registry order, reaps finished
//! generators, and publishes results. Concurrency is bounded by the
//! registry size; when every slot is busy the loop waits for a
//! generator to finish before consuming more input. Generation runs in
//! child processes; the loop itself only spawns and waits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Child;

use codegen_core::{
    CoordinatorConfig, CoordinatorError, Message, MessageBody, PointCache, Result, RetryConfig,
    WorkerSlot,
};

use crate::publish::ResultPublisher;
use crate::queue;
use crate::session::{self, SessionConfig};
use crate::worker;

/// One worker slot plus its outstanding job, if any.
struct SlotState {
    slot: WorkerSlot,
    job: Option<RunningJob>,
}

struct RunningJob {
    child: Child,
    step: i64,
    /// The reply to publish when the generator exits cleanly.
    result: Message,
}

/// Live state of one session: parsed config, the slot pool, the point
/// replay cache, and the result publisher.
struct Session {
    config: SessionConfig,
    slots: Vec<SlotState>,
    cache: PointCache,
    cache_enabled: bool,
    publisher: ResultPublisher,
}

impl Session {
    fn new(config: SessionConfig, coordinator: &CoordinatorConfig) -> Self {
        let publisher = ResultPublisher::new(
            config.local.path(),
            config.reply.clone(),
            RetryConfig::from(&coordinator.relay),
        );
        let slots = config
            .slots
            .iter()
            .cloned()
            .map(|slot| SlotState { slot, job: None })
            .collect();
        Self {
            config,
            slots,
            cache: PointCache::new(),
            cache_enabled: coordinator.cache.enabled,
            publisher,
        }
    }

    fn has_free_slot(&self) -> bool {
        self.slots.iter().any(|s| s.job.is_none())
    }

    /// Non-blocking reap of every finished generator. Free capacity is
    /// always recomputed from slot state, never from a side counter.
    ///
    /// # Errors
    ///
    /// A generator that exited nonzero aborts the whole coordinator.
    async fn reap_finished(&mut self) -> Result<usize> {
        let mut reaped = 0;

        for i in 0..self.slots.len() {
            let hostname = self.slots[i].slot.hostname.clone();

            let status = match self.slots[i].job.as_mut() {
                None => continue,
                Some(job) => match job.child.try_wait() {
                    Ok(status) => status,
                    Err(e) => {
                        return Err(CoordinatorError::worker(
                            &hostname,
                            format!("failed to poll generation command: {e}"),
                        ))
                    }
                },
            };
            let Some(status) = status else { continue };
            let Some(job) = self.slots[i].job.take() else { continue };

            if !status.success() {
                return Err(CoordinatorError::worker(
                    &hostname,
                    format!("generation command failed: {status}"),
                ));
            }
            tracing::info!(slot = %hostname, step = job.step, %status, "generation complete");

            self.publisher.publish(&job.result, job.step).await?;
            if self.cache_enabled {
                if let Some(point) = job.result.point() {
                    self.cache.record(point.clone(), job.result.clone());
                }
            }
            reaped += 1;
        }

        Ok(reaped)
    }

    /// Waits until at least one slot has been reclaimed.
    async fn wait_for_slot(&mut self, interval: Duration) -> Result<()> {
        tracing::debug!("all worker slots busy; waiting for a generator to finish");
        loop {
            if self.reap_finished().await? > 0 {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Kills and reaps any in-flight generators. Used when a new
    /// initialization message supersedes this session.
    async fn discard_workers(&mut self) {
        for state in &mut self.slots {
            let Some(mut job) = state.job.take() else { continue };
            tracing::warn!(
                slot = %state.slot.hostname,
                step = job.step,
                "discarding in-flight generator for new session"
            );
            if let Err(e) = job.child.start_kill() {
                tracing::warn!(slot = %state.slot.hostname, "failed to kill generator: {e}");
            }
            let _ = job.child.wait().await;
        }
    }
}

/// The long-running dispatch coordinator.
pub struct DispatchLoop {
    /// Queue directory the coordinator was started on; superseded by
    /// the session's own server endpoint once one is established.
    root: PathBuf,
    config: CoordinatorConfig,
    session: Option<Session>,
    step: i64,
}

impl DispatchLoop {
    pub fn new(root: impl Into<PathBuf>, config: CoordinatorConfig) -> Self {
        Self {
            root: root.into(),
            config,
            session: None,
            step: 0,
        }
    }

    fn inbox(&self) -> &Path {
        self.session
            .as_ref()
            .map(|s| s.config.local.path())
            .unwrap_or(&self.root)
    }

    /// Runs the dispatch loop until a fatal error occurs.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_once().await?;
        }
    }

    /// One iteration: wait for the next queue file and consume it.
    async fn run_once(&mut self) -> Result<()> {
        let inbox = self.inbox().to_path_buf();
        let init_path = queue::candidate_path(&inbox, queue::INIT_STEP);
        let next_path = queue::candidate_path(&inbox, self.step);
        let poll = Duration::from_millis(self.config.dispatch.poll_interval_ms);

        tracing::debug!(step = self.step, "waiting to hear from tuning server");
        loop {
            if queue::file_ready(&init_path) {
                return self.handle_init(&init_path).await;
            }
            if self.session.is_some() && queue::file_ready(&next_path) {
                return self.handle_candidate(&next_path).await;
            }
            // Keep reaping while idle so finished generators free their
            // slots without waiting for new input.
            if let Some(session) = self.session.as_mut() {
                let _ = session.reap_finished().await?;
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Consumes the initialization file, replacing any active session.
    /// Bootstrap failure discards the file and keeps the loop polling.
    async fn handle_init(&mut self, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "initialization file found");

        let outcome = match queue::read_message(path).await {
            Ok(message) => session::bootstrap(&message, &self.config).await,
            Err(e) => Err(e),
        };
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), "failed to remove initialization file: {e}");
        }

        match outcome {
            Ok(config) => {
                if let Some(mut old) = self.session.take() {
                    old.discard_workers().await;
                }
                self.session = Some(Session::new(config, &self.config));
                self.step = 0;
                tracing::info!("beginning new code generation session");
            }
            Err(e) => {
                tracing::warn!("discarding invalid initialization file: {e}");
            }
        }
        Ok(())
    }

    /// Dispatches the next candidate to a free slot.
    async fn handle_candidate(&mut self, path: &Path) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let step = self.step;
        tracing::info!(step, path = %path.display(), "processing candidate");

        let message = queue::read_message(path).await?;
        let point = message.point().cloned().ok_or_else(|| {
            CoordinatorError::protocol("candidate file does not carry a point")
        })?;

        if session.cache_enabled {
            if let Some(hit) = session.cache.lookup(&point) {
                let result = hit.clone();
                tracing::info!(step, "point already generated, replaying cached result");
                session.publisher.publish(&result, step).await?;
                consume(path).await;
                self.step += 1;
                return Ok(());
            }
        }

        let Some(idx) = session.slots.iter().position(|s| s.job.is_none()) else {
            // Cannot happen: the loop blocks below whenever the pool
            // saturates. Reaching this is a logic fault.
            return Err(CoordinatorError::worker(
                "dispatch",
                "no free worker slot for dispatch; registry exhausted",
            ));
        };

        let child = worker::launch(&session.config, &session.slots[idx].slot, &point)?;
        session.slots[idx].job = Some(RunningJob {
            child,
            step,
            result: Message::reply_ok(MessageBody::Point(point)),
        });

        if !session.has_free_slot() {
            let interval = Duration::from_millis(self.config.dispatch.reap_interval_ms);
            session.wait_for_slot(interval).await?;
        }

        consume(path).await;
        self.step += 1;
        Ok(())
    }
}

/// Removes a consumed queue file.
async fn consume(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), "failed to remove consumed candidate: {e}");
    }
}
