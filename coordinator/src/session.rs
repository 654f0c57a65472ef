//! Session bootstrapping.
//!
//! The one-time initialization message carries the session
//! configuration as key/value pairs: the coordinator's own queue
//! directory, the artifact target, the optional reply destination, the
//! worker host-spec, and the worker directory root. Bootstrapping
//! parses all of it, prepares the per-host working directories through
//! an external setup script, and acknowledges the tuning server before
//! the dispatch loop starts consuming points.

use std::path::PathBuf;

use tokio::process::Command;

use codegen_core::{
    parse_host_spec, CoordinatorConfig, CoordinatorError, Endpoint, Message, MessageBody,
    Result, RetryConfig, SessionInit, WorkerSlot,
};

use crate::publish::ResultPublisher;
use crate::queue;

/// Session configuration keys consumed from the init message.
pub mod keys {
    /// Coordinator's own inbox/outbox directory (must be `dir://`).
    pub const SERVER_URL: &str = "codegen_server_url";
    /// Artifact destination.
    pub const TARGET_URL: &str = "codegen_target_url";
    /// Result relay destination; absent or empty means results stay
    /// local.
    pub const REPLY_URL: &str = "codegen_reply_url";
    /// Worker host-spec string, e.g. `"alpha 2, beta 1"`.
    pub const SLAVE_LIST: &str = "codegen_slave_list";
    /// Root path of the per-host working directories.
    pub const SLAVE_PATH: &str = "codegen_slave_path";
    /// Local host name used for local-vs-remote routing. Optional; a
    /// `dir://` server endpoint carries no host of its own.
    pub const LOCAL_HOST: &str = "codegen_local_host";
}

const DEFAULT_LOCAL_HOST: &str = "localhost";

/// Parsed session state, read-only for the session's lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app_name: String,
    pub slave_path: PathBuf,
    /// The coordinator's own queue directory.
    pub local: Endpoint,
    /// Where generated artifacts are delivered by the workers.
    pub target: Endpoint,
    /// Where results are relayed, if anywhere.
    pub reply: Option<Endpoint>,
    /// Host name that selects the local execution form.
    pub local_host: String,
    pub slots: Vec<WorkerSlot>,
}

impl SessionConfig {
    /// Extracts and parses session configuration from an init payload.
    ///
    /// # Errors
    ///
    /// Returns `MissingConfigKey` for absent required keys and
    /// propagates endpoint and registry parse errors.
    pub fn from_init(init: &SessionInit) -> Result<Self> {
        let server_url = require(init, keys::SERVER_URL)?;
        let local = Endpoint::parse_dir(server_url)?;

        let target = Endpoint::parse(require(init, keys::TARGET_URL)?)?;

        let reply = match init.cfg.get(keys::REPLY_URL) {
            None => None,
            Some(url) if url.is_empty() => None,
            Some(url) => Some(Endpoint::parse(url)?),
        };

        let slots = parse_host_spec(require(init, keys::SLAVE_LIST)?)?;
        let slave_path = PathBuf::from(require(init, keys::SLAVE_PATH)?);

        let local_host = init
            .cfg
            .get(keys::LOCAL_HOST)
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOCAL_HOST.to_string());

        Ok(Self {
            app_name: init.app_name.clone(),
            slave_path,
            local,
            target,
            reply,
            local_host,
            slots,
        })
    }

    /// Working directory for a slot/app pair.
    pub fn workdir(&self, slot: &WorkerSlot) -> PathBuf {
        self.slave_path
            .join(format!("{}_{}", slot.hostname, self.app_name))
    }

    /// Path of the per-application generation script for a slot.
    pub fn script_path(&self, slot: &WorkerSlot) -> PathBuf {
        self.workdir(slot).join(format!("generate.{}.sh", self.app_name))
    }
}

fn require<'a>(init: &'a SessionInit, key: &str) -> Result<&'a str> {
    init.cfg
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| CoordinatorError::missing_config_key(key))
}

/// Consumes an initialization message and establishes a new session.
///
/// Clears stale candidates from the inbox, runs the one-time setup
/// script across all slot hosts, and acknowledges the tuning server
/// with an `Ok` reply at the init step. Any failure leaves no session
/// behind; the caller discards the init file and keeps polling.
pub async fn bootstrap(message: &Message, config: &CoordinatorConfig) -> Result<SessionConfig> {
    let init = message.session().ok_or_else(|| {
        CoordinatorError::protocol("initialization message does not carry session config")
    })?;

    let session = SessionConfig::from_init(init)?;
    tracing::info!(
        app = %session.app_name,
        workers = session.slots.len(),
        "bootstrapping session"
    );
    for slot in &session.slots {
        tracing::debug!(slot = %slot.hostname, "registered worker slot");
    }

    queue::sweep_candidates(session.local.path()).await?;
    run_setup(&session, &config.dispatch.setup_script).await?;

    // Acknowledge the tuning server through the same envelope format.
    let publisher = ResultPublisher::new(
        session.local.path(),
        session.reply.clone(),
        RetryConfig::from(&config.relay),
    );
    let ack = Message::reply_ok(MessageBody::Session(init.clone()));
    publisher.publish(&ack, queue::INIT_STEP).await?;

    tracing::info!(app = %session.app_name, "session initialized, ready to generate");
    Ok(session)
}

/// Runs the one-time per-host setup script:
/// `sh <script> <app> <slave_path> <local_host> <slot hostnames...>`.
async fn run_setup(session: &SessionConfig, script: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg(script)
        .arg(&session.app_name)
        .arg(&session.slave_path)
        .arg(&session.local_host)
        .args(session.slots.iter().map(|s| s.hostname.as_str()))
        .status()
        .await
        .map_err(|e| {
            CoordinatorError::config_with_source(
                format!("failed to run setup script '{script}'"),
                e,
            )
        })?;

    if !status.success() {
        return Err(CoordinatorError::config(format!(
            "setup script '{script}' exited with {status}"
        )));
    }
    Ok(())
}
