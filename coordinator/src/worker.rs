//! Generator worker launch.
//!
//! Each dispatched point becomes one external generation command. The
//! slot's logical host decides the execution form: a direct invocation
//! of the per-application script when it matches the session's local
//! host, or the same script wrapped in `ssh` otherwise. Arguments are
//! passed as a structured argv, never as a concatenated shell string;
//! the only quoting difference is the extra layer the remote form
//! needs to survive the remote shell.

use codegen_core::{CoordinatorError, PointMessage, Result, WorkerSlot};
use tokio::process::{Child, Command};

use crate::session::SessionConfig;

/// Builds the argv for a slot's generation command.
///
/// Local form:
/// `<script> "<values>" <logical_host> <workdir> <target_host> <target_path>`
///
/// Remote form:
/// `ssh <logical_host> exec <script> "\"<values>\"" <logical_host> <workdir> <target_host> <target_path>`
pub fn command_line(
    session: &SessionConfig,
    slot: &WorkerSlot,
    point: &PointMessage,
) -> Vec<String> {
    let logical_host = slot.logical_host();
    let local = logical_host == session.local_host;
    let values = point.values_string();

    let mut argv = Vec::new();
    if !local {
        argv.push("ssh".to_string());
        argv.push(logical_host.to_string());
        argv.push("exec".to_string());
    }
    argv.push(session.script_path(slot).to_string_lossy().into_owned());
    if local {
        argv.push(values);
    } else {
        // One extra quoting layer: ssh joins its arguments and hands
        // them to the remote shell for re-splitting.
        argv.push(format!("\"{values}\""));
    }
    argv.push(logical_host.to_string());
    argv.push(session.workdir(slot).to_string_lossy().into_owned());
    argv.push(session.target.host.clone());
    argv.push(session.target.path.to_string_lossy().into_owned());
    argv
}

/// Spawns the generation command for a point on the given slot.
pub fn launch(session: &SessionConfig, slot: &WorkerSlot, point: &PointMessage) -> Result<Child> {
    let argv = command_line(session, slot, point);
    tracing::info!(
        slot = %slot.hostname,
        values = %point.values_string(),
        command = %argv.join(" "),
        "launching generator"
    );

    Command::new(&argv[0])
        .args(&argv[1..])
        .spawn()
        .map_err(|e| {
            CoordinatorError::worker(
                &slot.hostname,
                format!("failed to spawn generation command '{}': {e}", argv[0]),
            )
        })
}
