use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{TaskId, TaskType};

/// A unit of work described by the control plane.
///
/// Snapshots are received on every poll and dropped once the diff that used them is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Task category, matched against the agent's supported types.
    #[serde(rename = "type")]
    pub kind: TaskType,
    /// Executable path or name (e.g. `"hping3"`, `"/usr/bin/slowhttptest"`).
    #[serde(rename = "cmd")]
    pub command: String,
    /// Command-line arguments in order.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Task {
    /// Human-readable command line, used for logging only.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Desired task set keyed by task identifier.
pub type DesiredTasks = HashMap<TaskId, Task>;
