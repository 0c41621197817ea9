//! Diff between the desired task set and what runs locally.

use std::collections::BTreeSet;

use ddc_model::{DesiredTasks, SupportedTypes, Task, TaskId};

/// Actions needed to converge the local pool to the desired set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Active ids absent from the desired set.
    pub stop: Vec<TaskId>,
    /// Desired tasks not yet running whose type is supported.
    pub start: Vec<Task>,
    /// Desired tasks not running and filtered out by type.
    pub skipped: Vec<TaskId>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.stop.is_empty() && self.start.is_empty()
    }
}

/// Compute the plan. Output vectors are ordered by task id.
pub fn plan(
    active: &BTreeSet<TaskId>,
    desired: DesiredTasks,
    supported: &SupportedTypes,
) -> ReconcilePlan {
    let stop = active
        .iter()
        .filter(|id| !desired.contains_key(*id))
        .cloned()
        .collect();

    let mut start = Vec::new();
    let mut skipped = Vec::new();
    for (id, task) in desired {
        if active.contains(&id) {
            continue;
        }
        if supported.allows(&task.kind) {
            start.push(task);
        } else {
            skipped.push(id);
        }
    }
    start.sort_by(|a, b| a.id.cmp(&b.id));
    skipped.sort();

    ReconcilePlan {
        stop,
        start,
        skipped,
    }
}
