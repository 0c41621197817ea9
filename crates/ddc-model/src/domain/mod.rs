mod task_id;
pub use task_id::TaskId;

mod task;
pub use task::{DesiredTasks, Task};

mod supported_types;
pub use supported_types::SupportedTypes;

/// Category of a task as reported by the control plane (e.g. `"hping3"`).
pub type TaskType = String;

/// Task type for `hping3` based load tasks.
pub const TASK_TYPE_HPING3: &str = "hping3";

/// Task type for `slowhttptest` based load tasks.
pub const TASK_TYPE_SLOW_HTTP_TEST: &str = "slowhttptest";
