mod error;
pub use error::{ExecError, ExecResult};

mod util;

mod forward;

pub mod pool;
pub use pool::{Exit, ProcessPool};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::pool::{Exit, ProcessPool};
}
