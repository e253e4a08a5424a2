pub mod pool;
pub mod result;
pub mod runner;

pub use pool::{ExecutionObserver, NullObserver, execute_plan};
pub use result::{ExitStatus, StepResult};
pub use runner::{CancelToken, ToolRunner};
