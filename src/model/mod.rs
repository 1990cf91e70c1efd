mod definition;
mod execution;
mod task;

pub use definition::{BranchCase, DEFAULT_CASE, SubWorkflowParams, WorkflowDef, WorkflowTask};
pub use execution::{Execution, ExecutionAndTasks, WorkflowStatus};
pub use task::{TaskResult, TaskStatus, TaskType};
