//! 核心编排层：错误分类、空闲监管、生命周期钩子、会话记录与主控循环

pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod session;
pub mod supervisor;

pub use coordinator::Coordinator;
pub use error::CoreError;
pub use hooks::LifecycleHooks;
pub use session::{
    DecisionSummary, FinalAnswer, IterationRecord, SessionOutcome, ShutdownReason, ShutdownReport,
    Task,
};
pub use supervisor::{Clock, IdleSupervisor, Productivity, SessionHealth, StopCause, SupervisorState};
