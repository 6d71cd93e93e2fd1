//! 工具层：参数 schema、注册表与带超时的并发分发器

pub mod dispatcher;
pub mod echo;
pub mod registry;
pub mod schema;

pub use dispatcher::{FailureKind, ToolDispatcher, ToolFailure, ToolInvocation, ToolResult};
pub use echo::EchoTool;
pub use registry::{Tool, ToolRegistry};
pub use schema::{decision_schema_json, validate_args, ParamKind, ParamSpec};
