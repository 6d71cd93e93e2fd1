//! 生命周期钩子
//!
//! 构造期传入的一组可选回调（不是可变的全局注册表），协调器在对应时点同步调用；
//! 缺省即 no-op，绝不报错。

use crate::core::session::{ShutdownReason, Task};
use crate::tools::{ToolInvocation, ToolResult};

type StartHook = Box<dyn Fn(&Task) + Send + Sync>;
type IterationHook = Box<dyn Fn(u64) + Send + Sync>;
type ToolCallHook = Box<dyn Fn(&ToolInvocation, &ToolResult) + Send + Sync>;
type ShutdownHook = Box<dyn Fn(&ShutdownReason) + Send + Sync>;

#[derive(Default)]
pub struct LifecycleHooks {
    on_start: Option<StartHook>,
    on_iteration: Option<IterationHook>,
    on_tool_call: Option<ToolCallHook>,
    on_shutdown: Option<ShutdownHook>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_start(mut self, f: impl Fn(&Task) + Send + Sync + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn with_on_iteration(mut self, f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.on_iteration = Some(Box::new(f));
        self
    }

    pub fn with_on_tool_call(
        mut self,
        f: impl Fn(&ToolInvocation, &ToolResult) + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_call = Some(Box::new(f));
        self
    }

    pub fn with_on_shutdown(
        mut self,
        f: impl Fn(&ShutdownReason) + Send + Sync + 'static,
    ) -> Self {
        self.on_shutdown = Some(Box::new(f));
        self
    }

    pub(crate) fn fire_start(&self, task: &Task) {
        if let Some(f) = &self.on_start {
            f(task);
        }
    }

    pub(crate) fn fire_iteration(&self, index: u64) {
        if let Some(f) = &self.on_iteration {
            f(index);
        }
    }

    pub(crate) fn fire_tool_call(&self, invocation: &ToolInvocation, result: &ToolResult) {
        if let Some(f) = &self.on_tool_call {
            f(invocation, result);
        }
    }

    pub(crate) fn fire_shutdown(&self, reason: &ShutdownReason) {
        if let Some(f) = &self.on_shutdown {
            f(reason);
        }
    }
}
