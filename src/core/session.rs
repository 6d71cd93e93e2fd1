//! 会话数据：任务、迭代转录、终止结果
//!
//! 迭代记录 append-only，序号从 1 严格递增无空洞；一个会话恰有一个终止迭代
//! （FinalAnswer 或被监管/上限/取消终止）。

use serde::Serialize;
use serde_json::Value;

/// 用户任务：目标 + 可选结构化约束；会话启动后不可变
#[derive(Clone, Debug)]
pub struct Task {
    pub goal: String,
    pub constraints: Value,
}

impl Task {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            constraints: Value::Null,
        }
    }

    pub fn with_constraints(mut self, constraints: Value) -> Self {
        self.constraints = constraints;
        self
    }
}

/// 终止原因；完成与受控停机走同一个 on_shutdown 钩子
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    Completed,
    IdleTimeout,
    FailureThreshold,
    IterationCeiling,
    ExternalCancel,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ShutdownReason::Completed => "completed",
            ShutdownReason::IdleTimeout => "idle_timeout",
            ShutdownReason::FailureThreshold => "failure_threshold",
            ShutdownReason::IterationCeiling => "iteration_ceiling",
            ShutdownReason::ExternalCancel => "external_cancel",
        };
        f.write_str(label)
    }
}

/// 受控停机报告：不是错误，与崩溃在分类学上截然分开
#[derive(Clone, Debug)]
pub struct ShutdownReport {
    pub reason: ShutdownReason,
    pub iterations: u64,
    /// 迭代上限触发时的「尽力而为」答案（最后一次推理原文）
    pub partial_answer: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FinalAnswer {
    pub text: String,
    pub iterations: u64,
}

/// run(task) 的两种收尾
#[derive(Clone, Debug)]
pub enum SessionOutcome {
    Final(FinalAnswer),
    Shutdown(ShutdownReport),
}

impl SessionOutcome {
    pub fn iterations(&self) -> u64 {
        match self {
            SessionOutcome::Final(f) => f.iterations,
            SessionOutcome::Shutdown(r) => r.iterations,
        }
    }
}

/// 转录中对单次迭代决策的概括
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecisionSummary {
    /// 调用了哪些工具（按发起顺序）
    Act(Vec<String>),
    Final,
    Malformed,
}

/// 单次迭代记录；创建后不再修改
#[derive(Clone, Debug)]
pub struct IterationRecord {
    pub index: u64,
    pub thought: Option<String>,
    pub decision: DecisionSummary,
}
