//! 工具分发器
//!
//! dispatch(invocation) 按 schema 校验参数后在截止时间内执行，失败统一归一为
//! ToolFailure（不崩溃、不自动重试，重试与否由下一轮推理决定）；
//! 同一决策内的多个调用并发执行、按发起顺序合并；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::tools::registry::ToolRegistry;
use crate::tools::schema::validate_args;

/// 一次调用请求：发起时分配 id，结果按 id 关联回来
#[derive(Clone, Debug)]
pub struct ToolInvocation {
    pub id: Uuid,
    pub tool: String,
    pub args: Value,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool: tool.into(),
            args,
        }
    }
}

/// 失败类别（错误分类学中的非致命项）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    UnknownTool,
    Validation,
    Execution,
    Timeout,
    Cancelled,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::UnknownTool => "unknown_tool",
            FailureKind::Validation => "validation",
            FailureKind::Execution => "execution",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// 调用结果：成功负载或类型化失败；始终是普通值，绝不是 panic
#[derive(Clone, Debug)]
pub struct ToolResult {
    pub invocation_id: Uuid,
    pub tool: String,
    pub outcome: Result<Value, ToolFailure>,
    pub duration: Duration,
}

impl ToolResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// 渲染为写入记忆的 Observation 文本
    pub fn render(&self) -> String {
        match &self.outcome {
            Ok(value) => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            Err(failure) => format!("Error ({}): {}", failure.kind.label(), failure.message),
        }
    }
}

/// 分发器：持有只读注册表、全局单调用超时与并发许可
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    call_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, call_timeout_secs: u64, max_concurrent: usize) -> Self {
        Self {
            registry,
            call_timeout: Duration::from_secs(call_timeout_secs),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn catalog_json(&self) -> String {
        self.registry.catalog_json()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// 执行单个调用：未知工具 / 参数不合法 / 超时 / 取消全部归一为失败结果
    pub async fn dispatch(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let start = Instant::now();
        let outcome = self.dispatch_inner(invocation, cancel).await;
        let duration = start.elapsed();

        let (ok, reason) = match &outcome {
            Ok(_) => (true, "ok"),
            Err(f) => (false, f.kind.label()),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "invocation_id": invocation.id.to_string(),
            "tool": invocation.tool,
            "ok": ok,
            "outcome": reason,
            "duration_ms": duration.as_millis() as u64,
            "args_preview": args_preview(&invocation.args),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        ToolResult {
            invocation_id: invocation.id,
            tool: invocation.tool.clone(),
            outcome,
            duration,
        }
    }

    async fn dispatch_inner(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolFailure> {
        let Some(tool) = self.registry.get(&invocation.tool) else {
            return Err(ToolFailure {
                kind: FailureKind::UnknownTool,
                message: format!("no tool named '{}' is registered", invocation.tool),
            });
        };

        if let Err(reason) = validate_args(&tool.parameters(), &invocation.args) {
            return Err(ToolFailure {
                kind: FailureKind::Validation,
                message: reason,
            });
        }

        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ToolFailure {
                kind: FailureKind::Execution,
                message: "dispatcher permits closed".to_string(),
            })?;

        tokio::select! {
            _ = cancel.cancelled() => Err(ToolFailure {
                kind: FailureKind::Cancelled,
                message: "invocation cancelled by stop signal".to_string(),
            }),
            result = timeout(self.call_timeout, tool.execute(invocation.args.clone())) => {
                match result {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(message)) => Err(ToolFailure {
                        kind: FailureKind::Execution,
                        message,
                    }),
                    Err(_) => Err(ToolFailure {
                        kind: FailureKind::Timeout,
                        message: format!(
                            "tool '{}' exceeded {}s deadline",
                            invocation.tool,
                            self.call_timeout.as_secs()
                        ),
                    }),
                }
            }
        }
    }

    /// 并发执行一批调用；返回顺序 = 发起顺序（非完成顺序），保证转录可复现
    pub async fn dispatch_all(
        &self,
        invocations: &[ToolInvocation],
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        join_all(
            invocations
                .iter()
                .map(|invocation| self.dispatch(invocation, cancel)),
        )
        .await
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
