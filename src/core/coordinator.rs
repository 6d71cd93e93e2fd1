//! 编排协调器：主控循环
//!
//! run(task) 每轮：取消/墙钟/上限检查 -> on_iteration 钩子 -> 推理 decide ->
//! Act 则（可并发）分发工具并把调用与结果写回记忆 -> 按产出更新 Supervisor。
//! 单次失败全部就地化为 Observation，循环永不抛出原始错误；
//! on_shutdown 在任何收尾路径上恰好触发一次。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::hooks::LifecycleHooks;
use crate::core::session::{
    DecisionSummary, FinalAnswer, IterationRecord, SessionOutcome, ShutdownReason, ShutdownReport,
    Task,
};
use crate::core::supervisor::{IdleSupervisor, Productivity, StopCause};
use crate::memory::{MemoryManager, ThreadStore, Turn};
use crate::reason::{Decision, ReasoningEngine};
use crate::tools::{FailureKind, ToolDispatcher, ToolInvocation};

/// 最终回复写入长期记忆的重要度
const FINAL_ANSWER_IMPORTANCE: f32 = 2.0;

pub struct Coordinator {
    engine: ReasoningEngine,
    dispatcher: ToolDispatcher,
    memory: MemoryManager,
    supervisor: IdleSupervisor,
    hooks: LifecycleHooks,
    store: Option<Arc<dyn ThreadStore>>,
    iteration_ceiling: u64,
    cancel: CancellationToken,
    transcript: Vec<IterationRecord>,
}

impl Coordinator {
    pub fn new(
        engine: ReasoningEngine,
        dispatcher: ToolDispatcher,
        memory: MemoryManager,
        supervisor: IdleSupervisor,
        iteration_ceiling: u64,
    ) -> Self {
        Self {
            engine,
            dispatcher,
            memory,
            supervisor,
            hooks: LifecycleHooks::default(),
            store: None,
            iteration_ceiling: iteration_ceiling.max(1),
            cancel: CancellationToken::new(),
            transcript: Vec::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// 挂接持久化后端：FinalAnswer 收尾时自动 checkpoint
    pub fn with_thread_store(mut self, store: Arc<dyn ThreadStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 外部停止信号入口（用户中止、进程退出）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn transcript(&self) -> &[IterationRecord] {
        &self.transcript
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// 驱动一次完整会话；返回 FinalAnswer 或 ShutdownReport，绝不 panic、绝不死循环
    pub async fn run(&mut self, task: Task) -> SessionOutcome {
        self.hooks.fire_start(&task);
        self.memory.append_turn(Turn::user(task.goal.clone())).await;

        let mut last_raw: Option<String> = None;
        let mut index: u64 = 0;

        loop {
            // 取消与墙钟每轮开头检查：计时走真实时间，不依赖迭代数
            if self.cancel.is_cancelled() {
                return self.finish_shutdown(ShutdownReason::ExternalCancel, index, last_raw);
            }
            if let Some(cause) = self.supervisor.idle_check() {
                return self.finish_shutdown(Self::reason_for(cause), index, last_raw);
            }
            if index >= self.iteration_ceiling {
                // 上限是 Supervisor 之外的最终兜底：带走尽力而为的答案
                return self.finish_shutdown(ShutdownReason::IterationCeiling, index, last_raw);
            }
            index += 1;
            self.hooks.fire_iteration(index);

            let catalog = self.dispatcher.catalog_json();
            let memory_block = self.memory.retrieval_section(&task.goal);
            let decided = match self
                .engine
                .decide(
                    &task,
                    self.memory.window(),
                    &memory_block,
                    &catalog,
                    &self.cancel,
                )
                .await
            {
                Ok(d) => d,
                // 引擎只在取消时返回 Err
                Err(_) => {
                    return self.finish_shutdown(ShutdownReason::ExternalCancel, index, last_raw);
                }
            };
            last_raw = Some(decided.raw.clone());

            match decided.decision {
                Decision::Final { thought, text } => {
                    self.transcript.push(IterationRecord {
                        index,
                        thought,
                        decision: DecisionSummary::Final,
                    });
                    self.memory.append_turn(Turn::assistant(text.clone())).await;
                    self.memory
                        .remember(&format!("Final answer: {text}"), FINAL_ANSWER_IMPORTANCE);
                    let _ = self.supervisor.record(Productivity::Productive);
                    if let Some(store) = &self.store {
                        if let Err(e) = self.memory.checkpoint(store.as_ref()) {
                            tracing::warn!(error = %e, "checkpoint on completion failed");
                        }
                    }
                    self.hooks.fire_shutdown(&ShutdownReason::Completed);
                    return SessionOutcome::Final(FinalAnswer {
                        text,
                        iterations: index,
                    });
                }

                Decision::Act { thought, requests } => {
                    let invocations: Vec<ToolInvocation> = requests
                        .into_iter()
                        .map(|r| ToolInvocation::new(r.tool, r.args))
                        .collect();
                    let names: Vec<String> =
                        invocations.iter().map(|i| i.tool.clone()).collect();
                    self.transcript.push(IterationRecord {
                        index,
                        thought,
                        decision: DecisionSummary::Act(names.clone()),
                    });
                    self.memory
                        .append_turn(Turn::assistant(format!("Action: {}", names.join(", "))))
                        .await;

                    let results = self.dispatcher.dispatch_all(&invocations, &self.cancel).await;

                    let mut any_ok = false;
                    let mut saw_cancel = false;
                    for (invocation, result) in invocations.iter().zip(&results) {
                        self.hooks.fire_tool_call(invocation, result);
                        // 按发起顺序写回 Observation，转录可复现
                        self.memory
                            .append_turn(Turn::observation(
                                invocation.tool.as_str(),
                                result.render(),
                            ))
                            .await;
                        match &result.outcome {
                            Ok(_) => any_ok = true,
                            Err(f) if f.kind == FailureKind::Cancelled => saw_cancel = true,
                            Err(_) => {}
                        }
                    }
                    if saw_cancel && self.cancel.is_cancelled() {
                        return self.finish_shutdown(
                            ShutdownReason::ExternalCancel,
                            index,
                            last_raw,
                        );
                    }

                    let productivity = if any_ok {
                        Productivity::Productive
                    } else {
                        Productivity::Unproductive
                    };
                    if let Some(cause) = self.supervisor.record(productivity) {
                        return self.finish_shutdown(Self::reason_for(cause), index, last_raw);
                    }
                }

                Decision::Malformed { detail } => {
                    tracing::warn!(
                        iteration = index,
                        detail = %detail,
                        "decision malformed beyond retry budget"
                    );
                    self.transcript.push(IterationRecord {
                        index,
                        thought: None,
                        decision: DecisionSummary::Malformed,
                    });
                    if let Some(cause) = self.supervisor.record(Productivity::Unproductive) {
                        return self.finish_shutdown(Self::reason_for(cause), index, last_raw);
                    }
                }
            }
        }
    }

    fn reason_for(cause: StopCause) -> ShutdownReason {
        match cause {
            StopCause::FailureThreshold => ShutdownReason::FailureThreshold,
            StopCause::IdleTimeout => ShutdownReason::IdleTimeout,
        }
    }

    fn finish_shutdown(
        &mut self,
        reason: ShutdownReason,
        iterations: u64,
        partial_answer: Option<String>,
    ) -> SessionOutcome {
        tracing::info!(reason = %reason, iterations, "session ended by controlled shutdown");
        self.hooks.fire_shutdown(&reason);
        SessionOutcome::Shutdown(ShutdownReport {
            reason,
            iterations,
            partial_answer,
        })
    }
}
