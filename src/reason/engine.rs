//! 推理引擎适配
//!
//! decide(task, window, retrieved_memory, tool_catalog) -> Decision。
//! 调用本身视为无副作用：这里绝不执行工具。输出解析失败分类为 Malformed，
//! 在有界重试内回灌「上一轮输出无效」的修正信号；重试耗尽交给 Supervisor 计数。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::error::CoreError;
use crate::core::session::Task;
use crate::memory::Turn;
use crate::reason::parser::{parse_decision, ParsedDecision, ToolRequest};
use crate::reason::review::{DecisionReview, ReviewOutcome};
use crate::reasoner::ReasonerClient;
use crate::tools::decision_schema_json;

/// 引擎输出的决策：动作 / 最终回答 / 无法解析
#[derive(Clone, Debug)]
pub enum Decision {
    Act {
        thought: Option<String>,
        requests: Vec<ToolRequest>,
    },
    Final {
        thought: Option<String>,
        text: String,
    },
    Malformed {
        detail: String,
    },
}

impl From<ParsedDecision> for Decision {
    fn from(parsed: ParsedDecision) -> Self {
        match parsed {
            ParsedDecision::Act { thought, requests } => Decision::Act { thought, requests },
            ParsedDecision::Final { thought, text } => Decision::Final { thought, text },
        }
    }
}

/// decide 的完整返回：原始文本保留给转录与「尽力而为」兜底回答
#[derive(Clone, Debug)]
pub struct Decided {
    pub raw: String,
    pub decision: Decision,
}

const BASE_INSTRUCTIONS: &str = "You are the reasoning engine of a tool-using agent.\n\
Decide ONE next step per turn. To call a tool, output exactly one JSON object\n\
{\"thought\": \"...\", \"tool\": \"name\", \"args\": {...}}; for several independent calls use\n\
{\"thought\": \"...\", \"actions\": [{\"tool\": \"name\", \"args\": {...}}, ...]};\n\
to finish, output {\"answer\": \"...\"} or plain text. No markdown around the JSON.";

const CORRECTION: &str = "Your previous output was invalid. Output exactly one JSON object of the \
form {\"tool\": \"name\", \"args\": {...}} or {\"answer\": \"...\"} and nothing else.";

/// 推理引擎：持有不透明客户端、可选评审策略与解析重试预算
pub struct ReasoningEngine {
    client: Arc<dyn ReasonerClient>,
    review: Option<Arc<dyn DecisionReview>>,
    max_malformed_retries: u32,
}

impl ReasoningEngine {
    pub fn new(client: Arc<dyn ReasonerClient>, max_malformed_retries: u32) -> Self {
        Self {
            client,
            review: None,
            max_malformed_retries,
        }
    }

    /// 挂接前置评审策略（Planner-Critic 变体）
    pub fn with_review(mut self, review: Arc<dyn DecisionReview>) -> Self {
        self.review = Some(review);
        self
    }

    /// 拼装 system 段：基础指令 + 决策 schema + 工具目录 + 任务（含约束）+ 长期记忆检索
    fn assemble_system(&self, task: &Task, catalog: &str, memory_block: &str) -> String {
        let mut system = format!(
            "{}\n\n## Decision Schema\n{}\n\n## Available Tools\n{}\n\n## Current Goal\n{}\n",
            BASE_INSTRUCTIONS,
            decision_schema_json(),
            catalog,
            task.goal
        );
        if !task.constraints.is_null() {
            system.push_str(&format!("\n## Constraints\n{}\n", task.constraints));
        }
        if !memory_block.is_empty() {
            system.push('\n');
            system.push_str(memory_block);
        }
        system
    }

    /// 单次迭代的决策；Err 仅在外部取消时出现
    pub async fn decide(
        &self,
        task: &Task,
        window: &[Turn],
        memory_block: &str,
        catalog: &str,
        cancel: &CancellationToken,
    ) -> Result<Decided, CoreError> {
        let system = self.assemble_system(task, catalog, memory_block);
        let mut turns = window.to_vec();
        let mut last_raw = String::new();
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            attempts += 1;

            let completion = tokio::select! {
                _ = cancel.cancelled() => return Err(CoreError::Cancelled),
                r = self.client.complete(&system, &turns) => r,
            };

            let raw = match completion {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, attempt = attempts, "reasoner call failed");
                    if attempts > self.max_malformed_retries {
                        return Ok(Decided {
                            raw: last_raw,
                            decision: Decision::Malformed {
                                detail: format!("reasoner error: {e}"),
                            },
                        });
                    }
                    continue;
                }
            };
            last_raw = raw.clone();

            match parse_decision(&raw) {
                Ok(parsed) => {
                    if let Some(review) = &self.review {
                        if let ReviewOutcome::Correction(advice) =
                            review.review(&task.goal, &parsed).await
                        {
                            tracing::debug!(advice = %advice, "plan rejected by review");
                            if attempts <= self.max_malformed_retries {
                                turns.push(Turn::user(format!(
                                    "Plan review: {advice} Revise your decision."
                                )));
                                continue;
                            }
                            // 预算耗尽：按原计划放行
                        }
                    }
                    return Ok(Decided {
                        raw,
                        decision: parsed.into(),
                    });
                }
                Err(CoreError::MalformedDecision(detail)) => {
                    tracing::debug!(attempt = attempts, detail = %detail, "malformed decision");
                    if attempts > self.max_malformed_retries {
                        return Ok(Decided {
                            raw,
                            decision: Decision::Malformed { detail },
                        });
                    }
                    turns.push(Turn::user(CORRECTION.to_string()));
                }
                Err(other) => {
                    return Ok(Decided {
                        raw,
                        decision: Decision::Malformed {
                            detail: other.to_string(),
                        },
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reason::review::CriticReview;
    use crate::reasoner::ScriptedReasoner;

    fn engine(outputs: Vec<&str>, retries: u32) -> ReasoningEngine {
        ReasoningEngine::new(Arc::new(ScriptedReasoner::new(outputs)), retries)
    }

    #[tokio::test]
    async fn test_valid_tool_call_passes_through() {
        let e = engine(vec![r#"{"tool": "echo", "args": {"text": "hi"}}"#], 2);
        let decided = e
            .decide(&Task::new("goal"), &[], "", "[]", &CancellationToken::new())
            .await
            .unwrap();
        match decided.decision {
            Decision::Act { requests, .. } => assert_eq!(requests[0].tool, "echo"),
            other => panic!("expected Act, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_recovers_within_retry_budget() {
        let e = engine(
            vec![
                "{broken",
                "{still broken",
                r#"{"answer": "recovered"}"#,
            ],
            2,
        );
        let decided = e
            .decide(&Task::new("goal"), &[], "", "[]", &CancellationToken::new())
            .await
            .unwrap();
        match decided.decision {
            Decision::Final { text, .. } => assert_eq!(text, "recovered"),
            other => panic!("expected Final, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_yields_malformed() {
        let e = ReasoningEngine::new(
            Arc::new(ScriptedReasoner::new(vec!["{broken"]).repeat_last()),
            2,
        );
        let decided = e
            .decide(&Task::new("goal"), &[], "", "[]", &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(decided.decision, Decision::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_decide() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let e = engine(vec![r#"{"answer": "never"}"#], 0);
        let result = e.decide(&Task::new("goal"), &[], "", "[]", &cancel).await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_review_correction_triggers_replan() {
        let critic = CriticReview::new(Arc::new(ScriptedReasoner::new(vec![
            "Use weather_lookup, the user asked about weather.",
            "OK",
        ])));
        let e = engine(
            vec![
                r#"{"tool": "flight_search", "args": {}}"#,
                r#"{"tool": "weather_lookup", "args": {}}"#,
            ],
            2,
        )
        .with_review(Arc::new(critic));

        let decided = e
            .decide(&Task::new("what's the weather"), &[], "", "[]", &CancellationToken::new())
            .await
            .unwrap();
        match decided.decision {
            Decision::Act { requests, .. } => assert_eq!(requests[0].tool, "weather_lookup"),
            other => panic!("expected revised Act, got {other:?}"),
        }
    }
}
