//! 可选决策评审（Planner-Critic 风格，前置于执行）
//!
//! 在动作执行前用一次轻量推理调用判断「计划是否贴合目标」，
//! 不通过则把修正建议回灌上下文重新规划。默认不启用；
//! 评审端点自身出错时放行（fail-open）。

use std::sync::Arc;

use async_trait::async_trait;

use crate::reason::parser::ParsedDecision;
use crate::reasoner::ReasonerClient;

/// 评审结论：放行或带建议的修正
#[derive(Clone, Debug)]
pub enum ReviewOutcome {
    Approved,
    Correction(String),
}

/// 决策评审策略：可插拔，默认无
#[async_trait]
pub trait DecisionReview: Send + Sync {
    async fn review(&self, goal: &str, decision: &ParsedDecision) -> ReviewOutcome;
}

/// 基于推理客户端的评审：模板含 {goal} 与 {plan} 占位
pub struct CriticReview {
    client: Arc<dyn ReasonerClient>,
    template: String,
}

const DEFAULT_TEMPLATE: &str = "The user wants: {goal}\nThe agent plans to run: {plan}\n\
Is this plan a reasonable next step? If yes, respond with exactly: OK\n\
If not, provide a brief correction (one sentence).";

impl CriticReview {
    pub fn new(client: Arc<dyn ReasonerClient>) -> Self {
        Self {
            client,
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    fn describe(decision: &ParsedDecision) -> Option<String> {
        match decision {
            ParsedDecision::Act { requests, .. } => Some(
                requests
                    .iter()
                    .map(|r| format!("{}({})", r.tool, r.args))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            // 最终回答不评审，直接放行
            ParsedDecision::Final { .. } => None,
        }
    }
}

#[async_trait]
impl DecisionReview for CriticReview {
    async fn review(&self, goal: &str, decision: &ParsedDecision) -> ReviewOutcome {
        let Some(plan) = Self::describe(decision) else {
            return ReviewOutcome::Approved;
        };
        let prompt = self
            .template
            .replace("{goal}", goal)
            .replace("{plan}", &plan);

        match self.client.complete(&prompt, &[]).await {
            Ok(response) => {
                let trimmed = response.trim();
                if trimmed.to_uppercase().starts_with("OK") || trimmed.is_empty() {
                    ReviewOutcome::Approved
                } else {
                    ReviewOutcome::Correction(trimmed.to_string())
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "decision review unavailable, approving plan");
                ReviewOutcome::Approved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reason::parser::ToolRequest;
    use crate::reasoner::ScriptedReasoner;
    use serde_json::json;

    fn act() -> ParsedDecision {
        ParsedDecision::Act {
            thought: None,
            requests: vec![ToolRequest {
                tool: "flight_search".to_string(),
                args: json!({"to": "Oslo"}),
            }],
        }
    }

    #[tokio::test]
    async fn test_ok_response_approves() {
        let critic = CriticReview::new(Arc::new(ScriptedReasoner::new(vec!["OK"])));
        assert!(matches!(
            critic.review("book a flight", &act()).await,
            ReviewOutcome::Approved
        ));
    }

    #[tokio::test]
    async fn test_non_ok_response_is_correction() {
        let critic = CriticReview::new(Arc::new(ScriptedReasoner::new(vec![
            "Search trains instead, the user asked for rail travel.",
        ])));
        match critic.review("book a train", &act()).await {
            ReviewOutcome::Correction(advice) => assert!(advice.contains("trains")),
            other => panic!("expected Correction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_final_answers_are_not_reviewed() {
        // 脚本为空：若评审真调用了客户端会得到 Err 并放行，但这里根本不该调用
        let critic = CriticReview::new(Arc::new(ScriptedReasoner::new(vec![])));
        let decision = ParsedDecision::Final {
            thought: None,
            text: "done".to_string(),
        };
        assert!(matches!(
            critic.review("anything", &decision).await,
            ReviewOutcome::Approved
        ));
    }

    #[tokio::test]
    async fn test_review_failure_fails_open() {
        let critic = CriticReview::new(Arc::new(ScriptedReasoner::new(vec![])));
        assert!(matches!(
            critic.review("goal", &act()).await,
            ReviewOutcome::Approved
        ));
    }
}
