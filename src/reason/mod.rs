//! 认知层：决策解析、可选评审策略与推理引擎适配

pub mod engine;
pub mod parser;
pub mod review;

pub use engine::{Decided, Decision, ReasoningEngine};
pub use parser::{parse_decision, ParsedDecision, ToolRequest};
pub use review::{CriticReview, DecisionReview, ReviewOutcome};
