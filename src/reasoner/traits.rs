//! 推理能力客户端抽象
//!
//! 核心把底层推理调用当作不透明能力：给上下文，回原始文本。
//! 结构化解析与校验在 reason 层完成，这里不做任何工具执行。

use async_trait::async_trait;

use crate::memory::Turn;

/// 推理客户端 trait：system 段 + 窗口轮次 -> 原始输出文本
#[async_trait]
pub trait ReasonerClient: Send + Sync {
    async fn complete(&self, system: &str, window: &[Turn]) -> Result<String, String>;
}
