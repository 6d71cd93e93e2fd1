//! 编排核心错误类型
//!
//! 单次失败（解析、工具、推理）一律就地恢复为 Observation，不向循环外抛出；
//! 工具级失败分类见 tools::FailureKind（unknown_tool / validation / execution /
//! timeout / cancelled）。受控停机走 ShutdownReport，与错误在分类学上分开。

use thiserror::Error;

/// 可失败 API 的错误（解析、注册、持久化、取消）
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// 推理输出无法解析为合法决策（重试耗尽后按不生产迭代计数）
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    /// 注册表已存在同名工具
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// 恢复会话时快照不存在（会话不启动，直接返回给调用方）
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Cancelled")]
    Cancelled,
}
