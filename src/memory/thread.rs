//! 短期记忆：会话轮次窗口
//!
//! 保留最近 N 条轮次（user / assistant / observation），超出时弹出最旧的一批，
//! 由 MemoryManager 先压缩入长期记忆再丢弃：信息压缩，绝不静默截断。

use serde::{Deserialize, Serialize};

/// 轮次角色（observation 为工具回写）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Observation,
}

/// 单条轮次；observation 轮次的 source 记录来源工具名
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            source: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            source: None,
        }
    }

    pub fn observation(tool: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Observation,
            content: content.into(),
            source: Some(tool.into()),
        }
    }
}

/// 短期窗口：append-only，超出 window 条时返回被驱逐的最旧轮次
#[derive(Clone, Debug)]
pub struct ConversationThread {
    turns: Vec<Turn>,
    window: usize,
}

impl ConversationThread {
    pub fn new(window: usize) -> Self {
        Self {
            turns: Vec::new(),
            window: window.max(1),
        }
    }

    /// O(1) 追加；超出窗口时弹出最旧轮次交还调用方（压缩后丢弃）
    pub fn push(&mut self, turn: Turn) -> Vec<Turn> {
        self.turns.push(turn);
        if self.turns.len() <= self.window {
            return Vec::new();
        }
        let overflow = self.turns.len() - self.window;
        self.turns.drain(..overflow).collect()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// 恢复快照时整体替换窗口内容
    pub fn set_turns(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_window_evicts_nothing() {
        let mut thread = ConversationThread::new(3);
        assert!(thread.push(Turn::user("a")).is_empty());
        assert!(thread.push(Turn::assistant("b")).is_empty());
        assert!(thread.push(Turn::user("c")).is_empty());
        assert_eq!(thread.len(), 3);
    }

    #[test]
    fn test_push_beyond_window_returns_oldest() {
        let mut thread = ConversationThread::new(2);
        thread.push(Turn::user("first"));
        thread.push(Turn::assistant("second"));
        let evicted = thread.push(Turn::user("third"));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].content, "first");
        assert_eq!(thread.turns()[0].content, "second");
        assert_eq!(thread.len(), 2);
    }

    #[test]
    fn test_observation_carries_tool_source() {
        let turn = Turn::observation("weather_lookup", "sunny");
        assert_eq!(turn.role, Role::Observation);
        assert_eq!(turn.source.as_deref(), Some("weather_lookup"));
    }
}
