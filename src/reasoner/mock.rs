//! Mock 推理客户端（无需任何 API，本地跑通整个循环）
//!
//! 第一次调用回显 echo 工具调用，第二次给出最终回答。

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::memory::{Role, Turn};
use crate::reasoner::ReasonerClient;

/// Mock 客户端：echo 一次用户输入后立即收尾
#[derive(Debug, Default)]
pub struct MockReasoner {
    acted: AtomicBool,
}

#[async_trait]
impl ReasonerClient for MockReasoner {
    async fn complete(&self, _system: &str, window: &[Turn]) -> Result<String, String> {
        let last_user = window
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or("(no input)");

        if !self.acted.swap(true, Ordering::SeqCst) {
            Ok(format!(
                r#"{{"thought": "echo the request once", "tool": "echo", "args": {{"text": "Echo from Mock: {}"}}}}"#,
                last_user.replace('"', "'")
            ))
        } else {
            Ok(r#"{"answer": "Echoed the request; nothing else to do."}"#.to_string())
        }
    }
}
