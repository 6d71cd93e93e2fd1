//! 脚本化推理客户端（测试用）
//!
//! 按顺序吐出预置输出；脚本耗尽后可选择重复最后一条（模拟一直输出坏结果的端点）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::memory::Turn;
use crate::reasoner::ReasonerClient;

pub struct ScriptedReasoner {
    outputs: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    repeat_last: bool,
}

impl ScriptedReasoner {
    pub fn new(outputs: Vec<&str>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(String::from).collect()),
            last: Mutex::new(None),
            repeat_last: false,
        }
    }

    /// 脚本耗尽后重复最后一条输出，而不是报错
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }
}

#[async_trait]
impl ReasonerClient for ScriptedReasoner {
    async fn complete(&self, _system: &str, _window: &[Turn]) -> Result<String, String> {
        let mut outputs = self.outputs.lock().unwrap();
        if let Some(next) = outputs.pop_front() {
            *self.last.lock().unwrap() = Some(next.clone());
            return Ok(next);
        }
        if self.repeat_last {
            if let Some(last) = self.last.lock().unwrap().clone() {
                return Ok(last);
            }
        }
        Err("script exhausted".to_string())
    }
}
