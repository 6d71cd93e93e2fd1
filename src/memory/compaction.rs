//! 压缩：被驱逐轮次 -> 长期记忆条目
//!
//! 窗口溢出时先摘要再丢弃。摘要必须保住命名实体、数值与已做决定：
//! 朴素截断会静默毁掉任务关键事实，这正是该设计要避免的冲突。
//! 默认实现为抽取式（正则抽实体/数值），接 LLM 的实现可替换同一 trait。

use async_trait::async_trait;
use regex::Regex;

use crate::memory::thread::{Role, Turn};

/// 摘要器：将一批被驱逐轮次压缩为若干条长期记忆文本
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, turns: &[Turn]) -> Vec<String>;
}

/// 抽取式摘要器：逐轮保留压缩要点，并附全量实体/数值清单
pub struct ExtractiveSummarizer {
    entity_re: Regex,
    number_re: Regex,
    /// 每轮要点保留的最大字符数
    gist_chars: usize,
}

impl ExtractiveSummarizer {
    pub fn new() -> Self {
        Self {
            // 连续的大写开头词视作命名实体（含 AB123 这类代号）
            entity_re: Regex::new(r"\b[A-Z][A-Za-z0-9_-]*(?:\s+[A-Z][A-Za-z0-9_-]*)*\b")
                .expect("entity regex"),
            number_re: Regex::new(r"[-+]?\d+(?:[.,]\d+)*%?").expect("number regex"),
            gist_chars: 160,
        }
    }

    fn role_tag(role: &Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Observation => "observation",
        }
    }

    fn collect_unique(&self, re: &Regex, text: &str, into: &mut Vec<String>) {
        for m in re.find_iter(text) {
            let s = m.as_str().trim().to_string();
            if !s.is_empty() && !into.contains(&s) {
                into.push(s);
            }
        }
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, turns: &[Turn]) -> Vec<String> {
        if turns.is_empty() {
            return Vec::new();
        }
        let mut entities: Vec<String> = Vec::new();
        let mut numbers: Vec<String> = Vec::new();
        let mut gist_lines: Vec<String> = Vec::new();

        for turn in turns {
            self.collect_unique(&self.entity_re, &turn.content, &mut entities);
            self.collect_unique(&self.number_re, &turn.content, &mut numbers);

            let gist: String = turn.content.chars().take(self.gist_chars).collect();
            let tag = match &turn.source {
                Some(tool) => format!("{}[{}]", Self::role_tag(&turn.role), tool),
                None => Self::role_tag(&turn.role).to_string(),
            };
            gist_lines.push(format!("{}: {}", tag, gist));
        }

        let mut summary = format!("Compacted turns: {}", gist_lines.join(" | "));
        if !entities.is_empty() {
            summary.push_str(&format!(" | entities: {}", entities.join(", ")));
        }
        if !numbers.is_empty() {
            summary.push_str(&format!(" | numbers: {}", numbers.join(", ")));
        }
        vec![summary]
    }
}
