//! 记忆协调：短期窗口 + 长期存储 + 压缩 + 快照
//!
//! 协调器只与 MemoryManager 交互：append_turn 在窗口溢出时自动压缩入长期，
//! retrieval_section 拼出注入推理上下文的检索段落，checkpoint/restore 走 ThreadStore。

use std::sync::Arc;

use crate::core::error::CoreError;
use crate::memory::compaction::Summarizer;
use crate::memory::long_term::{LongTermStore, MemoryItem};
use crate::memory::persistence::{ThreadSnapshot, ThreadStore};
use crate::memory::thread::{ConversationThread, Turn};

/// 压缩产生条目的默认重要度（高于普通 remember，事实不能丢）
const COMPACTED_IMPORTANCE: f32 = 1.5;

pub struct MemoryManager {
    thread_id: String,
    thread: ConversationThread,
    long_term: Arc<dyn LongTermStore>,
    summarizer: Arc<dyn Summarizer>,
    retrieval_top_k: usize,
}

impl MemoryManager {
    pub fn new(
        thread_id: impl Into<String>,
        window: usize,
        long_term: Arc<dyn LongTermStore>,
        summarizer: Arc<dyn Summarizer>,
        retrieval_top_k: usize,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            thread: ConversationThread::new(window),
            long_term,
            summarizer,
            retrieval_top_k,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// 追加一条轮次；窗口溢出时先摘要入长期再丢弃（压缩，不截断）
    pub async fn append_turn(&mut self, turn: Turn) {
        let evicted = self.thread.push(turn);
        if evicted.is_empty() {
            return;
        }
        let summaries = self.summarizer.summarize(&evicted).await;
        for content in summaries {
            self.long_term
                .remember(&self.thread_id, MemoryItem::new(content, COMPACTED_IMPORTANCE));
        }
        tracing::debug!(
            thread = %self.thread_id,
            evicted = evicted.len(),
            "compacted oldest turns into long-term memory"
        );
    }

    /// 显式写入长期记忆（最终回复、用户「记住」类事实）
    pub fn remember(&self, content: &str, importance: f32) {
        self.long_term
            .remember(&self.thread_id, MemoryItem::new(content, importance));
    }

    pub fn retrieve(&self, query: &str) -> Vec<MemoryItem> {
        self.long_term
            .retrieve(&self.thread_id, query, self.retrieval_top_k)
    }

    /// 构建长期记忆检索段落（Relevant Past Knowledge）；无命中返回空串
    pub fn retrieval_section(&self, query: &str) -> String {
        let hits = self.retrieve(query);
        if hits.is_empty() {
            return String::new();
        }
        let block = hits
            .iter()
            .map(|i| format!("- {}", i.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!("## Relevant Past Knowledge\n{block}\n")
    }

    pub fn window(&self) -> &[Turn] {
        self.thread.turns()
    }

    /// 当前窗口 + 长期条目打快照写入 store
    pub fn checkpoint(&self, store: &dyn ThreadStore) -> Result<(), CoreError> {
        let snapshot = ThreadSnapshot {
            thread_id: self.thread_id.clone(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            turns: self.thread.turns().to_vec(),
            items: self.long_term.export(&self.thread_id),
        };
        store.save(&snapshot)
    }

    /// 从 store 恢复一次会话；未知 thread_id 返回 ThreadNotFound，会话不启动
    pub fn restore(
        thread_id: &str,
        store: &dyn ThreadStore,
        window: usize,
        long_term: Arc<dyn LongTermStore>,
        summarizer: Arc<dyn Summarizer>,
        retrieval_top_k: usize,
    ) -> Result<Self, CoreError> {
        let snapshot = store.load(thread_id)?;
        long_term.import(thread_id, snapshot.items);
        let mut manager = Self::new(thread_id, window, long_term, summarizer, retrieval_top_k);
        manager.thread.set_turns(snapshot.turns);
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::compaction::ExtractiveSummarizer;
    use crate::memory::long_term::InMemoryStore;
    use crate::memory::persistence::FileThreadStore;

    fn manager(window: usize) -> MemoryManager {
        MemoryManager::new(
            "t1",
            window,
            Arc::new(InMemoryStore::default()),
            Arc::new(ExtractiveSummarizer::new()),
            5,
        )
    }

    #[tokio::test]
    async fn test_overflow_compacts_into_long_term() {
        let mut m = manager(2);
        m.append_turn(Turn::user("Remember the code Zulu-9 for the vault")).await;
        m.append_turn(Turn::assistant("Noted")).await;
        m.append_turn(Turn::user("next topic")).await;

        // 被驱逐的第一条里的实体/数值必须可检索
        let section = m.retrieval_section("Zulu vault code");
        assert!(section.contains("Relevant Past Knowledge"));
        assert!(section.contains("Zulu-9"));
        assert_eq!(m.window().len(), 2);
    }

    #[tokio::test]
    async fn test_checkpoint_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileThreadStore::new(dir.path());

        let mut m = manager(4);
        m.append_turn(Turn::user("find flights to Oslo")).await;
        m.append_turn(Turn::observation("flight_search", "XY77 at 180 EUR")).await;
        m.remember("user prefers aisle seats", 1.0);
        m.checkpoint(&store).unwrap();

        let restored = MemoryManager::restore(
            "t1",
            &store,
            4,
            Arc::new(InMemoryStore::default()),
            Arc::new(ExtractiveSummarizer::new()),
            5,
        )
        .unwrap();
        assert_eq!(restored.window().len(), 2);
        assert_eq!(restored.window()[1].source.as_deref(), Some("flight_search"));
        let hits = restored.retrieve("aisle seats");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_restore_unknown_thread_does_not_start() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileThreadStore::new(dir.path());
        let result = MemoryManager::restore(
            "missing",
            &store,
            4,
            Arc::new(InMemoryStore::default()),
            Arc::new(ExtractiveSummarizer::new()),
            5,
        );
        assert!(matches!(result, Err(CoreError::ThreadNotFound(_))));
    }
}
