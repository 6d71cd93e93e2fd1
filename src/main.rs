//! Waggle - 智能体编排核心
//!
//! 入口：初始化日志，从配置装配协调器（Mock 推理端 + echo 工具），
//! 对命令行给出的任务跑一整个会话，无需任何 API Key。

use std::sync::Arc;

use anyhow::Context;

use waggle::config::{load_config, AppConfig};
use waggle::core::{Coordinator, IdleSupervisor, LifecycleHooks, SessionOutcome, Task};
use waggle::memory::{ExtractiveSummarizer, InMemoryStore, MemoryManager};
use waggle::observability;
use waggle::reason::ReasoningEngine;
use waggle::reasoner::MockReasoner;
use waggle::tools::{EchoTool, ToolDispatcher, ToolRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let goal: String = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            "echo hello from waggle".to_string()
        } else {
            args.join(" ")
        }
    };

    let mut registry = ToolRegistry::new();
    registry.register(EchoTool).context("register echo tool")?;
    let dispatcher = ToolDispatcher::new(
        Arc::new(registry),
        cfg.tools.call_timeout_secs,
        cfg.tools.max_concurrent_calls,
    );

    tracing::warn!("No reasoner endpoint configured, using Mock reasoner");
    let engine = ReasoningEngine::new(
        Arc::new(MockReasoner::default()),
        cfg.session.max_malformed_retries,
    );

    let memory = MemoryManager::new(
        "cli",
        cfg.session.short_term_window,
        Arc::new(InMemoryStore::new(cfg.memory.clone())),
        Arc::new(ExtractiveSummarizer::new()),
        cfg.session.retrieval_top_k,
    );
    let supervisor = IdleSupervisor::new(&cfg.supervisor);

    let hooks = LifecycleHooks::new()
        .with_on_iteration(|index| tracing::info!(iteration = index, "loop"))
        .with_on_shutdown(|reason| tracing::info!(%reason, "session closed"));

    let mut coordinator = Coordinator::new(
        engine,
        dispatcher,
        memory,
        supervisor,
        cfg.session.iteration_ceiling,
    )
    .with_hooks(hooks);

    match coordinator.run(Task::new(goal)).await {
        SessionOutcome::Final(answer) => {
            println!("{}", answer.text);
        }
        SessionOutcome::Shutdown(report) => {
            println!(
                "session ended: {} after {} iterations",
                report.reason, report.iterations
            );
            if let Some(partial) = report.partial_answer {
                println!("best available answer:\n{partial}");
            }
        }
    }

    Ok(())
}
