//! 空闲/生命周期监管：连续失败计数 + 墙钟不活跃计时
//!
//! 状态机 Active -> (Warning) -> Shutdown（终态）。生产性迭代清零计数并刷新时钟；
//! 连续不生产达到阈值、或距上次生产事件的真实时间超限，二者先到先停。
//! 这是设计内的优雅退出，不是故障。时钟可注入，便于测试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SupervisorSection;

/// 可注入时钟（测试用假时钟，生产用 Instant::now）
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// 监管状态机状态；Warning 仅提示，不改变行为
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionHealth {
    Active,
    Warning,
    Shutdown,
}

/// 一次迭代的产出定性：工具成功或给出最终回答即为生产性
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Productivity {
    Productive,
    Unproductive,
}

/// 停机成因（由协调器映射为 ShutdownReason）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopCause {
    FailureThreshold,
    IdleTimeout,
}

/// 每会话恰好一份，仅由 Supervisor 持有与修改，会话开始时重置
#[derive(Clone, Debug)]
pub struct SupervisorState {
    pub consecutive_failures: u32,
    pub last_productive: Instant,
    pub iterations: u64,
}

pub struct IdleSupervisor {
    failure_threshold: u32,
    warning_threshold: u32,
    idle_timeout: Duration,
    clock: Clock,
    state: SupervisorState,
    health: SessionHealth,
    stop_cause: Option<StopCause>,
}

impl IdleSupervisor {
    pub fn new(cfg: &SupervisorSection) -> Self {
        Self::with_clock(cfg, Arc::new(Instant::now))
    }

    pub fn with_clock(cfg: &SupervisorSection, clock: Clock) -> Self {
        let now = clock();
        Self {
            failure_threshold: cfg.failure_threshold.max(1),
            warning_threshold: cfg.warning_threshold,
            idle_timeout: cfg.idle_timeout(),
            clock,
            state: SupervisorState {
                consecutive_failures: 0,
                last_productive: now,
                iterations: 0,
            },
            health: SessionHealth::Active,
            stop_cause: None,
        }
    }

    pub fn health(&self) -> SessionHealth {
        self.health
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// 墙钟检查：独立于计数器，协调器在每轮开始调用
    pub fn idle_check(&mut self) -> Option<StopCause> {
        if self.health == SessionHealth::Shutdown {
            return self.stop_cause;
        }
        let elapsed = (self.clock)().saturating_duration_since(self.state.last_productive);
        if elapsed >= self.idle_timeout {
            self.enter_shutdown(StopCause::IdleTimeout);
            return self.stop_cause;
        }
        None
    }

    /// 记录一次迭代产出；终态后不再接受更新，原因原样返回
    pub fn record(&mut self, productivity: Productivity) -> Option<StopCause> {
        if self.health == SessionHealth::Shutdown {
            return self.stop_cause;
        }
        self.state.iterations += 1;
        match productivity {
            Productivity::Productive => {
                self.state.consecutive_failures = 0;
                self.state.last_productive = (self.clock)();
                self.health = SessionHealth::Active;
            }
            Productivity::Unproductive => {
                self.state.consecutive_failures += 1;
                if self.state.consecutive_failures >= self.failure_threshold {
                    self.enter_shutdown(StopCause::FailureThreshold);
                    return self.stop_cause;
                }
                if self.warning_threshold > 0
                    && self.state.consecutive_failures >= self.warning_threshold
                    && self.health == SessionHealth::Active
                {
                    self.health = SessionHealth::Warning;
                    tracing::warn!(
                        failures = self.state.consecutive_failures,
                        threshold = self.failure_threshold,
                        "session approaching failure threshold"
                    );
                }
            }
        }
        None
    }

    fn enter_shutdown(&mut self, cause: StopCause) {
        self.health = SessionHealth::Shutdown;
        self.stop_cause = Some(cause);
        tracing::info!(cause = ?cause, "supervisor entered shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn cfg(failures: u32, idle_secs: u64) -> SupervisorSection {
        SupervisorSection {
            failure_threshold: failures,
            warning_threshold: 0,
            idle_timeout_secs: idle_secs,
        }
    }

    /// 假时钟：起点 + 可推进的偏移
    fn fake_clock() -> (Clock, Arc<Mutex<Duration>>) {
        let start = Instant::now();
        let offset = Arc::new(Mutex::new(Duration::ZERO));
        let o = Arc::clone(&offset);
        (Arc::new(move || start + *o.lock().unwrap()), offset)
    }

    #[test]
    fn test_failure_limit_triggers_stop() {
        let (clock, _) = fake_clock();
        let mut sup = IdleSupervisor::with_clock(&cfg(2, 3600), clock);
        assert_eq!(sup.record(Productivity::Unproductive), None);
        assert_eq!(
            sup.record(Productivity::Unproductive),
            Some(StopCause::FailureThreshold)
        );
        assert_eq!(sup.health(), SessionHealth::Shutdown);
    }

    #[test]
    fn test_productive_resets_counter() {
        let (clock, _) = fake_clock();
        let mut sup = IdleSupervisor::with_clock(&cfg(2, 3600), clock);
        sup.record(Productivity::Unproductive);
        sup.record(Productivity::Productive);
        assert_eq!(sup.state().consecutive_failures, 0);
        assert_eq!(sup.record(Productivity::Unproductive), None);
    }

    #[test]
    fn test_timeout_fires_without_any_failures() {
        let (clock, offset) = fake_clock();
        let mut sup = IdleSupervisor::with_clock(&cfg(100, 5), clock);
        assert_eq!(sup.idle_check(), None);
        *offset.lock().unwrap() = Duration::from_secs(4);
        assert_eq!(sup.idle_check(), None);
        *offset.lock().unwrap() = Duration::from_secs(6);
        assert_eq!(sup.idle_check(), Some(StopCause::IdleTimeout));
    }

    #[test]
    fn test_productive_refreshes_wall_clock() {
        let (clock, offset) = fake_clock();
        let mut sup = IdleSupervisor::with_clock(&cfg(100, 5), clock);
        *offset.lock().unwrap() = Duration::from_secs(4);
        sup.record(Productivity::Productive);
        *offset.lock().unwrap() = Duration::from_secs(8);
        // 距上次生产仅 4s，不触发
        assert_eq!(sup.idle_check(), None);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let (clock, _) = fake_clock();
        let mut sup = IdleSupervisor::with_clock(&cfg(1, 3600), clock);
        assert_eq!(
            sup.record(Productivity::Unproductive),
            Some(StopCause::FailureThreshold)
        );
        // 终态后生产性更新不被接受
        assert_eq!(
            sup.record(Productivity::Productive),
            Some(StopCause::FailureThreshold)
        );
        assert_eq!(sup.health(), SessionHealth::Shutdown);
    }

    #[test]
    fn test_warning_is_informational_only() {
        let (clock, _) = fake_clock();
        let section = SupervisorSection {
            failure_threshold: 5,
            warning_threshold: 2,
            idle_timeout_secs: 3600,
        };
        let mut sup = IdleSupervisor::with_clock(&section, clock);
        sup.record(Productivity::Unproductive);
        sup.record(Productivity::Unproductive);
        assert_eq!(sup.health(), SessionHealth::Warning);
        // Warning 不阻止继续
        assert_eq!(sup.record(Productivity::Unproductive), None);
    }
}
