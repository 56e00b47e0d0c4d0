//! 进度状态
//!
//! `ProgressState` 只由调度器（经 `ProgressTracker`）修改，单一写者；
//! 读取方通过事件通道或 `snapshot()` 获得不可变副本，不存在共享可变
//! 状态。completed + failed 单调不减且不超过 total，每个任务恰好产生
//! 一次终态更新。

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

/// 进度快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    /// 任务总数
    pub total: usize,
    /// 成功完成数
    pub completed: usize,
    /// 终态失败数（含取消）
    pub failed: usize,
    /// 正在执行数
    pub in_flight: usize,
}

impl ProgressState {
    /// 已到终态的任务数
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    /// 完成百分比
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.finished() as f64 * 100.0 / self.total as f64
        }
    }
}

/// 进度跟踪器（单一写者）
///
/// 每次状态转移向事件通道发送一份新快照；通道无界，终态转移
/// 不会因读取方慢而丢失。
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
    events: mpsc::UnboundedSender<ProgressState>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<ProgressState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Arc::new(Self {
            state: Mutex::new(ProgressState {
                total,
                ..Default::default()
            }),
            events: tx,
        });
        (tracker, rx)
    }

    /// 当前状态副本
    pub fn snapshot(&self) -> ProgressState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 任务开始执行
    pub fn task_started(&self) {
        self.update(|s| s.in_flight += 1);
    }

    /// 任务进入重试等待（计数不变，仅广播一次转移）
    pub fn task_retrying(&self) {
        self.update(|_| {});
    }

    /// 任务成功（终态）
    pub fn task_succeeded(&self) {
        self.update(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.completed += 1;
        });
    }

    /// 任务失败（终态）
    pub fn task_failed(&self) {
        self.update(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.failed += 1;
        });
    }

    /// 任务被取消，未曾开始执行（终态）
    pub fn task_cancelled(&self) {
        self.update(|s| s.failed += 1);
    }

    fn update(&self, apply: impl FnOnce(&mut ProgressState)) {
        let snapshot = {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            apply(&mut state);
            *state
        };
        // 读取方可能已退出，忽略发送失败
        let _ = self.events.send(snapshot);
    }
}
