//! 并发调度器
//!
//! 以信号量作为硬并发上限：先取许可再 spawn，任何时刻执行中的任务
//! 不超过 max_workers。任务句柄按提交顺序收集、按提交顺序等待，
//! 结果向量与输入顺序严格对齐，与完成顺序无关。
//!
//! 停止信号是协作式的：已在执行的任务跑完当前步骤，未开始的任务
//! 直接记为已取消。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub mod progress;
pub mod retry;

pub use progress::{ProgressState, ProgressTracker};
pub use retry::{RetryPolicy, TaskState};

use crate::clients::{ProblemFetcher, ProblemSolver};
use crate::error::TemplateError;
use crate::model::{ProblemRef, SolveOutcome, SolveResult};
use crate::template::Template;
use crate::utils::text;

/// 协作式停止信号
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// 并发调度器
pub struct Scheduler {
    fetcher: Arc<dyn ProblemFetcher>,
    solver: Arc<dyn ProblemSolver>,
    template: Template,
    model_id: String,
    policy: RetryPolicy,
    max_workers: usize,
    cancel: CancelToken,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("model_id", &self.model_id)
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// 创建调度器；模板校验失败会阻止整批任务启动
    pub fn new(
        fetcher: Arc<dyn ProblemFetcher>,
        solver: Arc<dyn ProblemSolver>,
        template: Template,
        model_id: String,
        policy: RetryPolicy,
        max_workers: usize,
        cancel: CancelToken,
    ) -> Result<Self, TemplateError> {
        template.validate()?;
        Ok(Self {
            fetcher,
            solver,
            template,
            model_id,
            policy,
            max_workers: max_workers.max(1),
            cancel,
        })
    }

    /// 批量处理任务，返回与输入顺序对齐的结果向量
    pub async fn run(
        &self,
        tasks: Vec<ProblemRef>,
        progress: Arc<ProgressTracker>,
    ) -> Result<Vec<SolveResult>> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut slots: Vec<Slot> = Vec::with_capacity(tasks.len());

        for task in tasks {
            if self.cancel.is_cancelled() {
                progress.task_cancelled();
                slots.push(Slot::Ready(cancelled_result(task)));
                continue;
            }

            // 先取许可再 spawn，执行中任务数以信号量为硬上限
            let permit = semaphore.clone().acquire_owned().await?;

            if self.cancel.is_cancelled() {
                drop(permit);
                progress.task_cancelled();
                slots.push(Slot::Ready(cancelled_result(task)));
                continue;
            }

            let fetcher = Arc::clone(&self.fetcher);
            let solver = Arc::clone(&self.solver);
            let template = self.template.clone();
            let model_id = self.model_id.clone();
            let policy = self.policy;
            let task_progress = Arc::clone(&progress);

            let spawned_task = task.clone();
            let handle = tokio::spawn(async move {
                let result = solve_task(
                    spawned_task,
                    fetcher,
                    solver,
                    template,
                    model_id,
                    policy,
                    task_progress,
                )
                .await;
                drop(permit);
                result
            });
            slots.push(Slot::Running { task, handle });
        }

        // 按提交顺序等待，结果与输入顺序对齐
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Ready(result) => results.push(result),
                Slot::Running { task, handle } => match handle.await {
                    Ok(result) => results.push(result),
                    // 执行体异常退出只使本任务失败，不影响其余结果
                    Err(e) => {
                        error!("❌ 题目 {} 执行体异常退出: {}", task.id, e);
                        progress.task_failed();
                        results.push(SolveResult {
                            task,
                            record: None,
                            outcome: SolveOutcome::Failed {
                                reason: format!("任务执行体异常退出: {}", e),
                            },
                        });
                    }
                },
            }
        }
        Ok(results)
    }
}

enum Slot {
    /// 未进入执行即有结果（收到停止信号）
    Ready(SolveResult),
    Running {
        task: ProblemRef,
        handle: tokio::task::JoinHandle<SolveResult>,
    },
}

fn cancelled_result(task: ProblemRef) -> SolveResult {
    SolveResult {
        task,
        record: None,
        outcome: SolveOutcome::Cancelled,
    }
}

/// 单个任务的完整流程：获取题目 → 渲染提示词 → 调用大模型
///
/// 两次远程调用各自走重试状态机；无论成败，恰好产生一次终态
/// 进度更新。
async fn solve_task(
    task: ProblemRef,
    fetcher: Arc<dyn ProblemFetcher>,
    solver: Arc<dyn ProblemSolver>,
    template: Template,
    model_id: String,
    policy: RetryPolicy,
    progress: Arc<ProgressTracker>,
) -> SolveResult {
    progress.task_started();
    info!("🔍 开始处理题目: {} ({}/{})", task.id, task.stage, task.subject);

    let record = {
        let id = task.id.clone();
        policy
            .run(
                |_| {
                    let fetcher = Arc::clone(&fetcher);
                    let id = id.clone();
                    async move { fetcher.fetch(&id).await }
                },
                |attempt, delay, err| {
                    warn!(
                        "⚠️ 获取题目 {} 第 {} 次尝试失败，{:?} 后重试: {}",
                        id, attempt, delay, err
                    );
                    progress.task_retrying();
                },
            )
            .await
    };

    let record = match record {
        Ok(record) => record,
        Err(err) => {
            warn!("❌ 获取题目 {} 失败: {}", task.id, err);
            progress.task_failed();
            return SolveResult {
                task,
                record: None,
                outcome: SolveOutcome::Failed {
                    reason: format!("获取题目失败: {}", err),
                },
            };
        }
    };

    let prompt = match template.render(&record.prompt_fields()) {
        Ok(prompt) => prompt,
        Err(err) => {
            warn!("❌ 题目 {} 提示词渲染失败: {}", task.id, err);
            progress.task_failed();
            return SolveResult {
                task,
                record: Some(record),
                outcome: SolveOutcome::Failed {
                    reason: format!("提示词渲染失败: {}", err),
                },
            };
        }
    };

    let answer = {
        let id = task.id.clone();
        policy
            .run(
                |_| {
                    let solver = Arc::clone(&solver);
                    let prompt = prompt.clone();
                    let model_id = model_id.clone();
                    async move { solver.solve(&prompt, &model_id).await }
                },
                |attempt, delay, err| {
                    warn!(
                        "⚠️ 解答题目 {} 第 {} 次尝试失败，{:?} 后重试: {}",
                        id, attempt, delay, err
                    );
                    progress.task_retrying();
                },
            )
            .await
    };

    match answer {
        Ok(answer) => {
            info!(
                "✅ 题目 {} 解答完成: {}",
                task.id,
                text::truncate_text(&answer, 50)
            );
            progress.task_succeeded();
            SolveResult {
                task,
                record: Some(record),
                outcome: SolveOutcome::Solved { answer },
            }
        }
        Err(err) => {
            warn!("❌ 题目 {} 解答失败: {}", task.id, err);
            progress.task_failed();
            SolveResult {
                task,
                record: Some(record),
                outcome: SolveOutcome::Failed {
                    reason: format!("调用大模型失败: {}", err),
                },
            }
        }
    }
}
