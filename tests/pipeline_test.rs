//! 调度流水线集成测试
//!
//! 用内存中的桩客户端替代真实 HTTP 调用，验证结果对齐、并发上限、
//! 重试次数、进度单调与协作式取消。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use auto_problem_solver::{
    CancelToken, ProblemFetcher, ProblemRecord, ProblemRef, ProblemSolver, ProgressTracker,
    RetryPolicy, Scheduler, SolveError, SolveOutcome, Template, TemplateError,
};

fn make_refs(n: usize) -> Vec<ProblemRef> {
    (1..=n)
        .map(|i| ProblemRef {
            stage: "小学".to_string(),
            subject: "数学".to_string(),
            id: format!("p{}", i),
        })
        .collect()
}

fn record_for(id: &str) -> ProblemRecord {
    ProblemRecord {
        id: id.to_string(),
        question: format!("题目{}", id),
        correct_answer: "42".to_string(),
        subject: "数学".to_string(),
        grade: "小学".to_string(),
        problem_type: "主观题".to_string(),
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        budget: 3,
        base: Duration::from_millis(1),
        cap: Duration::from_millis(2),
    }
}

fn echo_template() -> Template {
    Template::new("测试模板", "{question}")
}

/// 按ID返回固定题目详情
struct StubFetcher {
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProblemFetcher for StubFetcher {
    async fn fetch(&self, id: &str) -> Result<ProblemRecord, SolveError> {
        self.calls.lock().unwrap().push(id.to_string());
        if id == "missing" {
            return Err(SolveError::NotFound { id: id.to_string() });
        }
        Ok(record_for(id))
    }
}

/// 原样返回提示词作为回答
struct EchoSolver;

#[async_trait]
impl ProblemSolver for EchoSolver {
    async fn solve(&self, prompt: &str, _model_id: &str) -> Result<String, SolveError> {
        Ok(prompt.to_string())
    }
}

fn scheduler(
    fetcher: Arc<dyn ProblemFetcher>,
    solver: Arc<dyn ProblemSolver>,
    max_workers: usize,
    cancel: CancelToken,
) -> Scheduler {
    Scheduler::new(
        fetcher,
        solver,
        echo_template(),
        "ep-test".to_string(),
        fast_policy(),
        max_workers,
        cancel,
    )
    .unwrap()
}

#[tokio::test]
async fn results_align_with_input_order() {
    for workers in [1, 3, 10] {
        let s = scheduler(
            Arc::new(StubFetcher::new()),
            Arc::new(EchoSolver),
            workers,
            CancelToken::new(),
        );
        let (progress, _rx) = ProgressTracker::new(7);
        let results = s.run(make_refs(7), progress).await.unwrap();

        assert_eq!(results.len(), 7);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.task.id, format!("p{}", i + 1));
            // 回答由提示词回显，应与本任务的题干一致
            assert_eq!(
                result.outcome,
                SolveOutcome::Solved {
                    answer: format!("题目p{}", i + 1)
                }
            );
        }
    }
}

/// 记录同时在执行的调用数，检验并发硬上限
struct CountingSolver {
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

impl CountingSolver {
    fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProblemSolver for CountingSolver {
    async fn solve(&self, prompt: &str, _model_id: &str) -> Result<String, SolveError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        sleep(Duration::from_millis(10)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(prompt.to_string())
    }
}

#[tokio::test]
async fn concurrency_never_exceeds_max_workers() {
    let solver = Arc::new(CountingSolver::new());
    let s = scheduler(
        Arc::new(StubFetcher::new()),
        solver.clone(),
        3,
        CancelToken::new(),
    );
    let (progress, _rx) = ProgressTracker::new(12);
    let results = s.run(make_refs(12), progress).await.unwrap();

    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|r| r.is_solved()));
    assert!(solver.max_seen.load(Ordering::SeqCst) <= 3);
}

/// 对特定题目始终返回限流，其余正常
struct RateLimitedSolver {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ProblemSolver for RateLimitedSolver {
    async fn solve(&self, prompt: &str, _model_id: &str) -> Result<String, SolveError> {
        self.calls.lock().unwrap().push(prompt.to_string());
        if prompt.contains("p2") {
            Err(SolveError::RateLimited { retry_after: None })
        } else {
            Ok(prompt.to_string())
        }
    }
}

#[tokio::test]
async fn rate_limited_task_uses_whole_budget_without_affecting_others() {
    let solver = Arc::new(RateLimitedSolver {
        calls: Mutex::new(Vec::new()),
    });
    let s = scheduler(
        Arc::new(StubFetcher::new()),
        solver.clone(),
        2,
        CancelToken::new(),
    );
    let (progress, _rx) = ProgressTracker::new(3);
    let results = s.run(make_refs(3), progress).await.unwrap();

    assert!(results[0].is_solved());
    assert!(matches!(results[1].outcome, SolveOutcome::Failed { .. }));
    assert!(results[2].is_solved());

    let calls = solver.calls.lock().unwrap();
    let p2_calls = calls.iter().filter(|p| p.contains("p2")).count();
    assert_eq!(p2_calls, 3);
    assert_eq!(calls.iter().filter(|p| p.contains("p1")).count(), 1);
}

#[tokio::test]
async fn missing_problem_fails_without_retry() {
    let fetcher = Arc::new(StubFetcher::new());
    let s = scheduler(
        fetcher.clone(),
        Arc::new(EchoSolver),
        2,
        CancelToken::new(),
    );
    let tasks = vec![
        ProblemRef {
            stage: "小学".to_string(),
            subject: "数学".to_string(),
            id: "p1".to_string(),
        },
        ProblemRef {
            stage: "小学".to_string(),
            subject: "数学".to_string(),
            id: "missing".to_string(),
        },
    ];
    let (progress, _rx) = ProgressTracker::new(2);
    let results = s.run(tasks, progress).await.unwrap();

    assert!(results[0].is_solved());
    match &results[1].outcome {
        SolveOutcome::Failed { reason } => assert!(reason.contains("题目不存在")),
        other => panic!("应为失败结局, 实际: {:?}", other),
    }
    assert!(results[1].record.is_none());

    // 不存在的题目不应被重试
    let calls = fetcher.calls.lock().unwrap();
    assert_eq!(calls.iter().filter(|id| *id == "missing").count(), 1);
}

#[tokio::test]
async fn progress_is_monotonic_and_reaches_total() {
    let s = scheduler(
        Arc::new(StubFetcher::new()),
        Arc::new(EchoSolver),
        4,
        CancelToken::new(),
    );
    let (progress, mut rx) = ProgressTracker::new(5);
    let results = s.run(make_refs(5), Arc::clone(&progress)).await.unwrap();
    assert_eq!(results.len(), 5);

    let mut last_finished = 0;
    let mut events = 0;
    while let Ok(state) = rx.try_recv() {
        assert!(state.finished() >= last_finished);
        assert!(state.finished() <= state.total);
        last_finished = state.finished();
        events += 1;
    }
    assert!(events >= 5);
    assert_eq!(last_finished, 5);

    let final_state = progress.snapshot();
    assert_eq!(final_state.completed, 5);
    assert_eq!(final_state.failed, 0);
    assert_eq!(final_state.in_flight, 0);
}

/// 第一次成功解答后触发停止信号
struct CancelAfterFirstSolver {
    cancel: CancelToken,
}

#[async_trait]
impl ProblemSolver for CancelAfterFirstSolver {
    async fn solve(&self, prompt: &str, _model_id: &str) -> Result<String, SolveError> {
        self.cancel.cancel();
        Ok(prompt.to_string())
    }
}

#[tokio::test]
async fn cancellation_keeps_completed_results() {
    let cancel = CancelToken::new();
    let s = scheduler(
        Arc::new(StubFetcher::new()),
        Arc::new(CancelAfterFirstSolver {
            cancel: cancel.clone(),
        }),
        1,
        cancel,
    );
    let (progress, _rx) = ProgressTracker::new(4);
    let results = s.run(make_refs(4), Arc::clone(&progress)).await.unwrap();

    assert_eq!(results.len(), 4);
    assert!(results[0].is_solved());
    for result in &results[1..] {
        assert_eq!(result.outcome, SolveOutcome::Cancelled);
    }

    let state = progress.snapshot();
    assert_eq!(state.completed, 1);
    assert_eq!(state.failed, 3);
    assert_eq!(state.finished(), 4);
}

/// 对特定题目直接 panic，模拟有缺陷的客户端实现
struct PanickingSolver;

#[async_trait]
impl ProblemSolver for PanickingSolver {
    async fn solve(&self, prompt: &str, _model_id: &str) -> Result<String, SolveError> {
        if prompt.contains("p2") {
            panic!("客户端实现缺陷");
        }
        Ok(prompt.to_string())
    }
}

#[tokio::test]
async fn panicking_task_fails_alone_without_stopping_batch() {
    let s = scheduler(
        Arc::new(StubFetcher::new()),
        Arc::new(PanickingSolver),
        2,
        CancelToken::new(),
    );
    let (progress, _rx) = ProgressTracker::new(3);
    let results = s.run(make_refs(3), Arc::clone(&progress)).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_solved());
    match &results[1].outcome {
        SolveOutcome::Failed { reason } => assert!(reason.contains("异常退出")),
        other => panic!("应为失败结局, 实际: {:?}", other),
    }
    assert!(results[2].is_solved());

    let state = progress.snapshot();
    assert_eq!(state.finished(), 3);
    assert_eq!(state.in_flight, 0);
}

#[test]
fn invalid_template_blocks_batch_before_dispatch() {
    let err = Scheduler::new(
        Arc::new(StubFetcher::new()),
        Arc::new(EchoSolver),
        Template::new("坏模板", "{question} 难度: {difficulty}"),
        "ep-test".to_string(),
        fast_policy(),
        2,
        CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, TemplateError::InvalidTemplate { .. }));
}

#[tokio::test]
async fn pre_cancelled_batch_produces_only_cancelled_results() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let s = scheduler(
        Arc::new(StubFetcher::new()),
        Arc::new(EchoSolver),
        2,
        cancel,
    );
    let (progress, _rx) = ProgressTracker::new(3);
    let results = s.run(make_refs(3), progress).await.unwrap();

    assert!(results
        .iter()
        .all(|r| r.outcome == SolveOutcome::Cancelled));
}
