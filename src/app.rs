//! 应用编排
//!
//! 把各模块串成完整的批处理流程：加载设置并解锁密钥 → 读取问题ID
//! 文件 → 并发调度 → 汇总导出。Ctrl+C 触发协作式停止，已完成的
//! 结果照常导出。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::aggregator;
use crate::clients::{ArkClient, ProblemApiClient};
use crate::config::Config;
use crate::credential::CredentialStore;
use crate::export::{ExportSink, JsonExporter};
use crate::input;
use crate::scheduler::{CancelToken, ProgressState, ProgressTracker, RetryPolicy, Scheduler};
use crate::settings::Settings;
use crate::utils::logging;

/// 批处理应用
pub struct App {
    config: Config,
    settings: Settings,
}

impl App {
    /// 加载配置与设置，解锁 API 密钥
    ///
    /// 密钥缺失或无法解密时在任何任务启动前失败。
    pub fn initialize(config: Config) -> Result<Self> {
        let credentials = CredentialStore::new(PathBuf::from(&config.key_file));
        let settings = Settings::load(Path::new(&config.settings_file), &credentials, &config)?;

        if settings.api_key.is_empty() {
            bail!(
                "未配置 API 密钥：请设置 ARK_API_KEY 环境变量，或在 {} 中保存密钥",
                config.settings_file
            );
        }

        Ok(Self { config, settings })
    }

    /// 执行完整批处理流程，返回导出文件路径
    pub async fn run(&self, problem_ids_file: &Path) -> Result<PathBuf> {
        logging::log_startup(self.settings.max_workers, &self.settings.model_id);

        let tasks = input::load_problem_refs(problem_ids_file)?;
        if tasks.is_empty() {
            bail!("问题ID文件中没有任何待处理题目");
        }
        logging::log_problems_loaded(tasks.len(), self.settings.max_workers);

        let fetcher = Arc::new(ProblemApiClient::new(&self.config)?);
        let solver = Arc::new(ArkClient::new(&self.config, self.settings.api_key.clone())?);

        let cancel = CancelToken::new();
        let scheduler = Scheduler::new(
            fetcher,
            solver,
            self.settings.templates.active(),
            self.settings.model_id.clone(),
            RetryPolicy::from_config(&self.config),
            self.settings.max_workers,
            cancel.clone(),
        )
        .context("提示词模板校验失败")?;

        // Ctrl+C 只置停止标志，已在执行的任务跑完当前步骤
        let ctrlc_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 收到停止信号，不再启动新任务...");
                ctrlc_cancel.cancel();
            }
        });

        let (progress, rx) = ProgressTracker::new(tasks.len());
        let reporter = tokio::spawn(report_progress(rx));

        let results = scheduler.run(tasks, Arc::clone(&progress)).await?;

        drop(progress);
        let _ = reporter.await;

        aggregator::log_summary(&results);
        let rows = aggregator::aggregate(&results);
        let exporter = JsonExporter::new(&self.config.output_dir, &self.config.output_filename);
        let path = exporter.export(&rows)?;

        let solved = results.iter().filter(|r| r.is_solved()).count();
        logging::print_final_stats(solved, results.len() - solved, results.len());
        Ok(path)
    }
}

/// 消费进度事件并输出日志，每个终态转移至少打印一次
async fn report_progress(mut rx: mpsc::UnboundedReceiver<ProgressState>) {
    let mut last_finished = 0;
    while let Some(state) = rx.recv().await {
        if state.finished() > last_finished {
            last_finished = state.finished();
            info!(
                "📈 进度: {}/{} ({:.0}%)，执行中 {}",
                state.finished(),
                state.total,
                state.percent(),
                state.in_flight
            );
        }
    }
}
