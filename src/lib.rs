//! # Auto Problem Solver
//!
//! 自动化习题批处理：从远程问题API获取题目，渲染提示词模板，
//! 调用大模型解答，并把结果汇总导出。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础层（Model / Utils）
//! - `model/` - 任务引用、题目详情、结果与导出行等核心类型
//! - `utils/` - 文本处理（HTML/LaTeX）与日志工具
//!
//! ### ② 能力层（Clients / Template / Credential）
//! - `clients/` - 问题API与大模型客户端，错误统一分类
//! - `template` - 提示词模板的校验、渲染与模板库管理
//! - `credential` - API 密钥的加密存取，明文只存在于内存
//!
//! ### ③ 调度层（Scheduler）
//! - `scheduler/` - 信号量限流的并发调度、重试状态机、进度跟踪
//!
//! ### ④ 编排层（App）
//! - `app` - 设置加载、流程编排、结果汇总与导出
//!
//! ## 模块结构

pub mod aggregator;
pub mod app;
pub mod clients;
pub mod config;
pub mod credential;
pub mod error;
pub mod export;
pub mod input;
pub mod model;
pub mod scheduler;
pub mod settings;
pub mod template;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use clients::{ProblemFetcher, ProblemSolver};
pub use config::Config;
pub use error::{CredentialError, SolveError, TemplateError};
pub use model::{ExportRow, ProblemRecord, ProblemRef, SolveOutcome, SolveResult};
pub use scheduler::{CancelToken, ProgressState, ProgressTracker, RetryPolicy, Scheduler};
pub use template::{Template, TemplateStore};
