//! 远程客户端抽象
//!
//! 调度器只依赖这里的两个能力 trait；HTTP 实现与错误分类对上层透明。
//! 状态码分类约定：429 视为限流、5xx 与超时/连接失败视为临时错误，
//! 其余非成功状态视为致命错误。

use async_trait::async_trait;

use crate::error::SolveError;
use crate::model::ProblemRecord;

pub mod ark_client;
pub mod problem_client;

pub use ark_client::ArkClient;
pub use problem_client::ProblemApiClient;

/// 题目获取能力：按ID返回题目详情
#[async_trait]
pub trait ProblemFetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<ProblemRecord, SolveError>;
}

/// 大模型解题能力：提示词 → 模型回答
#[async_trait]
pub trait ProblemSolver: Send + Sync {
    async fn solve(&self, prompt: &str, model_id: &str) -> Result<String, SolveError>;
}

/// HTTP 状态码 → 错误分类，成功状态返回 None
pub(crate) fn classify_status(
    endpoint: &str,
    status: u16,
    retry_after: Option<u64>,
) -> Option<SolveError> {
    match status {
        200..=299 => None,
        429 => Some(SolveError::RateLimited { retry_after }),
        500..=599 => Some(SolveError::Transient(format!(
            "服务端错误 ({}): HTTP {}",
            endpoint, status
        ))),
        _ => Some(SolveError::Fatal(format!(
            "请求被拒绝 ({}): HTTP {}",
            endpoint, status
        ))),
    }
}

/// 传输层错误分类：超时与连接失败可重试，其余视为致命
pub(crate) fn classify_transport_error(endpoint: &str, err: reqwest::Error) -> SolveError {
    if err.is_timeout() || err.is_connect() {
        SolveError::Transient(format!("请求超时或连接失败 ({}): {}", endpoint, err))
    } else {
        SolveError::Fatal(format!("请求失败 ({}): {}", endpoint, err))
    }
}

/// 检查响应状态，非成功状态映射为对应错误
pub(crate) fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, SolveError> {
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    match classify_status(endpoint, response.status().as_u16(), retry_after) {
        Some(err) => Err(err),
        None => Ok(response),
    }
}
