//! 错误类型定义
//!
//! 按可重试性划分远程调用错误：
//! - `NotFound` / `Fatal`：终态错误，不重试，仅使当前任务失败
//! - `RateLimited` / `Transient`：临时错误，按退避策略重试
//!
//! 模板错误和凭据错误属于前置条件错误，在批处理开始前暴露，
//! 阻止整批任务启动。

use thiserror::Error;

/// 远程调用错误（获取题目 / 调用大模型）
#[derive(Debug, Error)]
pub enum SolveError {
    /// 题目在远程不存在，重试无意义
    #[error("题目不存在: {id}")]
    NotFound { id: String },

    /// 请求频率限制（HTTP 429），可在等待后重试
    #[error("请求频率限制 (建议等待: {retry_after:?} 秒)")]
    RateLimited { retry_after: Option<u64> },

    /// 临时错误（超时、连接失败、5xx），可重试
    #[error("临时错误: {0}")]
    Transient(String),

    /// 致命错误（凭据无效、请求格式错误等），不重试
    #[error("致命错误: {0}")]
    Fatal(String),
}

impl SolveError {
    /// 是否值得重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SolveError::RateLimited { .. } | SolveError::Transient(_)
        )
    }
}

/// 模板错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// 模板引用了识别集合之外的占位符，或花括号不配对
    #[error("模板 {template} 无效: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// 模板引用的占位符在字段映射中没有对应的值
    #[error("模板 {template} 的占位符 {{{name}}} 没有对应的字段值")]
    UnresolvedPlaceholder { template: String, name: String },

    /// 模板名称已存在
    #[error("模板名称已存在: {0}")]
    DuplicateName(String),

    /// 模板不存在
    #[error("模板不存在: {0}")]
    UnknownTemplate(String),

    /// 至少保留一个模板
    #[error("至少保留一个模板")]
    LastTemplate,
}

/// 凭据存储错误
#[derive(Debug, Error)]
pub enum CredentialError {
    /// 加密过程失败
    #[error("加密失败")]
    Encryption,

    /// 密文损坏或密钥不匹配
    #[error("解密失败: 密文损坏或密钥不匹配")]
    Decryption,

    /// 密钥文件读写失败
    #[error("密钥文件读写失败: {0}")]
    Persistence(#[from] std::io::Error),
}
