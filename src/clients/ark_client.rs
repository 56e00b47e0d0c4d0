//! 火山方舟大模型客户端
//!
//! 以 chat-completions 形式提交渲染好的提示词。启用多模态时，
//! 从提示词中提取题目图片 URL，作为 image_url 内容块一并发送。

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::clients::{check_status, classify_transport_error, ProblemSolver};
use crate::config::Config;
use crate::error::SolveError;
use crate::utils::text;

/// 火山方舟API客户端
pub struct ArkClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    enable_multimodal: bool,
}

impl ArkClient {
    /// 创建客户端；大模型推理耗时较长，超时放宽到 60 秒
    pub fn new(config: &Config, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            api_url: config.ark_api_url.clone(),
            api_key,
            enable_multimodal: config.enable_multimodal,
        })
    }
}

#[async_trait]
impl ProblemSolver for ArkClient {
    async fn solve(&self, prompt: &str, model_id: &str) -> Result<String, SolveError> {
        if self.api_key.is_empty() {
            return Err(SolveError::Fatal(
                "未提供API密钥，无法调用大模型".to_string(),
            ));
        }

        let content = build_content_parts(prompt, self.enable_multimodal);
        let payload = json!({
            "model": model_id,
            "messages": [{ "role": "user", "content": content }]
        });

        debug!("调用大模型，模型: {}", model_id);

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_transport_error(&self.api_url, e))?;
        let response = check_status(&self.api_url, response)?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SolveError::Transient(format!("解析响应失败: {}", e)))?;
        extract_answer(&body)
    }
}

/// 构建消息内容块：文本 + 提示词中出现的图片
fn build_content_parts(prompt: &str, enable_multimodal: bool) -> Vec<Value> {
    let mut parts = vec![json!({ "type": "text", "text": prompt })];
    if enable_multimodal {
        for url in text::extract_image_urls(prompt) {
            parts.push(json!({ "type": "image_url", "image_url": { "url": url } }));
        }
    }
    parts
}

/// 从响应中提取回答内容
fn extract_answer(body: &Value) -> Result<String, SolveError> {
    body.get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| SolveError::Transient("响应中缺少回答内容".to_string()))
}
