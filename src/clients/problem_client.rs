//! 问题API客户端
//!
//! 从远程问题API获取题目详情，并整理为 `ProblemRecord`：
//! 题干拼接子题内容，标准答案按字段优先级逐级回退，学科/学段/题型
//! ID 转换为显示名称。

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::clients::{check_status, classify_transport_error, ProblemFetcher};
use crate::config::Config;
use crate::error::SolveError;
use crate::model::maps;
use crate::model::ProblemRecord;

/// 问题API客户端
pub struct ProblemApiClient {
    http: reqwest::Client,
    api_url: String,
}

impl ProblemApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_url: config.problem_api_url.clone(),
        })
    }
}

#[async_trait]
impl ProblemFetcher for ProblemApiClient {
    async fn fetch(&self, id: &str) -> Result<ProblemRecord, SolveError> {
        let payload = json!({ "ids": [id] });
        debug!("请求题目详情: {}", id);

        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json;charset=utf-8")
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_transport_error(&self.api_url, e))?;
        let response = check_status(&self.api_url, response)?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SolveError::Transient(format!("解析响应失败: {}", e)))?;

        let problems = body
            .get("problems")
            .and_then(Value::as_array)
            .ok_or_else(|| SolveError::Transient("响应中缺少 problems 字段".to_string()))?;

        let raw = problems
            .iter()
            .find(|p| p.get("id").and_then(Value::as_str) == Some(id))
            .or_else(|| problems.first())
            .ok_or_else(|| SolveError::NotFound { id: id.to_string() })?;

        Ok(parse_record(id, raw))
    }
}

/// 将原始题目 JSON 整理为 `ProblemRecord`
pub(crate) fn parse_record(id: &str, raw: &Value) -> ProblemRecord {
    let subject_id = raw.get("subjectId").and_then(Value::as_u64).unwrap_or(0);
    let stage_id = raw.get("stageId").and_then(Value::as_u64).unwrap_or(0);
    let type_id = raw.get("type").and_then(Value::as_str).unwrap_or("");

    ProblemRecord {
        id: raw
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string(),
        question: format_body(raw),
        correct_answer: extract_answer(raw),
        subject: maps::subject_name(subject_id).to_string(),
        grade: maps::stage_name(stage_id).to_string(),
        problem_type: maps::type_name(type_id).to_string(),
    }
}

/// 题干 = 主题干 + 各子题题干，转义反斜杠并把双引号降级为单引号
fn format_body(raw: &Value) -> String {
    let mut body = raw
        .get("body")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if let Some(subproblems) = raw.get("subproblems").and_then(Value::as_array) {
        for sub in subproblems {
            if let Some(sub_body) = sub.get("body").and_then(Value::as_str) {
                body.push_str(sub_body);
            }
        }
    }
    body.replace('\\', "\\\\").replace('"', "'")
}

/// 按优先级提取标准答案：
/// correctAnswers → correctAnswer → 选择题正确选项字母 → explains →
/// answer → extendedBlanks → "答案不可用"
fn extract_answer(raw: &Value) -> String {
    if let Some(v) = non_empty(raw.get("correctAnswers")) {
        return answer_to_string(v);
    }
    if let Some(v) = non_empty(raw.get("correctAnswer")) {
        return answer_to_string(v);
    }
    if let Some(letters) = correct_choice_letters(raw) {
        return letters;
    }
    if let Some(v) = non_empty(raw.get("explains")) {
        return answer_to_string(v);
    }
    if let Some(v) = non_empty(raw.get("answer")) {
        return answer_to_string(v);
    }
    if let Some(blanks) = extended_blanks(raw) {
        return blanks;
    }
    "答案不可用".to_string()
}

fn non_empty(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    })
}

fn answer_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            })
            .collect::<Vec<_>>()
            .join("；"),
        other => other.to_string(),
    }
}

/// 单选/多选题：取第一组选项中 correct 为真的选项序号字母
fn correct_choice_letters(raw: &Value) -> Option<String> {
    let type_id = raw.get("type").and_then(Value::as_str)?;
    if type_id != "single_choice" && type_id != "multi_choice" {
        return None;
    }
    let group = raw
        .get("choices")
        .and_then(Value::as_array)?
        .first()?
        .as_array()?;
    let letters: Vec<String> = group
        .iter()
        .enumerate()
        .filter(|(_, choice)| {
            choice
                .get("correct")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .map(|(i, _)| char::from(b'A' + i as u8).to_string())
        .collect();
    if letters.is_empty() {
        None
    } else {
        Some(letters.join(", "))
    }
}

/// 填空题：各空取第一个参考答案
fn extended_blanks(raw: &Value) -> Option<String> {
    let blanks = raw.get("extendedBlanks").and_then(Value::as_array)?;
    let answers: Vec<String> = blanks
        .iter()
        .filter_map(|blank| blank.as_array()?.first().map(answer_to_string))
        .collect();
    if answers.is_empty() {
        None
    } else {
        Some(answers.join(", "))
    }
}
