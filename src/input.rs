//! 问题ID文件解析
//!
//! 输入为嵌套 JSON：学段 → 学科 → 问题ID列表，展平为调度器消费的
//! `Vec<ProblemRef>`。展平顺序为文件中的深度优先顺序
//! （serde_json 的 preserve_order 特性保证对象键序稳定）。

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::model::ProblemRef;

/// 从 JSON 文件加载问题引用列表
pub fn load_problem_refs(path: &Path) -> Result<Vec<ProblemRef>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("读取问题ID文件失败: {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| "问题ID文件不是有效的 JSON")?;
    flatten(&value)
}

/// 展平嵌套结构为任务列表
pub fn flatten(value: &Value) -> Result<Vec<ProblemRef>> {
    let stages = match value.as_object() {
        Some(map) => map,
        None => bail!("问题ID文件顶层应为对象: 学段 → 学科 → ID列表"),
    };

    let mut refs = Vec::new();
    for (stage, subjects) in stages {
        let subjects = subjects
            .as_object()
            .with_context(|| format!("学段 {} 的值应为对象", stage))?;
        for (subject, ids) in subjects {
            let ids = ids
                .as_array()
                .with_context(|| format!("学科 {} 的值应为ID数组", subject))?;
            for id in ids {
                let id = id
                    .as_str()
                    .with_context(|| format!("学科 {} 下存在非字符串的问题ID", subject))?;
                refs.push(ProblemRef {
                    stage: stage.clone(),
                    subject: subject.clone(),
                    id: id.to_string(),
                });
            }
        }
    }
    Ok(refs)
}
