//! 核心数据类型
//!
//! 生命周期：`ProblemRef` 列表在每次运行时从输入文件构建一次，由调度器
//! 消费一次；每个 `ProblemRef` 恰好产生一个 `SolveResult`，产生后不再变更。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::utils::text;

/// 待处理题目的轻量引用：层级路径（学段/学科）+ 题目ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRef {
    /// 学段（如"小学"、"初中"）
    pub stage: String,
    /// 学科（如"数学"、"物理"）
    pub subject: String,
    /// 题目ID
    pub id: String,
}

/// 从远程获取的题目详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: String,
    /// 题干（含子题内容）
    pub question: String,
    /// 标准答案
    pub correct_answer: String,
    pub subject: String,
    /// 学段名称
    pub grade: String,
    /// 题型名称
    pub problem_type: String,
}

impl ProblemRecord {
    /// 构建提示词渲染所需的字段映射
    ///
    /// 标准答案在进入提示词前做预处理（去HTML、规范化公式、
    /// 附加图片说明），避免原始标记污染提示词。
    pub fn prompt_fields(&self) -> HashMap<&'static str, String> {
        let mut fields = HashMap::new();
        fields.insert("subject", self.subject.clone());
        fields.insert("grade", self.grade.clone());
        fields.insert("type", self.problem_type.clone());
        fields.insert("question", self.question.clone());
        fields.insert(
            "correctAnswers",
            text::preprocess_correct_answer(&self.correct_answer),
        );
        fields
    }
}

/// 单个任务的最终结果
///
/// 每个任务恰好产生一个，产生后不再变更。失败结果保留原始
/// `ProblemRef` 以便追溯需要重跑的题目。
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// 原始任务引用
    pub task: ProblemRef,
    /// 题目详情（获取失败时为 None）
    pub record: Option<ProblemRecord>,
    pub outcome: SolveOutcome,
}

/// 任务结局
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// 解题成功
    Solved { answer: String },
    /// 终态失败（重试耗尽或不可重试错误）
    Failed { reason: String },
    /// 收到停止信号，任务未开始执行
    Cancelled,
}

impl SolveResult {
    pub fn is_solved(&self) -> bool {
        matches!(self.outcome, SolveOutcome::Solved { .. })
    }
}

/// 导出行，列名与导出协作方约定的表头一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub id: String,
    pub question: String,
    pub correct_answer: String,
    pub subject: String,
    pub grade: String,
    #[serde(rename = "type")]
    pub problem_type: String,
    pub llm_answer: String,
}
