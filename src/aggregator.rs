//! 结果汇总
//!
//! 把调度器产出的结果向量转换为导出行。失败与取消的任务同样占一行，
//! 回答列写明原因，保证导出行数与输入任务数一致，便于核对遗漏。

use tracing::info;

use crate::model::{ExportRow, SolveOutcome, SolveResult};
use crate::utils::text;

/// 结果向量 → 导出行，顺序与输入一致
pub fn aggregate(results: &[SolveResult]) -> Vec<ExportRow> {
    results.iter().map(to_row).collect()
}

fn to_row(result: &SolveResult) -> ExportRow {
    let llm_answer = match &result.outcome {
        SolveOutcome::Solved { answer } => text::format_latex_for_readability(answer),
        SolveOutcome::Failed { reason } => format!("解题失败: {}", reason),
        SolveOutcome::Cancelled => "任务已取消，未执行".to_string(),
    };

    match &result.record {
        Some(record) => ExportRow {
            id: record.id.clone(),
            question: record.question.clone(),
            correct_answer: if record.correct_answer.is_empty() {
                "答案不可用".to_string()
            } else {
                record.correct_answer.clone()
            },
            subject: record.subject.clone(),
            grade: record.grade.clone(),
            problem_type: record.problem_type.clone(),
            llm_answer,
        },
        // 题目详情都没拿到，只剩任务引用里的信息
        None => ExportRow {
            id: result.task.id.clone(),
            question: String::new(),
            correct_answer: "答案不可用".to_string(),
            subject: result.task.subject.clone(),
            grade: result.task.stage.clone(),
            problem_type: String::new(),
            llm_answer,
        },
    }
}

/// 汇总统计并输出结果日志
pub fn log_summary(results: &[SolveResult]) {
    let solved = results.iter().filter(|r| r.is_solved()).count();
    let cancelled = results
        .iter()
        .filter(|r| matches!(r.outcome, SolveOutcome::Cancelled))
        .count();
    let failed = results.len() - solved - cancelled;
    info!(
        "📊 处理完成: 共 {} 题，成功 {}，失败 {}，取消 {}",
        results.len(),
        solved,
        failed,
        cancelled
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProblemRecord, ProblemRef};

    fn make_ref(id: &str) -> ProblemRef {
        ProblemRef {
            stage: "小学".to_string(),
            subject: "数学".to_string(),
            id: id.to_string(),
        }
    }

    fn make_record(id: &str) -> ProblemRecord {
        ProblemRecord {
            id: id.to_string(),
            question: "1+1=?".to_string(),
            correct_answer: "2".to_string(),
            subject: "数学".to_string(),
            grade: "小学".to_string(),
            problem_type: "单选题".to_string(),
        }
    }

    #[test]
    fn every_result_becomes_a_row() {
        let results = vec![
            SolveResult {
                task: make_ref("p1"),
                record: Some(make_record("p1")),
                outcome: SolveOutcome::Solved {
                    answer: "答案是2".to_string(),
                },
            },
            SolveResult {
                task: make_ref("p2"),
                record: None,
                outcome: SolveOutcome::Failed {
                    reason: "获取题目失败: 未找到".to_string(),
                },
            },
            SolveResult {
                task: make_ref("p3"),
                record: None,
                outcome: SolveOutcome::Cancelled,
            },
        ];

        let rows = aggregate(&results);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].llm_answer, "答案是2");
        assert!(rows[1].llm_answer.starts_with("解题失败:"));
        assert_eq!(rows[2].llm_answer, "任务已取消，未执行");
        // 失败行保留任务引用里的层级信息
        assert_eq!(rows[1].id, "p2");
        assert_eq!(rows[1].grade, "小学");
        assert_eq!(rows[1].correct_answer, "答案不可用");
    }

    #[test]
    fn empty_correct_answer_is_marked_unavailable() {
        let mut record = make_record("p1");
        record.correct_answer = String::new();
        let results = vec![SolveResult {
            task: make_ref("p1"),
            record: Some(record),
            outcome: SolveOutcome::Solved {
                answer: "2".to_string(),
            },
        }];
        assert_eq!(aggregate(&results)[0].correct_answer, "答案不可用");
    }

    #[test]
    fn solved_answer_gets_latex_formatting() {
        let results = vec![SolveResult {
            task: make_ref("p1"),
            record: Some(make_record("p1")),
            outcome: SolveOutcome::Solved {
                answer: r"结果为 \frac{1}{2}".to_string(),
            },
        }];
        let rows = aggregate(&results);
        assert!(rows[0].llm_answer.contains("1/2"));
    }
}
