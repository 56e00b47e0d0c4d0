//! 结果导出
//!
//! 导出行以 JSON 数组形式写入带时间戳的文件，同一目录多次运行
//! 互不覆盖。写出的是已汇总的 `ExportRow`，不含任何密钥信息。

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::model::ExportRow;

/// 导出能力：汇总行 → 持久化文件
pub trait ExportSink {
    fn export(&self, rows: &[ExportRow]) -> Result<PathBuf>;
}

/// JSON 文件导出器
pub struct JsonExporter {
    output_dir: PathBuf,
    /// 基础文件名（不含扩展名），实际文件名附加时间戳
    base_name: String,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>, filename: &str) -> Self {
        let base_name = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("problem_solutions")
            .to_string();
        Self {
            output_dir: output_dir.into(),
            base_name,
        }
    }
}

impl ExportSink for JsonExporter {
    fn export(&self, rows: &[ExportRow]) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("创建输出目录失败: {}", self.output_dir.display()))?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .output_dir
            .join(format!("{}_{}.json", self.base_name, timestamp));

        let file = fs::File::create(&path)
            .with_context(|| format!("创建输出文件失败: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, rows)
            .with_context(|| format!("写入结果失败: {}", path.display()))?;
        // 显式刷新缓冲区，Drop 中的刷新会丢弃 I/O 错误
        writer.flush()
            .with_context(|| format!("写入结果失败: {}", path.display()))?;

        info!("💾 已导出 {} 条结果到 {}", rows.len(), path.display());
        Ok(path)
    }
}
