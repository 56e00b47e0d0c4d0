//! 文本处理工具
//!
//! 处理题目和答案中的 HTML 标记与 LaTeX 公式：
//! - 进入提示词前的标准答案预处理
//! - 导出前的公式可读性格式化
//! - 题目中图片 URL 的提取（多模态调用用）

use regex::Regex;

/// LaTeX 符号替换表
const LATEX_SYMBOLS: &[(&str, &str)] = &[
    ("\\square", "□"),
    ("\\bigcirc", "○"),
    ("\\gt", ">"),
    ("\\lt", "<"),
    ("\\ge", "≥"),
    ("\\le", "≤"),
    ("\\neq", "≠"),
    ("\\times", "×"),
    ("\\div", "÷"),
    ("\\pm", "±"),
    ("\\cdot", "·"),
    ("\\sum", "∑"),
    ("\\prod", "∏"),
    ("\\int", "∫"),
    ("\\infty", "∞"),
    ("\\pi", "π"),
    ("\\alpha", "α"),
    ("\\beta", "β"),
    ("\\gamma", "γ"),
    ("\\delta", "δ"),
    ("\\theta", "θ"),
    ("\\lambda", "λ"),
    ("\\mu", "μ"),
    ("\\sigma", "σ"),
    ("\\omega", "ω"),
];

fn replace_all(text: &str, pattern: &str, replacement: &str) -> String {
    match Regex::new(pattern) {
        Ok(re) => re.replace_all(text, replacement).into_owned(),
        Err(_) => text.to_string(),
    }
}

/// 提取文本中 `<img src="...">` 的图片 URL
pub fn extract_image_urls(text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    if let Ok(re) = Regex::new(r#"<img\s+[^>]*src="([^"]+)""#) {
        for cap in re.captures_iter(text) {
            if let Some(url) = cap.get(1) {
                if !url.as_str().is_empty() {
                    urls.push(url.as_str().to_string());
                }
            }
        }
    }
    urls
}

/// 移除所有 HTML 标签
pub fn strip_html(text: &str) -> String {
    replace_all(text, r"<[^>]*>", "")
}

/// 预处理标准答案，用于嵌入提示词
///
/// 移除 HTML 标签、规范化公式定界符；如果答案包含图片，
/// 附加图片链接说明；多个答案（分号分隔）逐段清理。
pub fn preprocess_correct_answer(answer: &str) -> String {
    if answer.is_empty() {
        return "未提供标准答案".to_string();
    }

    let image_urls = extract_image_urls(answer);

    let mut clean = strip_html(answer);
    clean = clean.replace("$ ", "$").replace(" $", "$");

    if !image_urls.is_empty() {
        clean.push_str("\n[答案包含图片，请根据文字部分进行对比]");
        for (i, url) in image_urls.iter().enumerate() {
            clean.push_str(&format!("\n图片{}链接: {}", i + 1, url));
        }
    }

    if clean.contains('；') {
        let parts: Vec<&str> = clean
            .split('；')
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        clean = parts.join("；");
    }

    clean.trim().to_string()
}

/// 将包含 LaTeX/KaTeX 公式的文本转换为更易读的纯文本
pub fn format_latex_for_readability(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    // 保留换行，图片降级为占位符
    let mut out = text.replace("<br />", "\n").replace("<br>", "\n");
    out = replace_all(
        &out,
        r#"(?:<div>\s*)?<img\s+[^>]*src="[^"]+"[^>]*>(?:\s*</div>)?"#,
        "[图片]",
    );

    // 行内公式定界符 \( \)
    out = replace_all(&out, r"\\[(（]([^\\]*)\\[)）]", "$1");
    out = out.replace("\\cdots\\cdots", "......");
    out = out.replace("\\cdots", "......");

    for (pattern, replacement) in LATEX_SYMBOLS {
        out = out.replace(pattern, replacement);
    }

    // 根式与分式
    out = replace_all(&out, r"\\sqrt\s*\{\s*([^{}]*)\s*\}", "√$1");
    out = replace_all(&out, r"\\sqrt\s+([a-zA-Z0-9]+)", "√$1");
    out = replace_all(&out, r"\\frac\s*\{\s*([^{}]*)\s*\}\s*\{\s*([^{}]*)\s*\}", "$1/$2");

    // 括号命令
    out = replace_all(&out, r"\\left\s*", "");
    out = replace_all(&out, r"\\right\s*", "");

    // 数学模式定界符，保留内容
    out = replace_all(&out, r"\$([^$]*)\$", "$1");

    // 上下标
    out = replace_all(&out, r"_\{\s*([^{}]*)\s*\}", "_$1");
    out = replace_all(&out, r"\^\{\s*([^{}]*)\s*\}", "^$1");

    // 文本命令
    out = replace_all(&out, r"\\text\{\s*([^{}]*)\s*\}", "$1");
    out = replace_all(&out, r"\\textbf\{\s*([^{}]*)\s*\}", "$1");
    out = replace_all(&out, r"\\textit\{\s*([^{}]*)\s*\}", "$1");
    out = replace_all(&out, r"\\mathrm\{\s*([^{}]*)\s*\}", "$1");

    // 逐行压缩空白，保留换行
    out = out
        .split('\n')
        .map(|line| replace_all(line, r"\s+", " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");

    // 运算符两侧留空格
    out = replace_all(&out, r"(\d+)([+\-×÷=])", "$1 $2");
    out = replace_all(&out, r"([+\-×÷=])(\d+)", "$1 $2");

    // 中文分号后换行，使多个答案分行显示
    out = out.replace('；', "；\n");

    // 方框和圆圈降级为填空符号
    out = out.replace('□', "[  ]");
    out = out.replace('○', "(  )");

    out
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
