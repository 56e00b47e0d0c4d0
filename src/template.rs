//! 提示词模板
//!
//! 模板渲染是纯文本替换：占位符限定在固定识别集合内，通过显式的
//! 字段映射查找求值，单遍扫描，插入的字段值不会被再次解析。
//! 题目文本来自远程，不允许任何形式的代码求值。
//!
//! 模板库是名称到模板的映射，恰好有一个"活动"模板；未选择时
//! 回退到内置默认模板。

use std::collections::{BTreeMap, HashMap};

use phf::phf_set;
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// 识别的占位符集合
pub static RECOGNIZED_PLACEHOLDERS: phf::Set<&'static str> =
    phf_set! {"subject", "grade", "type", "question", "correctAnswers"};

/// 内置默认模板名称
pub const DEFAULT_TEMPLATE_NAME: &str = "默认模板";

/// 内置默认提示词模板
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"你作为一名专业的<subject>{subject}</subject><grade>{grade}</grade>老师，要解答<type>{type}</type>题目。

题目是：<question>{question}</question>

请按照考试答题标准，给出详细的解题过程，并得出最终答案。在完成解题后，将解得的答案与标准答案<correctAnswers>{correctAnswers}</correctAnswers>进行对比，确保作答正确，如果答案不一致需要重新作答。

【重要】：本题目可能包含图片和选项。如果你看到了图片，请首先详细描述图片中的内容，然后再进行解题。图片可能出现在题目或标准答案中，请仔细观察并利用图片中的信息进行解答。如果你没有看到图片，请明确说明。

如果题目是选择题，请分析每个选项，说明为什么选择或排除该选项。最终答案应该是选项的字母（如A、B、C、D）。

请在<解题>标签内写下详细的解题过程和最终答案，在<对比>标签内说明答案与标准答案对比的情况，是否一致。

<解题>

[在此详细写出解题过程和最终答案]

</解题>

请在<讲解>标签内写下本题考察的{grade}{subject}知识点或考点，以及解题思路。

<讲解>

[在此详细写出本题考察的知识点或考点以及解题思路等等有助于学生理解这道题的信息]

</讲解>

请确保解题过程详细，符合考试答题规范，答案准确。"#;

/// 提示词模板
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub body: String,
}

/// 模板体解析出的片段
enum Segment {
    Literal(String),
    Field(String),
}

impl Template {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// 内置默认模板
    pub fn built_in() -> Self {
        Self::new(DEFAULT_TEMPLATE_NAME, DEFAULT_PROMPT_TEMPLATE)
    }

    /// 校验模板：花括号配对且所有占位符都在识别集合内
    ///
    /// 在任何任务启动前调用，模板错误会使每个任务以相同方式失败，
    /// 因此直接阻止整批任务。
    pub fn validate(&self) -> Result<(), TemplateError> {
        for segment in self.parse()? {
            if let Segment::Field(name) = segment {
                if !RECOGNIZED_PLACEHOLDERS.contains(name.as_str()) {
                    return Err(self.invalid(format!("引用了未识别的占位符 {{{}}}", name)));
                }
            }
        }
        Ok(())
    }

    /// 渲染模板
    ///
    /// 单遍扫描模板体，占位符通过 `fields` 查找替换；`{{` 和 `}}`
    /// 转义为字面花括号。字段值直接拼入输出，不参与占位符解析。
    pub fn render(&self, fields: &HashMap<&'static str, String>) -> Result<String, TemplateError> {
        let segments = self.parse()?;
        let mut out = String::with_capacity(self.body.len());
        for segment in segments {
            match segment {
                Segment::Literal(lit) => out.push_str(&lit),
                Segment::Field(name) => {
                    if !RECOGNIZED_PLACEHOLDERS.contains(name.as_str()) {
                        return Err(self.invalid(format!("引用了未识别的占位符 {{{}}}", name)));
                    }
                    match fields.get(name.as_str()) {
                        Some(value) => out.push_str(value),
                        None => {
                            return Err(TemplateError::UnresolvedPlaceholder {
                                template: self.name.clone(),
                                name,
                            })
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn parse(&self) -> Result<Vec<Segment>, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = self.body.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    if chars.peek() == Some(&'{') {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) if ch.is_ascii_alphanumeric() => name.push(ch),
                            Some(ch) => {
                                return Err(
                                    self.invalid(format!("占位符包含非法字符 '{}'", ch))
                                )
                            }
                            None => return Err(self.invalid("花括号未闭合".to_string())),
                        }
                    }
                    if name.is_empty() {
                        return Err(self.invalid("空占位符".to_string()));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name));
                }
                '}' => {
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(self.invalid("花括号不配对".to_string()));
                    }
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    fn invalid(&self, reason: String) -> TemplateError {
        TemplateError::InvalidTemplate {
            template: self.name.clone(),
            reason,
        }
    }
}

/// 模板库
///
/// 所有操作都是对整个映射的原子修改；始终保持至少一个模板，
/// 且活动模板始终存在于映射中。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStore {
    templates: BTreeMap<String, String>,
    active: String,
}

impl Default for TemplateStore {
    fn default() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(
            DEFAULT_TEMPLATE_NAME.to_string(),
            DEFAULT_PROMPT_TEMPLATE.to_string(),
        );
        Self {
            templates,
            active: DEFAULT_TEMPLATE_NAME.to_string(),
        }
    }
}

impl TemplateStore {
    /// 从已保存的模板映射恢复
    ///
    /// 空映射回退到内置默认模板；活动名称不存在时回退到第一个模板。
    pub fn from_saved(templates: BTreeMap<String, String>, active: Option<String>) -> Self {
        if templates.is_empty() {
            return Self::default();
        }
        let active = active
            .filter(|name| templates.contains_key(name))
            .or_else(|| templates.keys().next().cloned())
            .unwrap_or_else(|| DEFAULT_TEMPLATE_NAME.to_string());
        Self { templates, active }
    }

    /// 新建模板，名称不能重复，模板体必须通过校验
    pub fn create(&mut self, name: &str, body: &str) -> Result<(), TemplateError> {
        if self.templates.contains_key(name) {
            return Err(TemplateError::DuplicateName(name.to_string()));
        }
        Template::new(name, body).validate()?;
        self.templates.insert(name.to_string(), body.to_string());
        Ok(())
    }

    /// 更新已有模板的内容
    pub fn update(&mut self, name: &str, body: &str) -> Result<(), TemplateError> {
        if !self.templates.contains_key(name) {
            return Err(TemplateError::UnknownTemplate(name.to_string()));
        }
        Template::new(name, body).validate()?;
        self.templates.insert(name.to_string(), body.to_string());
        Ok(())
    }

    /// 重命名模板
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), TemplateError> {
        if !self.templates.contains_key(old) {
            return Err(TemplateError::UnknownTemplate(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.templates.contains_key(new) {
            return Err(TemplateError::DuplicateName(new.to_string()));
        }
        if let Some(body) = self.templates.remove(old) {
            self.templates.insert(new.to_string(), body);
        }
        if self.active == old {
            self.active = new.to_string();
        }
        Ok(())
    }

    /// 删除模板，最后一个模板不可删除
    pub fn delete(&mut self, name: &str) -> Result<(), TemplateError> {
        if !self.templates.contains_key(name) {
            return Err(TemplateError::UnknownTemplate(name.to_string()));
        }
        if self.templates.len() == 1 {
            return Err(TemplateError::LastTemplate);
        }
        self.templates.remove(name);
        if self.active == name {
            // BTreeMap 非空，直接取第一个
            if let Some(first) = self.templates.keys().next() {
                self.active = first.clone();
            }
        }
        Ok(())
    }

    /// 设置活动模板
    pub fn set_active(&mut self, name: &str) -> Result<(), TemplateError> {
        if !self.templates.contains_key(name) {
            return Err(TemplateError::UnknownTemplate(name.to_string()));
        }
        self.active = name.to_string();
        Ok(())
    }

    /// 当前活动模板
    pub fn active(&self) -> Template {
        match self.templates.get(&self.active) {
            Some(body) => Template::new(self.active.clone(), body.clone()),
            None => Template::built_in(),
        }
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    pub fn templates(&self) -> &BTreeMap<String, String> {
        &self.templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_fields() -> HashMap<&'static str, String> {
        let mut fields = HashMap::new();
        fields.insert("subject", "数学".to_string());
        fields.insert("grade", "小学".to_string());
        fields.insert("type", "单选题".to_string());
        fields.insert("question", "1+1=?".to_string());
        fields.insert("correctAnswers", "2".to_string());
        fields
    }

    #[test]
    fn default_template_is_valid() {
        Template::built_in().validate().expect("内置模板应通过校验");
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = Template::built_in();
        let fields = full_fields();
        let first = template.render(&fields).unwrap();
        let second = template.render(&fields).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("数学"));
        assert!(first.contains("1+1=?"));
    }

    #[test]
    fn unknown_placeholder_is_invalid() {
        let template = Template::new("t", "题目: {question}, 难度: {difficulty}");
        let err = template.validate().unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTemplate { .. }));
    }

    #[test]
    fn missing_field_is_unresolved() {
        let template = Template::new("t", "{question}");
        let err = template.render(&HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnresolvedPlaceholder {
                template: "t".to_string(),
                name: "question".to_string(),
            }
        );
    }

    #[test]
    fn unclosed_brace_is_invalid() {
        let template = Template::new("t", "{question");
        assert!(matches!(
            template.validate().unwrap_err(),
            TemplateError::InvalidTemplate { .. }
        ));
    }

    #[test]
    fn escaped_braces_render_literally() {
        let template = Template::new("t", "{{question}} = {question}");
        let out = template.render(&full_fields()).unwrap();
        assert_eq!(out, "{question} = 1+1=?");
    }

    #[test]
    fn field_values_are_not_reinterpreted() {
        let mut fields = full_fields();
        // 题目文本里混入占位符语法也只是普通文本
        fields.insert("question", "{correctAnswers}".to_string());
        let template = Template::new("t", "{question}");
        assert_eq!(template.render(&fields).unwrap(), "{correctAnswers}");
    }

    #[test]
    fn store_crud_keeps_one_active() {
        let mut store = TemplateStore::default();
        store.create("精简模板", "{question}").unwrap();
        store.set_active("精简模板").unwrap();
        assert_eq!(store.active().name, "精简模板");

        assert_eq!(
            store.create("精简模板", "{question}").unwrap_err(),
            TemplateError::DuplicateName("精简模板".to_string())
        );

        store.rename("精简模板", "极简模板").unwrap();
        assert_eq!(store.active().name, "极简模板");

        store.delete("极简模板").unwrap();
        assert_eq!(store.active().name, DEFAULT_TEMPLATE_NAME);

        assert_eq!(
            store.delete(DEFAULT_TEMPLATE_NAME).unwrap_err(),
            TemplateError::LastTemplate
        );
    }

    #[test]
    fn store_rejects_invalid_body() {
        let mut store = TemplateStore::default();
        let err = store.create("坏模板", "{bogus}").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTemplate { .. }));
    }
}
