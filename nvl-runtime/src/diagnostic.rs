//! # 诊断模块
//!
//! 场景脚本的静态检查与资源引用提取，不依赖 IO 与会话。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 复用行解析器，不重复解析逻辑

use serde::Serialize;

use crate::script::directive::Directive;
use crate::script::parser::{ParseContext, parse_line};

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 场景名 / 文件路径
    pub scene: String,
    /// 行号（可定位时，从 1 开始）
    pub line: Option<usize>,
    /// 诊断消息
    pub message: String,
    /// 详情（可选，如原始行内容）
    pub detail: Option<String>,
}

impl Diagnostic {
    /// 创建错误诊断
    pub fn error(scene: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            scene: scene.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建警告诊断
    pub fn warn(scene: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            scene: scene.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建信息诊断
    pub fn info(scene: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            scene: scene.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 设置行号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.scene)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {detail}")?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count()
    }

    pub fn warn_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warn)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// 资源种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceType {
    /// 场景背景图（folder/file）
    SceneImage,
    /// 角色图库目录
    CharacterBank,
    /// 背景音乐
    Music,
    /// 音效
    Sound,
    /// 其他场景脚本（.swap 目标）
    Scene,
}

/// 一条资源引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReference {
    pub kind: ResourceType,
    pub name: String,
    pub line: usize,
}

/// 静态检查一个场景脚本
///
/// 逐行解析并模拟文本块/选项块标志，收集：
/// - 解析错误（运行时会致命）
/// - 未识别的行（运行时按空操作跳过——这里显式提醒）
/// - 未闭合的文本块/选项块
/// - 没有对应分支的选项编号
pub fn analyze_scene(scene: &str, text: &str) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let mut ctx = ParseContext {
        reading: true,
        ..ParseContext::default()
    };
    let mut choice_ids: Vec<i64> = Vec::new();
    let mut branch_ids: Vec<i64> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        match parse_line(raw, ctx) {
            Err(fault) => {
                result.push(
                    Diagnostic::error(scene, fault.message)
                        .with_line(line_no)
                        .with_detail(raw.trim()),
                );
            }
            Ok(directive) => match directive {
                Directive::TextOpen(_) => ctx.in_text_block = true,
                Directive::TextClose => ctx.in_text_block = false,
                Directive::ChoiceOpen => ctx.in_choice_block = true,
                Directive::ChoiceClose => ctx.in_choice_block = false,
                Directive::ChoiceEntry { id, .. } => choice_ids.push(id),
                Directive::Branch { id: Some(id) } => branch_ids.push(id),
                Directive::Unknown => {
                    result.push(
                        Diagnostic::warn(scene, "未识别的行，运行时按空操作跳过")
                            .with_line(line_no)
                            .with_detail(raw.trim()),
                    );
                }
                _ => {}
            },
        }
    }

    if ctx.in_text_block {
        result.push(Diagnostic::warn(scene, "文本块到文件末尾仍未闭合"));
    }
    if ctx.in_choice_block {
        result.push(Diagnostic::warn(scene, "选项块到文件末尾仍未闭合"));
    }
    for id in &choice_ids {
        if !branch_ids.contains(id) {
            result.push(Diagnostic::warn(
                scene,
                format!("选项 {id} 没有对应的 .branch {id}: 分支"),
            ));
        }
    }

    result
}

/// 提取脚本引用的全部外部资源
pub fn extract_resource_references(text: &str) -> Vec<ResourceReference> {
    let mut refs = Vec::new();
    let mut ctx = ParseContext {
        reading: true,
        ..ParseContext::default()
    };

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let Ok(directive) = parse_line(raw, ctx) else {
            continue;
        };
        match directive {
            Directive::TextOpen(_) => ctx.in_text_block = true,
            Directive::TextClose => ctx.in_text_block = false,
            Directive::ChoiceOpen => ctx.in_choice_block = true,
            Directive::ChoiceClose => ctx.in_choice_block = false,
            Directive::SceneIn { folder, file, .. } => refs.push(ResourceReference {
                kind: ResourceType::SceneImage,
                name: format!("{folder}/{file}"),
                line,
            }),
            Directive::LoadBank { folder, .. } => refs.push(ResourceReference {
                kind: ResourceType::CharacterBank,
                name: folder,
                line,
            }),
            Directive::Music { name: Some(name) } => refs.push(ResourceReference {
                kind: ResourceType::Music,
                name,
                line,
            }),
            Directive::Sound { name: Some(name) } => refs.push(ResourceReference {
                kind: ResourceType::Sound,
                name,
                line,
            }),
            Directive::Swap { scene } => refs.push(ResourceReference {
                kind: ResourceType::Scene,
                name: scene,
                line,
            }),
            _ => {}
        }
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_script_has_no_diagnostics() {
        let script = "\
.scenein(bg, 001, fade)
.text(name=Alice)
你好。
.text
.choice
0: 继续
.choice
.branch 0:
.branch:";
        let result = analyze_scene("001", script);
        assert!(result.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_parse_error_reported_with_line() {
        let result = analyze_scene("001", ".wait(abc)");
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].line, Some(1));
    }

    #[test]
    fn test_unknown_line_warned() {
        let result = analyze_scene("001", "这行不是指令");
        assert_eq!(result.warn_count(), 1);
        insta::assert_snapshot!(
            result.diagnostics[0].to_string(),
            @r"
        [WARN] 001:1: 未识别的行，运行时按空操作跳过
          | 这行不是指令
        "
        );
    }

    #[test]
    fn test_unbalanced_blocks_warned() {
        let result = analyze_scene("001", ".text(name=A)\n你好");
        assert_eq!(result.warn_count(), 1);
        assert!(result.diagnostics[0].message.contains("文本块"));
    }

    #[test]
    fn test_choice_without_branch_warned() {
        let script = ".choice\n0: 好\n1: 不好\n.choice\n.branch 0:\n.branch:";
        let result = analyze_scene("001", script);
        assert_eq!(result.warn_count(), 1);
        assert!(result.diagnostics[0].message.contains("选项 1"));
    }

    #[test]
    fn test_resource_references() {
        let script = "\
.load(cast, 0)
.scenein(bg, 001, fade)
.music(theme)
.sound(door)
.swap(002)";
        let refs = extract_resource_references(script);
        assert_eq!(refs.len(), 5);
        assert_eq!(refs[0].kind, ResourceType::CharacterBank);
        assert_eq!(refs[0].name, "cast");
        assert_eq!(refs[1].kind, ResourceType::SceneImage);
        assert_eq!(refs[1].name, "bg/001");
        assert_eq!(refs[4].kind, ResourceType::Scene);
        assert_eq!(refs[4].line, 5);
    }
}
