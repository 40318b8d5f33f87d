//! # 脚本文档
//!
//! 一个场景文件的原始行序列。载入后只读；指令每帧从当前行即时重建，
//! 文档本身从不持久化任何解析结果。

use serde::{Deserialize, Serialize};

/// 场景脚本文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDocument {
    /// 场景名（文件名去扩展名）
    scene: String,
    lines: Vec<String>,
}

impl ScriptDocument {
    pub fn new(scene: impl Into<String>, text: &str) -> Self {
        Self {
            scene: scene.into(),
            lines: text.lines().map(|l| l.to_string()).collect(),
        }
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|s| s.as_str())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lines() {
        let doc = ScriptDocument::new("intro", ".text(name=A)\n你好\n.text\n");
        assert_eq!(doc.scene(), "intro");
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.line(1), Some("你好"));
        assert_eq!(doc.line(3), None);
    }

    #[test]
    fn test_empty_document() {
        let doc = ScriptDocument::new("empty", "");
        assert!(doc.is_empty());
        assert_eq!(doc.line(0), None);
    }
}
