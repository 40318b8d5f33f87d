//! # 对话缓冲
//!
//! 当前页（说话人 + 逐行滚动文本）与完整的回看记录。
//!
//! ## 设计说明
//!
//! - 回看记录只增不减，`prev_index`/`max_index` 约束导航范围
//! - 滚动进度以「列」计量（每个字符一列），像素换算交给文字渲染方
//! - 同一行同时承担实时渲染与回看副本：副本就是原文本身

use serde::{Deserialize, Serialize};

/// 单行对话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollLine {
    /// 行文本
    pub text: String,
    /// 已显示的列数
    pub revealed: u32,
    /// 总列数
    pub width: u32,
}

impl ScrollLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let width = text.chars().count() as u32;
        Self {
            text,
            revealed: 0,
            width,
        }
    }

    /// 推进一帧滚动
    pub fn step(&mut self, speed: u32) {
        self.revealed = (self.revealed + speed).min(self.width);
    }

    pub fn is_complete(&self) -> bool {
        self.revealed >= self.width
    }

    /// 瞬间滚完
    pub fn force_complete(&mut self) {
        self.revealed = self.width;
    }
}

/// 一页对话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DialoguePage {
    /// 说话人（空串表示旁白）
    pub speaker: String,
    pub lines: Vec<ScrollLine>,
}

impl DialoguePage {
    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(|l| l.is_complete())
    }
}

/// 对话缓冲
///
/// 索引从 -1 起（尚无页面），与存档格式的 `text_index` 算术一致。
/// 恒有 `max_index >= prev_index >= 0`（出现过对话之后）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueBuffer {
    pages: Vec<DialoguePage>,
    /// 当前回看位置
    pub prev_index: i64,
    /// 最新页位置
    pub max_index: i64,
}

impl DialogueBuffer {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            prev_index: -1,
            max_index: -1,
        }
    }

    /// 追加一页并把视图移到最新页
    pub fn append_page(&mut self, speaker: impl Into<String>) {
        self.pages.push(DialoguePage {
            speaker: speaker.into(),
            lines: Vec::new(),
        });
        self.prev_index += 1;
        self.max_index += 1;
    }

    /// 向最新页追加一行（尚无页面时丢弃）
    pub fn push_line(&mut self, text: impl Into<String>) {
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(ScrollLine::new(text));
        }
    }

    pub fn pages(&self) -> &[DialoguePage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn latest(&self) -> Option<&DialoguePage> {
        self.pages.last()
    }

    /// 当前回看视图指向的页
    pub fn viewed(&self) -> Option<&DialoguePage> {
        if self.prev_index < 0 {
            return None;
        }
        self.pages.get(self.prev_index as usize)
    }

    /// 是否正在看最新页
    pub fn viewing_latest(&self) -> bool {
        self.prev_index == self.max_index
    }

    /// 回看上一页（尚无页面时无效）
    pub fn back(&mut self) {
        if self.max_index < 0 {
            return;
        }
        self.prev_index = (self.prev_index - 1).max(0);
    }

    /// 前进一页
    pub fn forward(&mut self) {
        self.prev_index = (self.prev_index + 1).min(self.max_index);
    }

    /// 直接跳到最新页
    pub fn jump_to_latest(&mut self) {
        self.prev_index = self.max_index;
    }

    /// 最新页是否全部滚完（没有页面视为已滚完）
    pub fn latest_complete(&self) -> bool {
        self.pages.last().map(|p| p.is_complete()).unwrap_or(true)
    }

    /// 推进最新页的滚动：各行顺序展开，前一行滚完当帧接着滚下一行
    pub fn scroll_step(&mut self, speed: u32) {
        if !self.viewing_latest() {
            return;
        }
        if let Some(page) = self.pages.last_mut() {
            for line in &mut page.lines {
                if !line.is_complete() {
                    line.step(speed);
                    if !line.is_complete() {
                        break;
                    }
                }
            }
        }
    }

    /// 瞬间滚完最新页；返回调用前是否已经滚完
    pub fn force_complete_latest(&mut self) -> bool {
        let mut was_complete = true;
        if let Some(page) = self.pages.last_mut() {
            for line in &mut page.lines {
                if !line.is_complete() {
                    line.force_complete();
                    was_complete = false;
                }
            }
        }
        was_complete
    }

    /// 读档恢复：整页塞入（各行已滚完）
    pub fn restore_page(&mut self, speaker: &str, lines: &[String]) {
        self.append_page(speaker);
        if let Some(page) = self.pages.last_mut() {
            for text in lines {
                let mut line = ScrollLine::new(text.clone());
                line.force_complete();
                page.lines.push(line);
            }
        }
    }

    /// 丢弃最后一页（读档时由重放的页首指令重新生成）
    pub fn pop_last(&mut self) {
        if self.pages.pop().is_some() {
            self.prev_index -= 1;
            self.max_index -= 1;
        }
    }
}

impl Default for DialogueBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_navigate() {
        let mut buffer = DialogueBuffer::new();
        assert_eq!(buffer.prev_index, -1);
        assert_eq!(buffer.max_index, -1);

        buffer.append_page("Alice");
        buffer.push_line("Hello");
        buffer.append_page("Bob");
        buffer.push_line("Hi");

        assert_eq!(buffer.page_count(), 2);
        assert_eq!(buffer.max_index, 1);
        assert!(buffer.viewing_latest());

        buffer.back();
        assert_eq!(buffer.prev_index, 0);
        assert!(!buffer.viewing_latest());
        assert_eq!(buffer.viewed().unwrap().speaker, "Alice");

        // 不能回看到第一页之前
        buffer.back();
        assert_eq!(buffer.prev_index, 0);

        buffer.forward();
        assert!(buffer.viewing_latest());
        // 不能越过最新页
        buffer.forward();
        assert_eq!(buffer.prev_index, 1);
    }

    #[test]
    fn test_scroll_sequential_reveal() {
        let mut buffer = DialogueBuffer::new();
        buffer.append_page("");
        buffer.push_line("abcd");
        buffer.push_line("ef");

        buffer.scroll_step(3);
        let page = buffer.latest().unwrap();
        assert_eq!(page.lines[0].revealed, 3);
        assert_eq!(page.lines[1].revealed, 0);

        // 第一行在本帧滚完后继续滚第二行
        buffer.scroll_step(3);
        let page = buffer.latest().unwrap();
        assert_eq!(page.lines[0].revealed, 4);
        assert_eq!(page.lines[1].revealed, 3);
        assert!(page.is_complete());
    }

    #[test]
    fn test_scroll_only_on_latest_page() {
        let mut buffer = DialogueBuffer::new();
        buffer.append_page("");
        buffer.push_line("abcd");
        buffer.append_page("");
        buffer.push_line("xy");

        buffer.back();
        buffer.scroll_step(2);
        // 回看旧页时最新页不滚动
        assert_eq!(buffer.latest().unwrap().lines[0].revealed, 0);
    }

    #[test]
    fn test_force_complete_two_phase() {
        let mut buffer = DialogueBuffer::new();
        buffer.append_page("");
        buffer.push_line("abcdef");

        // 第一次：瞬间滚完，但报告「尚未滚完」
        assert!(!buffer.force_complete_latest());
        // 第二次：已滚完
        assert!(buffer.force_complete_latest());
    }

    #[test]
    fn test_restore_and_pop() {
        let mut buffer = DialogueBuffer::new();
        buffer.restore_page("Alice", &["一行".to_string(), "两行".to_string()]);
        buffer.restore_page("Bob", &["三行".to_string()]);
        assert_eq!(buffer.max_index, 1);
        assert!(buffer.latest_complete());

        buffer.pop_last();
        assert_eq!(buffer.page_count(), 1);
        assert_eq!(buffer.max_index, 0);
        assert_eq!(buffer.latest().unwrap().speaker, "Alice");
    }
}
