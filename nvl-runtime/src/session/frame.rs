//! # 渲染快照
//!
//! 每帧由会话导出的只读绘制清单。宿主据此绘制；
//! 也可以把快照送往独立的渲染线程，会话本身保持单线程。

use serde::Serialize;

use crate::anchor::Anchor;
use crate::assets::ImageKey;
use crate::session::state::SceneState;

/// 背景图视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundView {
    pub key: ImageKey,
    /// 合成透明度 0-255
    pub alpha: i32,
    pub scale: f32,
    pub anchor: Anchor,
}

/// 角色立绘视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterView {
    pub key: ImageKey,
    pub alpha: i32,
    /// 底边中点位置（槽位 × 屏宽/16, 屏高）
    pub pos: (i32, i32),
    pub name: String,
}

/// 一行对话的渲染信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub text: String,
    /// 已显示的列数；回看旧页时恒为全量
    pub revealed: u32,
}

/// 文本框视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextboxView {
    pub speaker: String,
    pub lines: Vec<LineView>,
    /// 是否在回看旧页
    pub reviewing: bool,
}

/// 选项视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceView {
    pub id: i64,
    pub prompt: String,
    pub pos: (i32, i32),
}

/// 挂件视图
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetView {
    pub label: String,
    pub anchor: Anchor,
}

/// 一帧的绘制清单
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub background: Option<BackgroundView>,
    /// 过渡期间垫底的上一张背景
    pub old_background: Option<BackgroundView>,
    /// 抖动幅度；宿主每帧在此幅度内抖动锚点
    pub shake: Option<(i64, i64)>,
    pub characters: Vec<CharacterView>,
    pub textbox: Option<TextboxView>,
    pub choices: Vec<ChoiceView>,
    /// 界面整体透明度（`.hide`/`.show`）
    pub ui_alpha: i32,
    pub widget: Option<WidgetView>,
    pub state: SceneState,
}
