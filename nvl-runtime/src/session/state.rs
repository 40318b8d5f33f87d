//! # 会话状态
//!
//! 解释器的全部可变状态集中在 [`InterpreterState`]，由唯一的
//! `SceneSession` 独占持有。
//!
//! ## 设计原则
//!
//! - 所有状态必须**显式建模**——多帧指令的重入标志各有自己的小结构，
//!   「尚未开始」与「已结束」不共用一个布尔
//! - 所有状态必须**可序列化**
//! - 不允许隐式全局状态

use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::assets::ImageKey;
use crate::characters::CharacterLayer;
use crate::dialogue::DialogueBuffer;
use crate::transition::TransitionState;
use crate::vars::VarStore;

/// 场景状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneState {
    /// 空闲：对话可读，等待推进
    Read,
    /// 等待玩家选择
    Choose,
    /// 向后寻找裸 `.branch:` 行
    OptBranch,
    /// 向后寻找下一个 `.if` 行
    VarBranch,
}

/// `.wait` 的逐帧倒数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitState {
    pub remaining: u32,
}

/// 界面显隐渐变（`.hide`/`.show`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HideState {
    /// 当前界面透明度
    pub alpha: i32,
    /// 目标透明度
    pub target: i32,
    /// 是否已有进行中的显隐请求
    pub armed: bool,
}

impl Default for HideState {
    fn default() -> Self {
        Self {
            alpha: 255,
            target: 255,
            armed: false,
        }
    }
}

/// 自动模式的停顿倒数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AutoState {
    pub counter: u32,
    pub armed: bool,
}

/// 日期时间挂件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetState {
    pub label: String,
    pub anchor: Anchor,
}

/// 一个待选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceItem {
    pub id: i64,
    pub prompt: String,
    /// 屏幕上的堆叠位置（横向居中，纵向按序号排布）
    pub pos: (i32, i32),
}

/// 当前背景
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BackgroundState {
    /// 背景来源（folder, file），存档记录用
    pub source: Option<(String, String)>,
    pub key: Option<ImageKey>,
    /// 上一张背景（过渡期间合成在下层）
    pub old_key: Option<ImageKey>,
    /// `.sceneout` 完成后为真：背景身份保留但不再显示
    pub hidden: bool,
}

/// 解释器状态：会话的唯一可变状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterState {
    pub cursor: usize,
    pub finished: bool,
    pub running: bool,
    pub scene_state: SceneState,
    /// 玩家是否已允许推进当前页
    pub advance: bool,
    /// 文本块开启中
    pub in_text_block: bool,
    /// 选项块开启中
    pub in_choice_block: bool,
    pub is_skip: bool,
    pub is_auto: bool,
    pub auto: AutoState,
    pub wait: Option<WaitState>,
    pub transition: TransitionState,
    /// `.scenein` 多帧执行的重入保护
    pub scene_loading: bool,
    /// `.sceneout` 多帧执行的重入保护
    pub scene_unloading: bool,
    pub background: BackgroundState,
    pub hide: HideState,
    /// 抖动幅度；None 表示关闭
    pub shake: Option<(i64, i64)>,
    /// 下一张场景图的锚点
    pub anchor: Anchor,
    /// 上一张场景图的锚点
    pub old_anchor: Anchor,
    pub vars: VarStore,
    pub dialogue: DialogueBuffer,
    pub characters: CharacterLayer,
    /// 8 个角色图库
    pub banks: Vec<Vec<ImageKey>>,
    /// 图库载入历史（存档记录最近 4 条）
    pub bank_log: Vec<(String, i64)>,
    pub choices: Vec<ChoiceItem>,
    /// 当前选择（-1 = 未选）
    pub selection: i64,
    pub widget: Option<WidgetState>,
    /// 最后一次 `.music` 的曲目（停止后为 None）
    pub last_music: Option<String>,
    /// 是否有音效在播
    pub sound_playing: bool,
}

impl InterpreterState {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            finished: false,
            running: true,
            scene_state: SceneState::Read,
            advance: false,
            in_text_block: false,
            in_choice_block: false,
            is_skip: false,
            is_auto: false,
            auto: AutoState::default(),
            wait: None,
            transition: TransitionState::new(),
            scene_loading: false,
            scene_unloading: false,
            background: BackgroundState::default(),
            hide: HideState::default(),
            shake: None,
            anchor: Anchor::Center,
            old_anchor: Anchor::Center,
            vars: VarStore::new(),
            dialogue: DialogueBuffer::new(),
            characters: CharacterLayer::new(),
            banks: vec![Vec::new(); 8],
            bank_log: Vec::new(),
            choices: Vec::new(),
            selection: -1,
            widget: None,
            last_music: None,
            sound_playing: false,
        }
    }
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = InterpreterState::new();
        assert_eq!(state.scene_state, SceneState::Read);
        assert_eq!(state.cursor, 0);
        assert!(state.running);
        assert!(!state.finished);
        assert_eq!(state.selection, -1);
        assert_eq!(state.banks.len(), 8);
        assert_eq!(state.vars.len(), 676);
    }

    #[test]
    fn test_state_serialization() {
        let mut state = InterpreterState::new();
        state.cursor = 42;
        state.shake = Some((8, 4));
        let json = serde_json::to_string(&state).unwrap();
        let loaded: InterpreterState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, loaded);
    }
}
