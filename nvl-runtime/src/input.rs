//! # Input 模块
//!
//! 宿主采集用户操作后传给会话的语义化输入。
//!
//! ## 设计说明
//!
//! - 会话不处理鼠标坐标与键盘事件本身：选项命中、按钮点击由宿主判定
//! - 每帧最多消费一个输入，应用在帧末尾，下一帧生效
//! - 退出配置/存档等子界面的取消操作（ESC）由宿主处理，不进入会话

use serde::{Deserialize, Serialize};

/// 玩家输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerInput {
    /// 点击推进：对话未滚完则先瞬间滚完，已滚完才允许翻页
    Advance,

    /// 回看上一页
    Back,

    /// 选中编号选项（编号来自脚本中的 `N: 提示文本` 行）
    PickChoice(i64),

    /// 切换跳过模式（自动模式开启时无效）
    ToggleSkip,

    /// 切换自动模式（跳过模式开启时无效）
    ToggleAuto,
}
