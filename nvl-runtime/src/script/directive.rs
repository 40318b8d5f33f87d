//! # 指令
//!
//! 每帧由解析器从当前行即时重建的标签化指令，调度器对其做穷尽匹配。
//! 指令是瞬态值，从不持久化。

use crate::anchor::Anchor;
use crate::transition::EffectSpec;
use crate::vars::{AssignOp, Comparator, Operand};

/// `.text(...)` 的参数
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextParams {
    /// 角色图库（给出时入场角色）
    pub bank: Option<i64>,
    /// 子图（表情）索引
    pub emotion: i64,
    /// 横向槽位
    pub slot: i64,
    /// 说话人
    pub name: String,
    /// 不向回看记录追加新页
    pub skip: bool,
}

/// 解析后的脚本指令
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// 注释或空行（文本块外）
    Blank,
    /// `.forcequit`
    ForceQuit,
    /// `.load(bank)`：淡出并移除匹配角色（-1 表示全部）
    ClearCharacters { bank: i64 },
    /// `.load(folder, slot)`：整目录载入图库
    LoadBank { folder: String, slot: i64 },
    /// `.text(...)`：开启文本块
    TextOpen(TextParams),
    /// 文本块内再次出现的 `.text`：关闭文本块
    TextClose,
    /// `.wait(N)`
    Wait { frames: i64 },
    /// `.shake(dx, dy)`；裸 `.shake` 关闭抖动
    Shake { magnitude: Option<(i64, i64)> },
    /// `.choice`：开启选项块
    ChoiceOpen,
    /// 选项块内再次出现的 `.choice`：等待选择
    ChoiceClose,
    /// 选项块内的 `id: 提示文本`
    ChoiceEntry { id: i64, prompt: String },
    /// `.branch id:`；裸 `.branch:` 为分支终点
    Branch { id: Option<i64> },
    /// `.setanchor(name)`
    SetAnchor { anchor: Anchor },
    /// `.scenein(folder, file[, effect, ...])`
    SceneIn {
        folder: String,
        file: String,
        effect: Option<EffectSpec>,
    },
    /// `.sceneout([effect, ...])`
    SceneOut { effect: Option<EffectSpec> },
    /// `.music(name)`；`.music()` 停止
    Music { name: Option<String> },
    /// `.sound(name)`；`.sound()` 停止
    Sound { name: Option<String> },
    /// `.setfade(N)`
    SetFade { rate: i64 },
    /// `.hide`
    Hide,
    /// `.show`
    Show,
    /// `.swap(scene)`
    Swap { scene: String },
    /// `.widget(label, anchor)`
    Widget { label: String, anchor: Anchor },
    /// `$xx op= 值或变量`
    Assign {
        var: String,
        op: AssignOp,
        operand: Operand,
    },
    /// `.if $xx OP 值或变量:`；裸 `.if:` 结束条件块
    If {
        cond: Option<(String, Comparator, Operand)>,
    },
    /// 文本块内的原始对话行
    Dialogue { text: String },
    /// 未识别的行：按空操作跳过
    Unknown,
}
