//! # NVL Runtime
//!
//! 视觉小说引擎的核心运行时库：行式脚本语言的解释器、场景状态机、
//! 过渡动画与存档编解码。
//!
//! ## 架构概述
//!
//! 本 crate 是帧驱动的纯逻辑核心，不做窗口管理、图像解码与混音。
//! 宿主每个演出帧（60Hz）调用一次 `tick`，随后取走绘制清单：
//!
//! ```text
//! Host                                Runtime
//!   │                                    │
//!   │──── PlayerInput ─────────────────►│
//!   │                                    │ tick()
//!   │◄─── FrameReport ──────────────────│
//!   │◄─── frame() -> RenderFrame ───────│
//!   │                                    │
//! ```
//!
//! 图片与音频通过 [`assets`] 中的 trait 向宿主索取；资源缺失在指令处
//! 转化为带场景名与行号的 [`ScriptError`]，整个演出随之终止。
//!
//! ## 核心类型
//!
//! - [`SceneSession`]：唯一的活动解释器实例，独占全部可变状态
//! - [`PlayerInput`]：宿主传入的语义化输入
//! - [`RenderFrame`]：每帧导出的只读绘制清单
//! - [`SaveRecord`]：行式文本存档的编解码
//!
//! ## 模块结构
//!
//! - [`script`]：脚本文档与行解析
//! - [`session`]：帧循环与指令调度
//! - [`transition`]：淡入淡出/缩放插值器
//! - [`dialogue`]：对话页与回看记录
//! - [`characters`]：角色图层
//! - [`vars`]：变量存储
//! - [`save`]：存档编解码与槽位库
//! - [`diagnostic`]：脚本静态检查

pub mod anchor;
pub mod assets;
pub mod characters;
pub mod config;
pub mod dialogue;
pub mod diagnostic;
pub mod error;
pub mod input;
pub mod save;
pub mod script;
pub mod session;
pub mod transition;
pub mod vars;

// 重导出核心类型
pub use anchor::Anchor;
pub use assets::{AssetError, AudioProvider, ImageKey, ImageProvider, SceneSource};
pub use characters::{CharacterInstance, CharacterLayer};
pub use config::SessionConfig;
pub use dialogue::{DialogueBuffer, DialoguePage, ScrollLine};
pub use diagnostic::{
    Diagnostic, DiagnosticLevel, DiagnosticResult, ResourceReference, ResourceType, analyze_scene,
    extract_resource_references,
};
pub use error::{SaveError, ScriptError, ScriptResult};
pub use input::PlayerInput;
pub use save::{BacklogPage, DrawRecord, SaveRecord, SlotInfo, SlotStore};
pub use script::{Directive, ParseContext, ScriptDocument, TextParams, parse_line};
pub use session::{
    FrameReport, InterpreterState, RenderFrame, SceneSession, SceneState,
};
pub use transition::{EffectKind, EffectSpec, TransitionState};
pub use vars::{AssignOp, Comparator, Operand, VarStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证公共类型可以正常使用
        let _input = PlayerInput::Advance;
        let _config = SessionConfig::default();
        let _vars = VarStore::new();
        let _record = SaveRecord::default();

        let directive = parse_line(".wait(30)", ParseContext::default()).unwrap();
        assert!(matches!(directive, Directive::Wait { frames: 30 }));
    }
}
