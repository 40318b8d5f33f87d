//! # Error 模块
//!
//! 定义运行时的错误类型。
//!
//! 脚本错误一律是致命错误：携带场景名与 1-based 行号冒泡出帧循环，
//! 终止演出并由宿主呈现给脚本作者。不存在重试或部分恢复——
//! 非法脚本被视为创作期 bug，而不是需要掩盖的运行时状况。

use thiserror::Error;

/// 脚本错误
///
/// 场景文件中任何非法内容（缺少参数、该是整数的地方不是整数、
/// 未知锚点名、资源缺失、非法缩放比例等）都会产生此错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("脚本错误 ({scene}.vns 第 {line} 行): {message}")]
pub struct ScriptError {
    /// 场景名（不含路径与扩展名）
    pub scene: String,
    /// 1-based 行号（0 表示文件级别的错误）
    pub line: usize,
    /// 人类可读的错误描述
    pub message: String,
}

impl ScriptError {
    /// 创建脚本错误
    pub fn new(scene: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type ScriptResult<T> = Result<T, ScriptError>;

/// 存档错误
///
/// 存档文件的读写失败与格式损坏同样按致命错误处理（直接上抛给宿主）。
#[derive(Error, Debug)]
pub enum SaveError {
    /// 存档文本格式非法
    #[error("存档格式错误 (第 {line} 行): {message}")]
    Malformed { line: usize, message: String },

    /// 存档不存在
    #[error("存档不存在: {0}")]
    NotFound(String),

    /// 文件读写失败
    #[error("存档读写失败: {0}")]
    Io(String),
}
