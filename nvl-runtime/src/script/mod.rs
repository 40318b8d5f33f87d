//! # Script 模块
//!
//! 脚本文档与行解析。
//!
//! - [`document`]：场景文件的原始行序列
//! - [`directive`]：标签化的指令表示
//! - [`parser`]：把一行文本解析为指令（手写解析，无正则）

pub mod directive;
pub mod document;
pub mod parser;

pub use directive::{Directive, TextParams};
pub use document::ScriptDocument;
pub use parser::{ParseContext, ParseFault, parse_line};
