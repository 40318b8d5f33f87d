//! # 锚点
//!
//! 脚本语言用 9 个标准锚点名定位场景图与挂件，
//! 对应屏幕的四角、四边中点与中心。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 九宫格锚点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    TopLeft,
    MidTop,
    TopRight,
    MidLeft,
    Center,
    MidRight,
    BottomLeft,
    MidBottom,
    BottomRight,
}

impl Anchor {
    /// 全部合法锚点名（与脚本语言一致，区分大小写）
    pub const NAMES: [&'static str; 9] = [
        "topleft",
        "midtop",
        "topright",
        "midleft",
        "center",
        "midright",
        "bottomleft",
        "midbottom",
        "bottomright",
    ];

    /// 便捷解析
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_str(s).ok()
    }

    /// 脚本中使用的名字
    pub fn name(&self) -> &'static str {
        match self {
            Self::TopLeft => "topleft",
            Self::MidTop => "midtop",
            Self::TopRight => "topright",
            Self::MidLeft => "midleft",
            Self::Center => "center",
            Self::MidRight => "midright",
            Self::BottomLeft => "bottomleft",
            Self::MidBottom => "midbottom",
            Self::BottomRight => "bottomright",
        }
    }

    /// 在给定屏幕尺寸下解析为像素坐标
    pub fn point(&self, screen: (u32, u32)) -> (i32, i32) {
        let (w, h) = (screen.0 as i32, screen.1 as i32);
        match self {
            Self::TopLeft => (0, 0),
            Self::MidTop => (w / 2, 0),
            Self::TopRight => (w, 0),
            Self::MidLeft => (0, h / 2),
            Self::Center => (w / 2, h / 2),
            Self::MidRight => (w, h / 2),
            Self::BottomLeft => (0, h),
            Self::MidBottom => (w / 2, h),
            Self::BottomRight => (w, h),
        }
    }
}

impl FromStr for Anchor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topleft" => Ok(Self::TopLeft),
            "midtop" => Ok(Self::MidTop),
            "topright" => Ok(Self::TopRight),
            "midleft" => Ok(Self::MidLeft),
            "center" => Ok(Self::Center),
            "midright" => Ok(Self::MidRight),
            "bottomleft" => Ok(Self::BottomLeft),
            "midbottom" => Ok(Self::MidBottom),
            "bottomright" => Ok(Self::BottomRight),
            _ => Err(()),
        }
    }
}
