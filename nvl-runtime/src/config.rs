//! # Config 模块
//!
//! 会话运行参数。所有字段带 serde 默认值，可从 JSON 配置文件部分覆盖。
//!
//! ## 配置优先级
//!
//! 1. 宿主显式传入（最高）
//! 2. 配置文件
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 屏幕尺寸（像素），用于锚点与角色槽位换算
    #[serde(default = "default_screen_size")]
    pub screen_size: (u32, u32),

    /// 文本滚动速度（列/帧，每个字符一列）
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: u32,

    /// 自动模式下整页滚完后的停顿帧数
    #[serde(default = "default_auto_pause")]
    pub auto_pause: u32,

    /// 背景音乐音量 0.0-1.0
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// 音效音量 0.0-1.0
    #[serde(default = "default_volume")]
    pub sound_volume: f32,

    /// 选项框纵向行高（像素），用于选项堆叠定位
    #[serde(default = "default_choice_row_height")]
    pub choice_row_height: u32,

    /// 入口场景名
    #[serde(default = "default_start_scene")]
    pub start_scene: String,

    /// 存档栅格尺寸（列, 行）
    #[serde(default = "default_save_grid")]
    pub save_grid: (u32, u32),
}

fn default_screen_size() -> (u32, u32) {
    (1280, 720)
}

fn default_scroll_speed() -> u32 {
    2
}

fn default_auto_pause() -> u32 {
    60
}

fn default_volume() -> f32 {
    0.5
}

fn default_choice_row_height() -> u32 {
    48
}

fn default_start_scene() -> String {
    "000".to_string()
}

fn default_save_grid() -> (u32, u32) {
    (2, 7)
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            screen_size: default_screen_size(),
            scroll_speed: default_scroll_speed(),
            auto_pause: default_auto_pause(),
            volume: default_volume(),
            sound_volume: default_volume(),
            choice_row_height: default_choice_row_height(),
            start_scene: default_start_scene(),
            save_grid: default_save_grid(),
        }
    }
}

impl SessionConfig {
    /// 从 JSON 文本读取配置，缺省字段取默认值
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.screen_size, (1280, 720));
        assert_eq!(config.auto_pause, 60);
        assert_eq!(config.start_scene, "000");
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = SessionConfig::from_json(r#"{ "scroll_speed": 5, "start_scene": "intro" }"#)
            .unwrap();
        assert_eq!(config.scroll_speed, 5);
        assert_eq!(config.start_scene, "intro");
        // 未给出的字段使用默认值
        assert_eq!(config.screen_size, (1280, 720));
        assert_eq!(config.save_grid, (2, 7));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = SessionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let loaded = SessionConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }
}
