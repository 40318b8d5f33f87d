//! # 资源协作方接口
//!
//! 核心不做任何 IO：场景文本、图片、音频都通过这里的 trait 向宿主索取。
//! 资源缺失在指令执行处转化为带行号的 `ScriptError`，对脚本作者可见。
//!
//! 文字测量与指针命中判定留在宿主侧：核心只暴露每行的滚动进度
//! 与选项的堆叠坐标，宿主回传语义化的 [`PlayerInput`](crate::input::PlayerInput)。

use thiserror::Error;

/// 图片资源标识。含义由宿主定义，通常是相对路径。
pub type ImageKey = String;

/// 资源层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// 资源不存在
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 资源存在但无法读取
    #[error("资源读取失败: {0}")]
    Unreadable(String),
}

/// 场景文本来源
pub trait SceneSource {
    /// 按场景名读取脚本全文
    fn load(&mut self, scene: &str) -> Result<String, AssetError>;
}

/// 图片提供方
pub trait ImageProvider {
    /// 载入一张场景背景图，返回其标识
    fn load_scene_image(&mut self, folder: &str, file: &str) -> Result<ImageKey, AssetError>;

    /// 按文件名顺序载入角色目录下的全部子图；目录不存在时报 NotFound
    fn load_character_bank(&mut self, folder: &str) -> Result<Vec<ImageKey>, AssetError>;
}

/// 音频提供方
pub trait AudioProvider {
    /// 循环播放背景音乐
    fn play_music(&mut self, name: &str, volume: f32) -> Result<(), AssetError>;

    /// 停止背景音乐
    fn stop_music(&mut self);

    /// 播放一次音效
    fn play_sound(&mut self, name: &str, volume: f32) -> Result<(), AssetError>;

    /// 停止当前音效
    fn stop_sound(&mut self);
}

#[cfg(test)]
pub(crate) mod fakes {
    //! 测试用的内存替身。

    use super::*;
    use std::collections::HashMap;

    /// 内存场景表
    #[derive(Default)]
    pub struct MemoryScenes {
        pub scenes: HashMap<String, String>,
    }

    impl MemoryScenes {
        pub fn with(scene: &str, text: &str) -> Self {
            let mut scenes = HashMap::new();
            scenes.insert(scene.to_string(), text.to_string());
            Self { scenes }
        }

        pub fn insert(mut self, scene: &str, text: &str) -> Self {
            self.scenes.insert(scene.to_string(), text.to_string());
            self
        }
    }

    impl SceneSource for MemoryScenes {
        fn load(&mut self, scene: &str) -> Result<String, AssetError> {
            self.scenes
                .get(scene)
                .cloned()
                .ok_or_else(|| AssetError::NotFound(scene.to_string()))
        }
    }

    /// 内存图片提供方：`banks` 给出每个角色目录的子图数量
    #[derive(Default)]
    pub struct MemoryImages {
        pub banks: HashMap<String, usize>,
        pub missing: Vec<String>,
    }

    impl MemoryImages {
        pub fn with_bank(folder: &str, count: usize) -> Self {
            let mut banks = HashMap::new();
            banks.insert(folder.to_string(), count);
            Self {
                banks,
                missing: Vec::new(),
            }
        }
    }

    impl ImageProvider for MemoryImages {
        fn load_scene_image(&mut self, folder: &str, file: &str) -> Result<ImageKey, AssetError> {
            let key = format!("{folder}/{file}");
            if self.missing.iter().any(|m| m == &key) {
                return Err(AssetError::NotFound(key));
            }
            Ok(key)
        }

        fn load_character_bank(&mut self, folder: &str) -> Result<Vec<ImageKey>, AssetError> {
            match self.banks.get(folder) {
                Some(count) => Ok((0..*count).map(|i| format!("{folder}/{i:02}")).collect()),
                None => Err(AssetError::NotFound(folder.to_string())),
            }
        }
    }

    /// 记录调用的音频提供方
    #[derive(Default)]
    pub struct RecordingAudio {
        pub played_music: Vec<String>,
        pub music_stops: usize,
        pub played_sounds: Vec<String>,
        pub sound_stops: usize,
        pub missing: Vec<String>,
    }

    impl AudioProvider for RecordingAudio {
        fn play_music(&mut self, name: &str, _volume: f32) -> Result<(), AssetError> {
            if self.missing.iter().any(|m| m == name) {
                return Err(AssetError::NotFound(name.to_string()));
            }
            self.played_music.push(name.to_string());
            Ok(())
        }

        fn stop_music(&mut self) {
            self.music_stops += 1;
        }

        fn play_sound(&mut self, name: &str, _volume: f32) -> Result<(), AssetError> {
            if self.missing.iter().any(|m| m == name) {
                return Err(AssetError::NotFound(name.to_string()));
            }
            self.played_sounds.push(name.to_string());
            Ok(())
        }

        fn stop_sound(&mut self) {
            self.sound_stops += 1;
        }
    }
}
