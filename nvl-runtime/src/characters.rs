//! # 角色图层
//!
//! 跟踪当前显示的角色立绘：图库索引、子图（表情）、横向槽位与淡入透明度。
//!
//! ## 规则
//!
//! - 同屏最多 8 个实例，溢出时移除最旧者
//! - 入场实例从透明开始，每帧 +12 淡入到 255
//! - `.load(N)` 的清场按每帧 -24 淡出，降到 0 以下移除
//! - 同一槽位上，后入场者完全不透明的那一帧移除更早的同槽实例
//!   （后写者胜，相对顺序保持）

use serde::{Deserialize, Serialize};

/// 同屏实例上限
pub const MAX_VISIBLE: usize = 8;
/// 每帧淡入步进
pub const FADE_IN_STEP: i32 = 12;
/// 清场时每帧淡出步进
pub const FADE_OUT_STEP: i32 = 24;

/// 一个在场角色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInstance {
    /// 图库槽位（0-7）
    pub bank: usize,
    /// 子图（表情）索引
    pub emotion: usize,
    /// 横向槽位（0-15，屏幕宽度的 1/16 为步长）
    pub slot: i64,
    /// 显示名
    pub name: String,
    /// 淡入透明度 0-255
    pub alpha: i32,
}

/// 角色图层
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CharacterLayer {
    chars: Vec<CharacterInstance>,
}

impl CharacterLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 与最新实例的表情、名字、槽位完全一致时不重复入场
    pub fn should_add(&self, emotion: usize, name: &str, slot: i64) -> bool {
        match self.chars.last() {
            None => true,
            Some(last) => last.emotion != emotion || last.name != name || last.slot != slot,
        }
    }

    /// 入场（透明度从 0 淡入）；超过上限时移除最旧者
    pub fn push(&mut self, bank: usize, emotion: usize, slot: i64, name: impl Into<String>) {
        self.chars.push(CharacterInstance {
            bank,
            emotion,
            slot,
            name: name.into(),
            alpha: 0,
        });
        if self.chars.len() > MAX_VISIBLE {
            self.chars.remove(0);
        }
    }

    /// 每帧淡入推进
    pub fn fade_in_step(&mut self) {
        for c in &mut self.chars {
            if c.alpha < 255 {
                c.alpha = (c.alpha + FADE_IN_STEP).min(255);
            }
        }
    }

    /// 清场淡出：匹配图库的实例每帧 -24，降到 0 以下移除；
    /// `bank == -1` 匹配全部。返回是否已无匹配实例。
    pub fn fade_out_step(&mut self, bank: i64) -> bool {
        let matches = |c: &CharacterInstance| bank == -1 || c.bank as i64 == bank;
        for c in &mut self.chars {
            if matches(c) {
                c.alpha -= FADE_OUT_STEP;
            }
        }
        self.chars.retain(|c| !matches(c) || c.alpha >= 0);
        !self.chars.iter().any(matches)
    }

    /// 同槽位压盖：存在更晚入场且完全不透明的同槽实例时，移除较早者
    pub fn evict_overlaps(&mut self) {
        let keep: Vec<bool> = (0..self.chars.len())
            .map(|i| {
                !self.chars[i + 1..]
                    .iter()
                    .any(|later| later.slot == self.chars[i].slot && later.alpha == 255)
            })
            .collect();
        let mut it = keep.into_iter();
        self.chars.retain(|_| it.next().unwrap_or(true));
    }

    pub fn iter(&self) -> impl Iterator<Item = &CharacterInstance> {
        self.chars.iter()
    }

    pub fn as_slice(&self) -> &[CharacterInstance] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_alpha(layer: &mut CharacterLayer) {
        for _ in 0..22 {
            layer.fade_in_step();
        }
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut layer = CharacterLayer::new();
        for i in 0..9 {
            layer.push(0, i, i as i64, format!("角色{i}"));
        }
        // 第 9 个入场后最旧者被移除，刚好剩 8 个
        assert_eq!(layer.len(), 8);
        assert_eq!(layer.as_slice()[0].emotion, 1);
        assert_eq!(layer.as_slice()[7].emotion, 8);
    }

    #[test]
    fn test_should_add_dedup() {
        let mut layer = CharacterLayer::new();
        layer.push(0, 2, 8, "Alice");
        assert!(!layer.should_add(2, "Alice", 8));
        assert!(layer.should_add(3, "Alice", 8));
        assert!(layer.should_add(2, "Bob", 8));
        assert!(layer.should_add(2, "Alice", 9));
    }

    #[test]
    fn test_fade_in_clamps() {
        let mut layer = CharacterLayer::new();
        layer.push(0, 0, 0, "A");
        for _ in 0..30 {
            layer.fade_in_step();
        }
        assert_eq!(layer.as_slice()[0].alpha, 255);
    }

    #[test]
    fn test_fade_out_until_empty() {
        let mut layer = CharacterLayer::new();
        layer.push(0, 0, 0, "A");
        layer.push(1, 0, 4, "B");
        full_alpha(&mut layer);

        // alpha 255 需要 11 帧降到 0 以下
        let mut frames = 0;
        while !layer.fade_out_step(-1) {
            frames += 1;
            assert!(frames < 20, "清场不应超过 20 帧");
        }
        assert!(layer.is_empty());
        assert_eq!(frames, 10);
    }

    #[test]
    fn test_fade_out_single_bank() {
        let mut layer = CharacterLayer::new();
        layer.push(0, 0, 0, "A");
        layer.push(1, 0, 4, "B");
        full_alpha(&mut layer);

        while !layer.fade_out_step(0) {}
        // 只有图库 0 的实例被移除
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.as_slice()[0].bank, 1);
    }

    #[test]
    fn test_overlap_eviction_order() {
        let mut layer = CharacterLayer::new();
        layer.push(0, 0, 4, "旧");
        full_alpha(&mut layer);
        layer.push(0, 1, 4, "新");

        // 新实例尚未完全不透明，不触发压盖
        layer.evict_overlaps();
        assert_eq!(layer.len(), 2);

        full_alpha(&mut layer);
        layer.evict_overlaps();
        // 新实例到达 255 后移除同槽的旧实例
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.as_slice()[0].name, "新");
    }

    #[test]
    fn test_overlap_eviction_keeps_other_slots() {
        let mut layer = CharacterLayer::new();
        layer.push(0, 0, 2, "左");
        layer.push(0, 1, 8, "右");
        full_alpha(&mut layer);
        layer.evict_overlaps();
        assert_eq!(layer.len(), 2);
    }
}
