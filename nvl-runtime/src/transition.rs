//! # 过渡引擎
//!
//! 两个互相独立、可组合的插值器：
//!
//! - 淡入淡出：进度 alpha 以 `fade_rate`/帧 从 0 单调走到 255
//! - 缩放：scale 以 `zoom_rate`/帧 逼近 `target_scale`，到达即停，不越过目标
//!
//! 所属指令在全部已请求的效果到达目标的那一帧恰好完成，
//! 完成时缩放参数复位为 1.0/1.0/0.1，淡入淡出进度归零。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 过渡效果种类（脚本关键字）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Fade,
    ZoomIn,
    ZoomOut,
    FadeZoomIn,
    FadeZoomOut,
}

impl EffectKind {
    /// 识别脚本关键字；未知关键字视为无过渡（瞬切）
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fade" => Some(Self::Fade),
            "zoomin" => Some(Self::ZoomIn),
            "zoomout" => Some(Self::ZoomOut),
            "fadezoomin" => Some(Self::FadeZoomIn),
            "fadezoomout" => Some(Self::FadeZoomOut),
            _ => None,
        }
    }

    pub fn has_zoom(&self) -> bool {
        !matches!(self, Self::Fade)
    }
}

/// 一次过渡请求：效果种类 + 可选的缩放参数覆盖
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub kind: EffectKind,
    /// 起始缩放
    pub scale: Option<f32>,
    /// 目标缩放
    pub target: Option<f32>,
    /// 每帧缩放步进
    pub rate: Option<f32>,
}

impl EffectSpec {
    pub fn plain(kind: EffectKind) -> Self {
        Self {
            kind,
            scale: None,
            target: None,
            rate: None,
        }
    }
}

/// 缩放走到了非正值
#[derive(Error, Debug, Clone, PartialEq)]
#[error("非法缩放比例: {0}（比例必须大于 0）")]
pub struct InvalidScale(pub f32);

/// 过渡状态机
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionState {
    /// 淡入淡出进度 0-255
    pub fade_alpha: i32,
    /// 每帧 alpha 步进（`.setfade` 可改）
    pub fade_rate: i32,
    pub zoom_scale: f32,
    pub target_scale: f32,
    pub zoom_rate: f32,
    pub fade_in: bool,
    pub fade_out: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
}

impl TransitionState {
    pub fn new() -> Self {
        Self {
            fade_alpha: 0,
            fade_rate: 5,
            zoom_scale: 1.0,
            target_scale: 1.0,
            zoom_rate: 0.1,
            fade_in: false,
            fade_out: false,
            zoom_in: false,
            zoom_out: false,
        }
    }

    /// 依请求设置效果标志与缩放参数；`outgoing` 表示退场方向
    pub fn begin(&mut self, spec: &EffectSpec, outgoing: bool) {
        match spec.kind {
            EffectKind::Fade => {
                if outgoing {
                    self.fade_out = true;
                } else {
                    self.fade_in = true;
                }
            }
            EffectKind::ZoomIn => self.zoom_in = true,
            EffectKind::ZoomOut => self.zoom_out = true,
            EffectKind::FadeZoomIn => {
                if outgoing {
                    self.fade_out = true;
                } else {
                    self.fade_in = true;
                }
                self.zoom_in = true;
            }
            EffectKind::FadeZoomOut => {
                if outgoing {
                    self.fade_out = true;
                } else {
                    self.fade_in = true;
                }
                self.zoom_out = true;
            }
        }
        if let Some(s) = spec.scale {
            self.zoom_scale = s;
        }
        if let Some(t) = spec.target {
            self.target_scale = t;
        }
        if let Some(r) = spec.rate {
            self.zoom_rate = r;
        }
    }

    pub fn is_active(&self) -> bool {
        self.fade_in || self.fade_out || self.zoom_in || self.zoom_out
    }

    /// 推进一帧；全部效果到达目标时清除标志并返回 true。
    /// 没有任何激活效果时立即返回 true（瞬切）。
    pub fn step(&mut self) -> Result<bool, InvalidScale> {
        if self.fade_in || self.fade_out {
            self.fade_alpha = (self.fade_alpha + self.fade_rate).min(255);
            if self.fade_alpha >= 255 {
                self.fade_in = false;
                self.fade_out = false;
                self.fade_alpha = 0;
            }
        }
        if self.zoom_in {
            self.zoom_scale = (self.zoom_scale + self.zoom_rate).min(self.target_scale);
            if self.zoom_scale <= 0.0 {
                return Err(InvalidScale(self.zoom_scale));
            }
            if self.zoom_scale >= self.target_scale {
                self.reset_zoom();
            }
        } else if self.zoom_out {
            self.zoom_scale = (self.zoom_scale - self.zoom_rate).max(self.target_scale);
            if self.zoom_scale <= 0.0 {
                return Err(InvalidScale(self.zoom_scale));
            }
            if self.zoom_scale <= self.target_scale {
                self.reset_zoom();
            }
        }
        Ok(!self.is_active())
    }

    fn reset_zoom(&mut self) {
        self.zoom_in = false;
        self.zoom_out = false;
        self.zoom_scale = 1.0;
        self.target_scale = 1.0;
        self.zoom_rate = 0.1;
    }

    /// 回到稳态（读档后过渡不保留）
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for TransitionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_monotonic_exact_tick() {
        let mut t = TransitionState::new();
        t.begin(&EffectSpec::plain(EffectKind::Fade), false);

        // 速率 5：第 51 帧恰好到达 255 并完成，此前单调递增
        let mut last = 0;
        for frame in 1..=51 {
            let done = t.step().unwrap();
            if frame < 51 {
                assert!(!done, "第 {frame} 帧不应完成");
                assert!(t.fade_alpha > last);
                last = t.fade_alpha;
            } else {
                assert!(done, "第 51 帧应恰好完成");
            }
        }
        assert!(!t.is_active());
    }

    #[test]
    fn test_zoom_out_clamps_to_target() {
        let mut t = TransitionState::new();
        t.begin(
            &EffectSpec {
                kind: EffectKind::ZoomOut,
                scale: Some(1.0),
                target: Some(0.5),
                rate: Some(0.125),
            },
            false,
        );

        let mut frames = 0;
        loop {
            frames += 1;
            let before = t.zoom_scale;
            if t.step().unwrap() {
                break;
            }
            assert!(t.zoom_scale < before, "缩放必须单调逼近目标");
            assert!(t.zoom_scale >= 0.5, "不允许越过目标");
        }
        assert_eq!(frames, 4);
        // 完成后复位
        assert_eq!(t.zoom_scale, 1.0);
        assert_eq!(t.target_scale, 1.0);
    }

    #[test]
    fn test_fadezoom_waits_for_slowest() {
        let mut t = TransitionState::new();
        t.fade_rate = 200; // 淡入 2 帧完成
        t.begin(
            &EffectSpec {
                kind: EffectKind::FadeZoomIn,
                scale: Some(0.5),
                target: Some(1.5),
                rate: Some(0.25),
            },
            false,
        );

        let mut frames = 0;
        while !t.step().unwrap() {
            frames += 1;
            assert!(frames < 30);
        }
        // 缩放需要 4 帧，晚于淡入完成
        assert_eq!(frames + 1, 4);
    }

    #[test]
    fn test_non_positive_scale_is_fatal() {
        let mut t = TransitionState::new();
        t.begin(
            &EffectSpec {
                kind: EffectKind::ZoomOut,
                scale: Some(0.4),
                target: Some(-1.0),
                rate: Some(0.3),
            },
            false,
        );
        let mut result = Ok(false);
        for _ in 0..10 {
            result = t.step();
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(InvalidScale(_))));
    }

    #[test]
    fn test_instant_cut_without_effects() {
        let mut t = TransitionState::new();
        assert!(t.step().unwrap());
    }

    #[test]
    fn test_outgoing_fade_sets_fade_out() {
        let mut t = TransitionState::new();
        t.begin(&EffectSpec::plain(EffectKind::Fade), true);
        assert!(t.fade_out);
        assert!(!t.fade_in);
    }
}
