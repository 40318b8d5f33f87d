//! # 指令调度
//!
//! 把一条 [`Directive`] 落实到会话状态上。每个分支返回
//! `Ok(true)` 表示游标可以推进，`Ok(false)` 表示指令尚未完成、
//! 下一帧重新执行同一行——多帧效果（等待、过渡、阻塞选择）只靠
//! 这一个约定，没有别的续体表示。

use tracing::{debug, warn};

use crate::error::{ScriptError, ScriptResult};
use crate::script::directive::{Directive, TextParams};
use crate::session::state::{ChoiceItem, SceneState, WaitState, WidgetState};
use crate::session::SceneSession;
use crate::transition::EffectSpec;

impl SceneSession {
    /// 派发一条指令，返回游标是否可以推进
    pub(super) fn execute(&mut self, directive: Directive) -> ScriptResult<bool> {
        match directive {
            Directive::Blank => Ok(true),

            Directive::ForceQuit => {
                debug!(scene = %self.document.scene(), "强制退出");
                self.state.running = false;
                Ok(true)
            }

            Directive::ClearCharacters { bank } => {
                // 与原引擎一致：编号不小于在场角色数时按空操作处理
                if bank != -1 && bank >= self.state.characters.len() as i64 {
                    return Ok(true);
                }
                Ok(self.state.characters.fade_out_step(bank))
            }

            Directive::LoadBank { folder, slot } => {
                let keys = self
                    .images
                    .load_character_bank(&folder)
                    .map_err(|e| self.script_error(e.to_string()))?;
                debug!(folder = %folder, slot, count = keys.len(), "载入角色图库");
                self.state.banks[slot as usize].extend(keys);
                self.state.bank_log.push((folder, slot));
                Ok(true)
            }

            Directive::TextOpen(params) => self.text_open(params),

            Directive::TextClose => {
                if !self.state.is_skip && !self.state.is_auto {
                    self.state.scene_state = SceneState::Read;
                }
                if !self.state.advance {
                    return Ok(false);
                }
                self.state.advance = false;
                self.state.in_text_block = false;
                Ok(true)
            }

            Directive::Wait { frames } => {
                let wait = self.state.wait.get_or_insert(WaitState {
                    remaining: frames.max(0) as u32,
                });
                if wait.remaining > 0 {
                    wait.remaining -= 1;
                    Ok(false)
                } else {
                    self.state.wait = None;
                    Ok(true)
                }
            }

            Directive::Shake { magnitude } => {
                self.state.shake = magnitude;
                Ok(true)
            }

            Directive::ChoiceOpen => {
                self.state.scene_state = SceneState::Read;
                self.state.advance = false;
                self.state.choices.clear();
                self.state.selection = -1;
                self.state.in_choice_block = true;
                Ok(true)
            }

            Directive::ChoiceClose => {
                self.state.scene_state = SceneState::Choose;
                if self.state.selection == -1 {
                    return Ok(false);
                }
                self.state.in_choice_block = false;
                self.state.scene_state = SceneState::Read;
                self.state.advance = false;
                Ok(true)
            }

            Directive::ChoiceEntry { id, prompt } => {
                let row = self.state.choices.len() as i32;
                let (w, h) = self.config.screen_size;
                let row_height = (self.config.choice_row_height as f32 * 1.2) as i32;
                let pos = (w as i32 / 2, (row + 1) * row_height + h as i32 / 8);
                self.state.choices.push(ChoiceItem { id, prompt, pos });
                Ok(true)
            }

            Directive::Branch { id } => {
                match id {
                    Some(id) => {
                        if id == self.state.selection {
                            // 命中的分支：清掉选择，落入后续行
                            self.state.selection = -1;
                        } else {
                            self.state.scene_state = SceneState::OptBranch;
                        }
                    }
                    // 裸 .branch: 是分支终点
                    None => self.state.scene_state = SceneState::Read,
                }
                Ok(true)
            }

            Directive::SetAnchor { anchor } => {
                self.state.anchor = anchor;
                Ok(true)
            }

            Directive::SceneIn {
                folder,
                file,
                effect,
            } => self.scene_in(folder, file, effect),

            Directive::SceneOut { effect } => self.scene_out(effect),

            Directive::Music { name } => {
                match name {
                    Some(name) => {
                        self.audio
                            .play_music(&name, self.config.volume)
                            .map_err(|e| self.script_error(e.to_string()))?;
                        debug!(music = %name, "播放音乐");
                        self.state.last_music = Some(name);
                    }
                    None => {
                        self.audio.stop_music();
                        self.state.last_music = None;
                    }
                }
                Ok(true)
            }

            Directive::Sound { name } => {
                // 跳过模式下不触发音效
                if self.state.is_skip {
                    return Ok(true);
                }
                match name {
                    Some(name) => {
                        self.audio
                            .play_sound(&name, self.config.sound_volume)
                            .map_err(|e| self.script_error(e.to_string()))?;
                        self.state.sound_playing = true;
                    }
                    None => {
                        self.audio.stop_sound();
                        self.state.sound_playing = false;
                    }
                }
                Ok(true)
            }

            Directive::SetFade { rate } => {
                self.state.transition.fade_rate = rate as i32;
                Ok(true)
            }

            Directive::Hide => self.hide_to(0),
            Directive::Show => self.hide_to(255),

            Directive::Swap { scene } => {
                self.swap_scene(&scene)?;
                // 新文档从第 0 行开始，本帧不推进
                Ok(false)
            }

            Directive::Widget { label, anchor } => {
                self.state.widget = Some(WidgetState { label, anchor });
                Ok(true)
            }

            Directive::Assign { var, op, operand } => {
                self.state
                    .vars
                    .apply(&var, op, &operand)
                    .map_err(|e| self.script_error(e.to_string()))?;
                Ok(true)
            }

            Directive::If { cond } => match cond {
                // 裸 .if: 是条件块终点
                None => {
                    self.state.scene_state = SceneState::Read;
                    Ok(true)
                }
                Some((var, cmp, operand)) => {
                    let lhs = self
                        .state
                        .vars
                        .get(&var)
                        .map_err(|e| self.script_error(e.to_string()))?;
                    let rhs = self
                        .state
                        .vars
                        .resolve(&operand)
                        .map_err(|e| self.script_error(e.to_string()))?;
                    if !cmp.eval(lhs, rhs) {
                        self.state.scene_state = SceneState::VarBranch;
                    }
                    Ok(true)
                }
            },

            Directive::Dialogue { text } => {
                self.state.dialogue.push_line(text);
                Ok(true)
            }

            Directive::Unknown => {
                warn!(
                    scene = %self.document.scene(),
                    line = self.state.cursor + 1,
                    "未识别的行，按空操作跳过"
                );
                Ok(true)
            }
        }
    }

    /// 文本块开启：可选地入场角色，并（除非 skip）追加新对话页
    fn text_open(&mut self, params: TextParams) -> ScriptResult<bool> {
        self.state.advance = false;
        if let Some(bank) = params.bank {
            if !(0..8).contains(&bank) {
                return Err(self.script_error(format!("引用了不存在的角色图库 {bank}")));
            }
            let bank_idx = bank as usize;
            let bank_len = self.state.banks[bank_idx].len();
            if bank_len == 0 {
                return Err(self.script_error(format!("引用了不存在的角色图库 {bank}")));
            }
            if params.emotion < 0 || params.emotion as usize >= bank_len {
                return Err(self.script_error(format!("引用了不存在的子图 {}", params.emotion)));
            }
            let emotion = params.emotion as usize;
            if self
                .state
                .characters
                .should_add(emotion, &params.name, params.slot)
            {
                self.state
                    .characters
                    .push(bank_idx, emotion, params.slot, params.name.clone());
            }
        }
        if !params.skip {
            self.state.dialogue.append_page(params.name);
        }
        self.state.in_text_block = true;
        Ok(true)
    }

    /// `.scenein`：首帧载图并登记效果，之后逐帧推进到全部完成
    fn scene_in(
        &mut self,
        folder: String,
        file: String,
        effect: Option<EffectSpec>,
    ) -> ScriptResult<bool> {
        if !self.state.scene_loading {
            if let Some(spec) = &effect {
                self.state.transition.begin(spec, false);
            }
            let key = self
                .images
                .load_scene_image(&folder, &file)
                .map_err(|e| self.script_error(e.to_string()))?;
            debug!(folder = %folder, file = %file, "载入场景图");
            let bg = &mut self.state.background;
            bg.old_key = bg.key.take();
            bg.key = Some(key);
            bg.source = Some((folder, file));
            bg.hidden = false;
            self.state.scene_loading = true;
        }
        let done = self
            .state
            .transition
            .step()
            .map_err(|e| self.script_error(e.to_string()))?;
        if !done {
            return Ok(false);
        }
        self.state.scene_loading = false;
        self.state.background.old_key = None;
        self.state.auto.armed = false;
        Ok(true)
    }

    /// `.sceneout`：背景身份保留，但过渡完成后不再显示
    fn scene_out(&mut self, effect: Option<EffectSpec>) -> ScriptResult<bool> {
        if !self.state.scene_unloading {
            if let Some(spec) = &effect {
                self.state.transition.begin(spec, true);
            }
            self.state.scene_unloading = true;
        }
        let done = self
            .state
            .transition
            .step()
            .map_err(|e| self.script_error(e.to_string()))?;
        if !done {
            return Ok(false);
        }
        self.state.scene_unloading = false;
        self.state.background.hidden = true;
        self.state.auto.armed = false;
        Ok(true)
    }

    /// 界面显隐：每帧走 15，到达目标后的那一帧放行
    fn hide_to(&mut self, target: i32) -> ScriptResult<bool> {
        let hide = &mut self.state.hide;
        if !hide.armed {
            hide.armed = true;
            hide.target = target;
        }
        if hide.alpha > hide.target {
            hide.alpha = (hide.alpha - 15).max(0);
            return Ok(false);
        }
        if hide.alpha < hide.target {
            hide.alpha = (hide.alpha + 15).min(255);
            return Ok(false);
        }
        hide.armed = false;
        Ok(true)
    }

    /// `.swap`：就地换入新场景文档，状态保留
    fn swap_scene(&mut self, scene: &str) -> ScriptResult<()> {
        let text = self.source.load(scene).map_err(|_| {
            ScriptError::new(scene, 0, format!("场景文件 '{scene}.vns' 不存在"))
        })?;
        self.document = crate::script::document::ScriptDocument::new(scene, &text);
        self.state.cursor = 0;
        self.state.finished = self.document.is_empty();
        tracing::info!(scene = %scene, "切换场景");
        Ok(())
    }

    /// 带场景名与当前行号（1-based）的错误
    pub(super) fn script_error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::new(self.document.scene(), self.state.cursor + 1, message)
    }
}
