//! # 场景会话
//!
//! 帧循环驱动的脚本解释器。任意时刻只有一个会话处于活动状态，
//! 它独占全部可变状态。
//!
//! ## 执行模型
//!
//! ```text
//! 每个演出帧（60Hz）:
//!   tick(input) -> FrameReport
//!     1. 解释当前行；多帧指令返回「尚不推进」时停在原行
//!     2. 分支寻址状态在同一帧内扫描到目标行
//!     3. 角色淡入、同槽压盖、对话滚动逐帧推进
//!     4. 跳过/自动模式推进
//!     5. 帧末消费玩家输入，下一帧生效
//!   frame() -> RenderFrame（只读绘制清单，交给宿主）
//! ```

mod executor;
mod frame;
mod state;

pub use frame::{
    BackgroundView, CharacterView, ChoiceView, LineView, RenderFrame, TextboxView, WidgetView,
};
pub use state::{
    AutoState, BackgroundState, ChoiceItem, HideState, InterpreterState, SceneState, WaitState,
    WidgetState,
};

use tracing::info;

use crate::anchor::Anchor;
use crate::assets::{AudioProvider, ImageProvider, SceneSource};
use crate::config::SessionConfig;
use crate::error::{ScriptError, ScriptResult};
use crate::input::PlayerInput;
use crate::save::{BacklogPage, DrawRecord, SaveRecord};
use crate::script::document::ScriptDocument;
use crate::script::parser::{ParseContext, parse_line};

/// 一帧的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// 本帧游标是否推进
    pub advanced: bool,
    /// 演出是否仍在运行（`.forcequit` 置假）
    pub running: bool,
    /// 游标是否已到达最后一行
    pub finished: bool,
}

/// 场景会话
pub struct SceneSession {
    pub(crate) config: SessionConfig,
    pub(crate) source: Box<dyn SceneSource>,
    pub(crate) images: Box<dyn ImageProvider>,
    pub(crate) audio: Box<dyn AudioProvider>,
    pub(crate) document: ScriptDocument,
    pub(crate) state: InterpreterState,
}

impl SceneSession {
    /// 载入场景并创建会话
    pub fn new(
        scene: &str,
        config: SessionConfig,
        mut source: Box<dyn SceneSource>,
        images: Box<dyn ImageProvider>,
        audio: Box<dyn AudioProvider>,
    ) -> ScriptResult<Self> {
        let text = source.load(scene).map_err(|_| {
            ScriptError::new(scene, 0, format!("场景文件 '{scene}.vns' 不存在"))
        })?;
        let document = ScriptDocument::new(scene, &text);
        let mut state = InterpreterState::new();
        state.finished = document.is_empty();
        info!(scene = %scene, lines = document.len(), "载入场景");
        Ok(Self {
            config,
            source,
            images,
            audio,
            document,
            state,
        })
    }

    /// 推进一帧
    pub fn tick(&mut self, input: Option<PlayerInput>) -> ScriptResult<FrameReport> {
        if !self.state.running {
            return Ok(self.report(false));
        }

        let mut advanced = false;
        if !self.state.finished {
            let raw = self
                .document
                .line(self.state.cursor)
                .unwrap_or("")
                .to_string();
            let ctx = ParseContext {
                in_text_block: self.state.in_text_block,
                in_choice_block: self.state.in_choice_block,
                reading: self.state.scene_state == SceneState::Read,
            };
            let directive =
                parse_line(&raw, ctx).map_err(|fault| self.script_error(fault.message))?;
            let cursor_before = self.state.cursor;
            if self.execute(directive)?
                && self.state.cursor == cursor_before
                && !self.state.finished
            {
                self.advance_cursor();
                advanced = true;
            }
        }

        // 分支寻址在同一帧内扫描完成
        match self.state.scene_state {
            SceneState::OptBranch => self.seek_opt_branch(),
            SceneState::VarBranch => self.seek_var_branch(),
            _ => {}
        }

        // 每帧动画推进
        self.state.characters.fade_in_step();
        self.state.characters.evict_overlaps();
        self.state.dialogue.scroll_step(self.config.scroll_speed);

        // 跳过 / 自动模式
        if self.state.is_skip {
            self.request_advance();
        } else if self.state.is_auto {
            self.auto_advance();
        }

        // 输入在帧末消费，下一帧生效
        if let Some(input) = input {
            self.apply_input(input);
        }

        Ok(self.report(advanced))
    }

    fn report(&self, advanced: bool) -> FrameReport {
        FrameReport {
            advanced,
            running: self.state.running,
            finished: self.state.finished,
        }
    }

    fn advance_cursor(&mut self) {
        self.state.cursor += 1;
        if self.state.cursor >= self.document.len() {
            self.state.cursor = self.document.len().saturating_sub(1);
            self.state.finished = true;
        }
    }

    /// 向后扫描到裸 `.branch:` 行
    fn seek_opt_branch(&mut self) {
        if self.state.finished {
            return;
        }
        while !is_bare_branch(self.document.line(self.state.cursor).unwrap_or("")) {
            self.state.cursor += 1;
            if self.state.cursor >= self.document.len() {
                self.state.cursor = self.document.len().saturating_sub(1);
                self.state.finished = true;
                break;
            }
        }
    }

    /// 向后扫描到下一个 `.if` 行
    fn seek_var_branch(&mut self) {
        if self.state.finished {
            return;
        }
        while !is_if_line(self.document.line(self.state.cursor).unwrap_or("")) {
            self.state.cursor += 1;
            if self.state.cursor >= self.document.len() {
                self.state.cursor = self.document.len().saturating_sub(1);
                self.state.finished = true;
                break;
            }
        }
    }

    /// 推进请求：最新页未滚完时先瞬间滚完，已滚完才放行；
    /// 回看旧页时改为前进一页
    fn request_advance(&mut self) {
        if self.state.dialogue.viewing_latest() {
            if self.state.dialogue.force_complete_latest() {
                self.state.advance = true;
            }
        } else {
            self.state.dialogue.forward();
        }
    }

    /// 自动模式：整页滚完后停顿固定帧数再放行
    fn auto_advance(&mut self) {
        if !self.state.dialogue.viewing_latest() || !self.state.dialogue.latest_complete() {
            return;
        }
        if !self.state.auto.armed {
            self.state.auto.counter = self.config.auto_pause;
            self.state.auto.armed = true;
        }
        self.state.auto.counter = self.state.auto.counter.saturating_sub(1);
        if self.state.auto.counter == 0 {
            self.state.auto.armed = false;
            self.state.advance = true;
        } else {
            self.state.advance = false;
        }
    }

    fn apply_input(&mut self, input: PlayerInput) {
        match input {
            PlayerInput::Advance => {
                if self.state.scene_state == SceneState::Read {
                    self.request_advance();
                }
            }
            PlayerInput::Back => {
                self.state.dialogue.back();
            }
            PlayerInput::PickChoice(id) => {
                if self.state.scene_state == SceneState::Choose
                    && self.state.choices.iter().any(|c| c.id == id)
                {
                    self.state.selection = id;
                    self.state.dialogue.jump_to_latest();
                    self.state.advance = true;
                }
            }
            PlayerInput::ToggleSkip => {
                self.state.is_skip = !self.state.is_skip && !self.state.is_auto;
            }
            PlayerInput::ToggleAuto => {
                self.state.is_auto = !self.state.is_auto && !self.state.is_skip;
            }
        }
    }

    /// 当前帧的绘制清单
    pub fn frame(&self) -> RenderFrame {
        let t = &self.state.transition;
        let bg = &self.state.background;

        let background = match (&bg.key, bg.hidden) {
            (Some(key), false) => {
                let alpha = if t.fade_in {
                    t.fade_alpha
                } else if t.fade_out {
                    255 - t.fade_alpha
                } else {
                    255
                };
                let scale = if t.zoom_in || t.zoom_out {
                    t.zoom_scale
                } else {
                    1.0
                };
                Some(BackgroundView {
                    key: key.clone(),
                    alpha,
                    scale,
                    anchor: self.state.anchor,
                })
            }
            _ => None,
        };

        let old_background = bg.old_key.as_ref().map(|key| BackgroundView {
            key: key.clone(),
            alpha: 255,
            scale: 1.0,
            anchor: self.state.old_anchor,
        });

        let (w, h) = self.config.screen_size;
        let characters = self
            .state
            .characters
            .iter()
            .filter_map(|c| {
                let key = self.state.banks.get(c.bank)?.get(c.emotion)?.clone();
                Some(CharacterView {
                    key,
                    alpha: c.alpha,
                    pos: (c.slot as i32 * (w as i32 / 16), h as i32),
                    name: c.name.clone(),
                })
            })
            .collect();

        let reviewing = !self.state.dialogue.viewing_latest();
        let textbox = self.state.dialogue.viewed().map(|page| TextboxView {
            speaker: page.speaker.clone(),
            lines: page
                .lines
                .iter()
                .map(|l| LineView {
                    text: l.text.clone(),
                    revealed: if reviewing { l.width } else { l.revealed },
                })
                .collect(),
            reviewing,
        });

        let choices = if self.state.scene_state == SceneState::Choose {
            self.state
                .choices
                .iter()
                .map(|c| ChoiceView {
                    id: c.id,
                    prompt: c.prompt.clone(),
                    pos: c.pos,
                })
                .collect()
        } else {
            Vec::new()
        };

        RenderFrame {
            background,
            old_background,
            shake: self.state.shake,
            characters,
            textbox,
            choices,
            ui_alpha: self.state.hide.alpha,
            widget: self.state.widget.as_ref().map(|w| WidgetView {
                label: w.label.clone(),
                anchor: w.anchor,
            }),
            state: self.state.scene_state,
        }
    }

    /// 生成存档记录
    ///
    /// 游标回退到当前对话页的起始 `.text` 行，读档后重放该页。
    pub fn snapshot(&self) -> SaveRecord {
        let mut index = self.state.cursor;
        let mut found = 0;
        while index > 0 {
            if is_text_line(self.document.line(index)) {
                found += 1;
                if found == 2 {
                    break;
                }
            }
            index -= 1;
        }

        SaveRecord {
            backlog: self
                .state
                .dialogue
                .pages()
                .iter()
                .map(|p| BacklogPage {
                    speaker: p.speaker.clone(),
                    lines: p.lines.iter().map(|l| l.text.clone()).collect(),
                })
                .collect(),
            scene: self.document.scene().to_string(),
            index,
            background: self.state.background.source.clone(),
            text_index: (self.state.dialogue.max_index, self.state.dialogue.max_index),
            widget: self.state.widget.as_ref().map(|w| w.label.clone()),
            variables: self.state.vars.nonzero(),
            music: self.state.last_music.clone(),
            shake: self.state.shake,
            banks: self.state.bank_log.iter().rev().take(4).cloned().collect(),
            characters: self
                .state
                .characters
                .iter()
                .map(|c| DrawRecord {
                    bank: c.bank,
                    emotion: c.emotion,
                    slot: c.slot,
                    name: c.name.clone(),
                })
                .collect(),
            grid_xy: None,
            datetime: None,
        }
    }

    /// 从存档恢复
    ///
    /// 把各字段重放进一份全新的解释器状态，再从记录的场景与游标继续。
    /// 过渡效果不保留（回到稳态），在场角色从透明重新淡入。
    pub fn restore_from(&mut self, record: &SaveRecord) -> ScriptResult<()> {
        let scene_err =
            |msg: String| ScriptError::new(record.scene.clone(), 0, msg);

        let mut state = InterpreterState::new();

        // 回看记录：最后一页丢弃，由重放的 .text 重新生成
        for page in &record.backlog {
            state.dialogue.restore_page(&page.speaker, &page.lines);
        }
        state.dialogue.pop_last();
        state.dialogue.prev_index = record.text_index.0 - 1;
        state.dialogue.max_index = record.text_index.1 - 1;

        // 变量
        for (name, value) in &record.variables {
            state
                .vars
                .restore(name, *value)
                .map_err(|e| scene_err(e.to_string()))?;
        }

        // 抖动：全零按关闭处理
        state.shake = record.shake.filter(|(dx, dy)| *dx != 0 || *dy != 0);

        // 音乐
        if let Some(music) = &record.music {
            if music != "None" {
                self.audio
                    .play_music(music, self.config.volume)
                    .map_err(|e| scene_err(e.to_string()))?;
                state.last_music = Some(music.clone());
            }
        }

        // 背景
        if let Some((folder, file)) = &record.background {
            let key = self
                .images
                .load_scene_image(folder, file)
                .map_err(|e| scene_err(e.to_string()))?;
            state.background.key = Some(key);
            state.background.source = Some((folder.clone(), file.clone()));
        }

        // 图库
        for (folder, slot) in &record.banks {
            let keys = self
                .images
                .load_character_bank(folder)
                .map_err(|e| scene_err(e.to_string()))?;
            state.banks[*slot as usize].extend(keys);
            state.bank_log.push((folder.clone(), *slot));
        }

        // 在场角色
        for draw in &record.characters {
            let bank_len = state.banks.get(draw.bank).map(|b| b.len()).unwrap_or(0);
            if bank_len == 0 {
                return Err(scene_err(format!("引用了不存在的角色图库 {}", draw.bank)));
            }
            if draw.emotion >= bank_len {
                return Err(scene_err(format!("引用了不存在的子图 {}", draw.emotion)));
            }
            state
                .characters
                .push(draw.bank, draw.emotion, draw.slot, draw.name.clone());
        }

        // 挂件（锚点不入档，恢复为默认）
        if let Some(label) = &record.widget {
            if label != "null" {
                state.widget = Some(WidgetState {
                    label: label.clone(),
                    anchor: Anchor::Center,
                });
            }
        }

        // 换入场景文档并定位游标
        let text = self.source.load(&record.scene).map_err(|_| {
            scene_err(format!("场景文件 '{}.vns' 不存在", record.scene))
        })?;
        self.document = ScriptDocument::new(&record.scene, &text);
        state.cursor = record.index.min(self.document.len().saturating_sub(1));
        state.finished = self.document.is_empty();
        self.state = state;
        info!(scene = %record.scene, cursor = self.state.cursor, "读档恢复");
        Ok(())
    }

    /// 当前场景名
    pub fn scene(&self) -> &str {
        self.document.scene()
    }

    /// 解释器状态（只读）
    pub fn state(&self) -> &InterpreterState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }
}

fn is_bare_branch(line: &str) -> bool {
    let line = line.split('#').next().unwrap_or("").trim();
    line.starts_with(".branch") && line.replace(':', "").split_whitespace().count() == 1
}

fn is_if_line(line: &str) -> bool {
    line.split('#').next().unwrap_or("").trim().starts_with(".if")
}

fn is_text_line(line: Option<&str>) -> bool {
    line.map(|l| l.trim_start().starts_with(".text")).unwrap_or(false)
}
