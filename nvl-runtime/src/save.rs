//! # Save 模块
//!
//! 存档的行式文本编解码与槽位文件管理。
//!
//! ## 格式
//!
//! ```text
//! begin
//! name: 说话人
//! 对话行...
//! end
//!
//! scene: 001
//! index: 042
//! background: bg, 003
//! text_index: 5, 5
//! widget: 6月12日 早晨
//! nonzero_var: $aa, 7
//! music: theme
//! shake: 8, 4
//! load: cast, 0
//! draw: 0, 2, 8, Alice
//! xy: 0, 3
//! datetime: 2026-8-8, 14:05
//! ```
//!
//! `begin`/`end` 之间是完整的回看记录；`xy:` 与 `datetime:`
//! 由槽位库在写盘时盖章。全文 UTF-8。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SaveError;

/// 回看记录中的一页
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BacklogPage {
    pub speaker: String,
    pub lines: Vec<String>,
}

/// 一条在场角色记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub bank: usize,
    pub emotion: usize,
    pub slot: i64,
    pub name: String,
}

/// 存档记录：自描述的文本快照
///
/// 不引用脚本文档本身；场景由 `scene` 字段在读档时重新载入。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SaveRecord {
    /// 完整回看记录
    pub backlog: Vec<BacklogPage>,
    /// 场景名
    pub scene: String,
    /// 恢复游标（已回退到当前页的起始行）
    pub index: usize,
    /// 背景来源（folder, file）
    pub background: Option<(String, String)>,
    /// 回看索引（当前, 最新）
    pub text_index: (i64, i64),
    /// 挂件文字
    pub widget: Option<String>,
    /// 非零变量（标识符升序）
    pub variables: Vec<(String, i64)>,
    /// 在播音乐
    pub music: Option<String>,
    /// 抖动幅度
    pub shake: Option<(i64, i64)>,
    /// 最近载入的角色图库（最多 4 条，最近在前）
    pub banks: Vec<(String, i64)>,
    /// 在场角色
    pub characters: Vec<DrawRecord>,
    /// 存档栅格坐标（槽位库写盘时填写）
    pub grid_xy: Option<(u32, u32)>,
    /// 保存时刻（槽位库写盘时填写，兼作槽位标签）
    pub datetime: Option<String>,
}

impl SaveRecord {
    /// 编码为行式文本
    pub fn encode(&self) -> String {
        let mut out = String::from("begin\n");
        for page in &self.backlog {
            out.push_str(&format!("name: {}\n", page.speaker));
            for line in &page.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("end\n\n");
        out.push_str(&format!("scene: {}\n", self.scene));
        out.push_str(&format!("index: {:03}\n", self.index));
        match &self.background {
            Some((folder, file)) => out.push_str(&format!("background: {folder}, {file}\n")),
            None => out.push_str("background: null, null\n"),
        }
        out.push_str(&format!(
            "text_index: {}, {}\n",
            self.text_index.0, self.text_index.1
        ));
        out.push_str(&format!(
            "widget: {}\n",
            self.widget.as_deref().unwrap_or("null")
        ));
        for (name, value) in &self.variables {
            out.push_str(&format!("nonzero_var: ${name}, {value}\n"));
        }
        if let Some(music) = &self.music {
            out.push_str(&format!("music: {music}\n"));
        }
        if let Some((dx, dy)) = self.shake {
            out.push_str(&format!("shake: {dx}, {dy}\n"));
        }
        for (folder, slot) in &self.banks {
            out.push_str(&format!("load: {folder}, {slot}\n"));
        }
        for c in &self.characters {
            out.push_str(&format!(
                "draw: {}, {}, {}, {}\n",
                c.bank, c.emotion, c.slot, c.name
            ));
        }
        if let Some((x, y)) = self.grid_xy {
            out.push_str(&format!("xy: {x}, {y}\n"));
        }
        if let Some(dt) = &self.datetime {
            out.push_str(&format!("datetime: {dt}\n"));
        }
        out
    }

    /// 从行式文本解码
    pub fn decode(text: &str) -> Result<Self, SaveError> {
        let mut record = SaveRecord::default();
        let mut in_backlog = false;

        for (i, line) in text.lines().enumerate() {
            let lineno = i + 1;

            if in_backlog {
                if line.starts_with("end") {
                    in_backlog = false;
                } else if let Some(rest) = line.strip_prefix("name:") {
                    record.backlog.push(BacklogPage {
                        speaker: rest.trim().to_string(),
                        lines: Vec::new(),
                    });
                } else {
                    match record.backlog.last_mut() {
                        Some(page) => page.lines.push(line.trim().to_string()),
                        None => {
                            return Err(SaveError::Malformed {
                                line: lineno,
                                message: "对话行出现在 name: 之前".to_string(),
                            });
                        }
                    }
                }
                continue;
            }

            if line.starts_with("begin") {
                in_backlog = true;
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "scene" => record.scene = value.to_string(),
                "index" => {
                    record.index = parse_num(value, lineno, "index")?;
                }
                "background" => {
                    let (a, b) = split_pair(value, lineno, "background")?;
                    record.background = if a == "null" && b == "null" {
                        None
                    } else {
                        Some((a, b))
                    };
                }
                "text_index" => {
                    let (a, b) = split_pair(value, lineno, "text_index")?;
                    record.text_index =
                        (parse_num(&a, lineno, "text_index")?, parse_num(&b, lineno, "text_index")?);
                }
                "widget" => {
                    record.widget = (value != "null").then(|| value.to_string());
                }
                "nonzero_var" => {
                    let (name, v) = split_pair(value, lineno, "nonzero_var")?;
                    record.variables.push((
                        name.trim_start_matches('$').to_string(),
                        parse_num(&v, lineno, "nonzero_var")?,
                    ));
                }
                "music" => record.music = Some(value.to_string()),
                "shake" => {
                    let (a, b) = split_pair(value, lineno, "shake")?;
                    record.shake =
                        Some((parse_num(&a, lineno, "shake")?, parse_num(&b, lineno, "shake")?));
                }
                "load" => {
                    let (folder, slot) = split_pair(value, lineno, "load")?;
                    record.banks.push((folder, parse_num(&slot, lineno, "load")?));
                }
                "draw" => {
                    let fields: Vec<&str> = value.splitn(4, ',').map(|s| s.trim()).collect();
                    if fields.len() < 4 {
                        return Err(SaveError::Malformed {
                            line: lineno,
                            message: "draw 需要四个字段".to_string(),
                        });
                    }
                    record.characters.push(DrawRecord {
                        bank: parse_num(fields[0], lineno, "draw")?,
                        emotion: parse_num(fields[1], lineno, "draw")?,
                        slot: parse_num(fields[2], lineno, "draw")?,
                        name: fields[3].to_string(),
                    });
                }
                "xy" => {
                    let (a, b) = split_pair(value, lineno, "xy")?;
                    record.grid_xy =
                        Some((parse_num(&a, lineno, "xy")?, parse_num(&b, lineno, "xy")?));
                }
                "datetime" => record.datetime = Some(value.to_string()),
                // 未知键忽略（与对话同形的内容也会落到这里）
                _ => {}
            }
        }
        Ok(record)
    }
}

fn split_pair(value: &str, line: usize, key: &str) -> Result<(String, String), SaveError> {
    let mut it = value.splitn(2, ',');
    match (it.next(), it.next()) {
        (Some(a), Some(b)) => Ok((a.trim().to_string(), b.trim().to_string())),
        _ => Err(SaveError::Malformed {
            line,
            message: format!("{key} 需要一对值"),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(s: &str, line: usize, key: &str) -> Result<T, SaveError> {
    s.parse::<T>().map_err(|_| SaveError::Malformed {
        line,
        message: format!("{key} 的值不是数字: '{s}'"),
    })
}

/// 槽位信息（存档/读档界面用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: u32,
    pub datetime: Option<String>,
}

/// 存档槽位库：目录下的 `NNN.sav` 文件
///
/// 写盘时按槽位号导出栅格坐标（`slot = x·行数 + y`）并盖上时间戳。
pub struct SlotStore {
    dir: PathBuf,
    grid: (u32, u32),
}

impl SlotStore {
    pub fn new(dir: impl AsRef<Path>, grid: (u32, u32)) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            grid,
        }
    }

    pub fn slot_path(&self, slot: u32) -> PathBuf {
        self.dir.join(format!("{slot:03}.sav"))
    }

    pub fn exists(&self, slot: u32) -> bool {
        self.slot_path(slot).exists()
    }

    /// 写入槽位，盖章 `xy:` 与 `datetime:`
    pub fn write(&self, slot: u32, record: &SaveRecord) -> Result<(), SaveError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| SaveError::Io(format!("无法创建存档目录: {e}")))?;

        let rows = self.grid.1.max(1);
        let mut record = record.clone();
        record.grid_xy = Some((slot / rows, slot % rows));
        record.datetime = Some(Local::now().format("%Y-%-m-%-d, %H:%M").to_string());

        let path = self.slot_path(slot);
        fs::write(&path, record.encode())
            .map_err(|e| SaveError::Io(format!("无法写入存档文件: {e}")))?;
        info!(slot, path = %path.display(), "写入存档");
        Ok(())
    }

    /// 读取槽位
    pub fn read(&self, slot: u32) -> Result<SaveRecord, SaveError> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Err(SaveError::NotFound(path.to_string_lossy().to_string()));
        }
        let text =
            fs::read_to_string(&path).map_err(|e| SaveError::Io(format!("无法读取存档文件: {e}")))?;
        SaveRecord::decode(&text)
    }

    /// 删除槽位
    pub fn delete(&self, slot: u32) -> Result<(), SaveError> {
        let path = self.slot_path(slot);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| SaveError::Io(format!("无法删除存档文件: {e}")))?;
        }
        Ok(())
    }

    /// 列出全部已存在的槽位（升序）
    pub fn list(&self) -> Vec<SlotInfo> {
        let mut slots = Vec::new();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return slots;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(".sav") else {
                continue;
            };
            let Ok(slot) = stem.parse::<u32>() else {
                continue;
            };
            let datetime = fs::read_to_string(&path)
                .ok()
                .and_then(|text| SaveRecord::decode(&text).ok())
                .and_then(|r| r.datetime);
            slots.push(SlotInfo { slot, datetime });
        }
        slots.sort_by_key(|s| s.slot);
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample_record() -> SaveRecord {
        SaveRecord {
            backlog: vec![
                BacklogPage {
                    speaker: "Alice".to_string(),
                    lines: vec!["你好。".to_string(), "初次见面。".to_string()],
                },
                BacklogPage {
                    speaker: "Bob".to_string(),
                    lines: vec!["回见。".to_string()],
                },
            ],
            scene: "001".to_string(),
            index: 42,
            background: Some(("bg".to_string(), "003".to_string())),
            text_index: (1, 1),
            widget: Some("6月12日 早晨".to_string()),
            variables: vec![("aa".to_string(), 7), ("qv".to_string(), -2)],
            music: Some("theme".to_string()),
            shake: Some((8, 4)),
            banks: vec![("cast".to_string(), 0)],
            characters: vec![DrawRecord {
                bank: 0,
                emotion: 2,
                slot: 8,
                name: "Alice".to_string(),
            }],
            grid_xy: Some((0, 3)),
            datetime: Some("2026-8-8, 14:05".to_string()),
        }
    }

    #[test]
    fn test_encode_format() {
        let text = sample_record().encode();
        insta::assert_snapshot!(text, @r"
        begin
        name: Alice
        你好。
        初次见面。
        name: Bob
        回见。
        end

        scene: 001
        index: 042
        background: bg, 003
        text_index: 1, 1
        widget: 6月12日 早晨
        nonzero_var: $aa, 7
        nonzero_var: $qv, -2
        music: theme
        shake: 8, 4
        load: cast, 0
        draw: 0, 2, 8, Alice
        xy: 0, 3
        datetime: 2026-8-8, 14:05
        ");
    }

    #[test]
    fn test_roundtrip() {
        let record = sample_record();
        let decoded = SaveRecord::decode(&record.encode()).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_decode_null_fields() {
        let text = "begin\nend\n\nscene: 001\nindex: 000\nbackground: null, null\n\
                    text_index: 0, 0\nwidget: null\n";
        let record = SaveRecord::decode(text).unwrap();
        assert!(record.backlog.is_empty());
        assert!(record.background.is_none());
        assert!(record.widget.is_none());
        assert!(record.music.is_none());
    }

    #[test]
    fn test_decode_malformed_pair() {
        let text = "scene: x\nbackground: 只有一个值\n";
        assert!(matches!(
            SaveRecord::decode(text),
            Err(SaveError::Malformed { line: 2, .. })
        ));
    }

    #[test]
    fn test_decode_utf8_dialogue() {
        let text = "begin\nname: 店主\nいらっしゃいませ！\nend\n\nscene: 001\nindex: 000\n";
        let record = SaveRecord::decode(text).unwrap();
        assert_eq!(record.backlog[0].speaker, "店主");
        assert_eq!(record.backlog[0].lines[0], "いらっしゃいませ！");
    }

    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let thread_id = std::thread::current().id();
        env::temp_dir().join(format!("nvl_runtime_test_saves_{id}_{thread_id:?}"))
    }

    #[test]
    fn test_slot_store_roundtrip() {
        let dir = unique_temp_dir();
        let store = SlotStore::new(&dir, (2, 7));

        let record = sample_record();
        store.write(3, &record).unwrap();
        assert!(store.exists(3));

        let loaded = store.read(3).unwrap();
        // 回看与变量逐项一致
        assert_eq!(loaded.backlog, record.backlog);
        assert_eq!(loaded.variables, record.variables);
        // 栅格坐标由槽位号导出：3 = 0*7 + 3
        assert_eq!(loaded.grid_xy, Some((0, 3)));
        // 时间戳被写盘时的时刻覆盖
        assert!(loaded.datetime.is_some());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_slot_store_grid_coordinates() {
        let dir = unique_temp_dir();
        let store = SlotStore::new(&dir, (2, 7));
        store.write(9, &SaveRecord::default()).unwrap();
        // 9 = 1*7 + 2
        assert_eq!(store.read(9).unwrap().grid_xy, Some((1, 2)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_slot_store_missing() {
        let dir = unique_temp_dir();
        let store = SlotStore::new(&dir, (2, 7));
        assert!(matches!(store.read(1), Err(SaveError::NotFound(_))));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_slot_store_list() {
        let dir = unique_temp_dir();
        let store = SlotStore::new(&dir, (2, 7));
        for slot in [5, 1, 8] {
            store.write(slot, &SaveRecord::default()).unwrap();
        }
        let slots: Vec<u32> = store.list().iter().map(|s| s.slot).collect();
        assert_eq!(slots, vec![1, 5, 8]);
        let _ = fs::remove_dir_all(&dir);
    }
}
