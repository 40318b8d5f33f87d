//! # 行解析器
//!
//! 把一行脚本文本解析为 [`Directive`]。手写字符串解析，无正则依赖。
//!
//! 行的分类依赖两个会话标志（文本块/选项块是否开启），由调用方通过
//! [`ParseContext`] 传入。解析失败返回 [`ParseFault`]，由调用方补上
//! 场景名与行号后升级为致命的 `ScriptError`。

use crate::anchor::Anchor;
use crate::script::directive::{Directive, TextParams};
use crate::transition::{EffectKind, EffectSpec};
use crate::vars::{AssignOp, Comparator, Operand};

/// 解析上下文：影响行分类的会话标志
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseContext {
    /// 文本块是否开启
    pub in_text_block: bool,
    /// 选项块是否开启
    pub in_choice_block: bool,
    /// 状态机是否处于 READ（原始行只在 READ 下记为对话）
    pub reading: bool,
}

/// 解析失败（不含位置，由调用方补全）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFault {
    pub message: String,
}

impl ParseFault {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// 解析一行脚本
pub fn parse_line(raw: &str, ctx: ParseContext) -> Result<Directive, ParseFault> {
    // 第一个 # 起整段是注释
    let line = raw.split('#').next().unwrap_or("").trim();

    if line.is_empty() && !ctx.in_text_block {
        return Ok(Directive::Blank);
    }

    if line.starts_with(".forcequit") {
        return Ok(Directive::ForceQuit);
    }
    if line.starts_with(".load") {
        return parse_load(line);
    }
    if line.starts_with(".text") {
        return parse_text(line, ctx);
    }
    if line.starts_with(".wait") {
        return parse_wait(line);
    }
    if line.starts_with(".shake") {
        return parse_shake(line);
    }
    if line.starts_with(".choice") {
        return Ok(if ctx.in_choice_block {
            Directive::ChoiceClose
        } else {
            Directive::ChoiceOpen
        });
    }
    if ctx.in_choice_block && line.len() >= 2 && line.starts_with(|c: char| c.is_ascii_digit()) {
        return parse_choice_entry(line);
    }
    if line.starts_with(".branch") {
        return parse_branch(line);
    }
    if line.starts_with(".setanchor") {
        return parse_setanchor(line);
    }
    if line.starts_with(".scenein") {
        return parse_scene_in(line);
    }
    if line.starts_with(".sceneout") {
        return parse_scene_out(line);
    }
    if line.starts_with(".music") {
        let name = paren_inner(line)?;
        return Ok(Directive::Music {
            name: (!name.is_empty()).then(|| name.to_string()),
        });
    }
    if line.starts_with(".sound") {
        let name = paren_inner(line)?;
        return Ok(Directive::Sound {
            name: (!name.is_empty()).then(|| name.to_string()),
        });
    }
    if line.starts_with(".setfade") {
        let inner = paren_inner(line)?;
        return Ok(Directive::SetFade {
            rate: parse_int(inner, "淡入淡出速率")?,
        });
    }
    if line.starts_with(".hide") {
        return Ok(Directive::Hide);
    }
    if line.starts_with(".show") {
        return Ok(Directive::Show);
    }
    if line.starts_with(".swap") {
        let scene = paren_inner(line)?;
        if scene.is_empty() {
            return Err(ParseFault::new("缺少场景名"));
        }
        return Ok(Directive::Swap {
            scene: scene.to_string(),
        });
    }
    if line.starts_with(".widget") {
        return parse_widget(line);
    }
    if line.starts_with('$') {
        return parse_assign(line);
    }
    if line.starts_with(".if") {
        return parse_if(line);
    }

    if ctx.in_text_block && ctx.reading {
        return Ok(Directive::Dialogue {
            text: line.to_string(),
        });
    }
    Ok(Directive::Unknown)
}

/// 括号内的整段参数（不切分逗号）
fn paren_inner(line: &str) -> Result<&str, ParseFault> {
    let open = line.find('(').ok_or_else(|| ParseFault::new("缺少参数列表"))?;
    Ok(line[open + 1..].trim_end().trim_end_matches(')').trim())
}

/// 括号内按顶层逗号切分的参数表
fn paren_args(line: &str) -> Result<Vec<String>, ParseFault> {
    let inner = paren_inner(line)?;
    Ok(inner.split(',').map(|s| s.trim().to_string()).collect())
}

fn parse_int(s: &str, what: &str) -> Result<i64, ParseFault> {
    s.parse::<i64>()
        .map_err(|_| ParseFault::new(format!("{what}不是整数: '{s}'")))
}

fn parse_float(s: &str, what: &str) -> Result<f32, ParseFault> {
    s.parse::<f32>()
        .map_err(|_| ParseFault::new(format!("{what}不是数字: '{s}'")))
}

fn parse_load(line: &str) -> Result<Directive, ParseFault> {
    let args = paren_args(line)?;
    if args.len() < 2 {
        let bank = parse_int(&args[0], "图库编号")?;
        return Ok(Directive::ClearCharacters { bank });
    }
    let slot = parse_int(&args[1], "图库槽位")?;
    if !(0..8).contains(&slot) {
        return Err(ParseFault::new(format!("图库槽位超出范围 0-7: {slot}")));
    }
    Ok(Directive::LoadBank {
        folder: args[0].clone(),
        slot,
    })
}

fn parse_text(line: &str, ctx: ParseContext) -> Result<Directive, ParseFault> {
    if ctx.in_text_block {
        return Ok(Directive::TextClose);
    }
    let args = paren_args(line)?;
    let mut params = TextParams::default();
    for phrase in &args {
        if phrase.is_empty() {
            continue;
        }
        match phrase.split_once('=') {
            Some((key, value)) => {
                let (key, value) = (key.trim(), value.trim());
                match key {
                    "char" => params.bank = Some(parse_int(value, "参数 'char'")?),
                    "sub" => params.emotion = parse_int(value, "参数 'sub'")?,
                    "pos" => params.slot = parse_int(value, "参数 'pos'")?,
                    "name" => params.name = value.to_string(),
                    "skip" => params.skip = true,
                    // 未知键忽略
                    _ => {}
                }
            }
            None => {
                if phrase == "skip" {
                    params.skip = true;
                } else {
                    return Err(ParseFault::new(format!("无法识别的参数: '{phrase}'")));
                }
            }
        }
    }
    Ok(Directive::TextOpen(params))
}

fn parse_wait(line: &str) -> Result<Directive, ParseFault> {
    let inner = paren_inner(line)?;
    Ok(Directive::Wait {
        frames: parse_int(inner, "等待帧数")?,
    })
}

fn parse_shake(line: &str) -> Result<Directive, ParseFault> {
    if !line.contains('(') {
        return Ok(Directive::Shake { magnitude: None });
    }
    let args = paren_args(line)?;
    if args.len() < 2 {
        return Err(ParseFault::new("抖动幅度需要一对整数"));
    }
    let dx = parse_int(&args[0], "抖动幅度")?;
    let dy = parse_int(&args[1], "抖动幅度")?;
    Ok(Directive::Shake {
        magnitude: Some((dx, dy)),
    })
}

fn parse_choice_entry(line: &str) -> Result<Directive, ParseFault> {
    let (head, rest) = line
        .split_once(':')
        .ok_or_else(|| ParseFault::new("选项缺少 ':' 分隔"))?;
    let id = parse_int(head.trim(), "选项编号")?;
    Ok(Directive::ChoiceEntry {
        id,
        prompt: rest.trim().to_string(),
    })
}

fn parse_branch(line: &str) -> Result<Directive, ParseFault> {
    let cleaned = line.replace(':', "");
    let mut parts = cleaned.split_whitespace();
    let _head = parts.next();
    match parts.next() {
        None => Ok(Directive::Branch { id: None }),
        Some(tok) => Ok(Directive::Branch {
            id: Some(parse_int(tok, "分支编号")?),
        }),
    }
}

fn parse_setanchor(line: &str) -> Result<Directive, ParseFault> {
    let inner = paren_inner(line)?;
    let anchor =
        Anchor::parse(inner).ok_or_else(|| ParseFault::new(format!("未知锚点名: '{inner}'")))?;
    Ok(Directive::SetAnchor { anchor })
}

/// 解析效果参数表（首个元素是效果关键字）
fn parse_effect(args: &[String]) -> Result<Option<EffectSpec>, ParseFault> {
    let Some(kind_tok) = args.first() else {
        return Ok(None);
    };
    let Some(kind) = EffectKind::parse(kind_tok) else {
        // 未知效果名：瞬切
        return Ok(None);
    };
    let mut spec = EffectSpec::plain(kind);
    if !kind.has_zoom() {
        return Ok(Some(spec));
    }
    if let Some(v) = args.get(1) {
        spec.scale = Some(parse_float(v, "缩放比例")?);
    }
    if let Some(v) = args.get(2) {
        spec.target = Some(parse_float(v, "目标比例")?);
    }
    if let Some(v) = args.get(3) {
        spec.rate = Some(parse_float(v, "缩放速率")?);
    }
    Ok(Some(spec))
}

fn parse_scene_in(line: &str) -> Result<Directive, ParseFault> {
    let args = paren_args(line)?;
    if args.len() < 2 {
        return Err(ParseFault::new("参数数量不足"));
    }
    let effect = parse_effect(&args[2..])?;
    Ok(Directive::SceneIn {
        folder: args[0].clone(),
        file: args[1].clone(),
        effect,
    })
}

fn parse_scene_out(line: &str) -> Result<Directive, ParseFault> {
    let args = paren_args(line)?;
    let args: Vec<String> = args.into_iter().filter(|a| !a.is_empty()).collect();
    let effect = parse_effect(&args)?;
    Ok(Directive::SceneOut { effect })
}

fn parse_widget(line: &str) -> Result<Directive, ParseFault> {
    let args = paren_args(line)?;
    if args.len() < 2 {
        return Err(ParseFault::new("参数数量不足"));
    }
    let anchor = Anchor::parse(&args[1])
        .ok_or_else(|| ParseFault::new(format!("未知锚点名: '{}'", args[1])))?;
    Ok(Directive::Widget {
        label: args[0].clone(),
        anchor,
    })
}

/// 变量名固定为 `$` + 两位小写字母
fn parse_var_name(token: &str) -> Result<String, ParseFault> {
    let name = token
        .strip_prefix('$')
        .ok_or_else(|| ParseFault::new(format!("变量名必须以 '$' 开头: '{token}'")))?;
    if name.len() == 2 && name.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(name.to_string())
    } else {
        Err(ParseFault::new(format!("引用了不存在的变量: '{token}'")))
    }
}

fn parse_operand(token: &str) -> Result<Operand, ParseFault> {
    if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
        Ok(Operand::Literal(parse_int(token, "右值")?))
    } else {
        Ok(Operand::Var(parse_var_name(token)?))
    }
}

fn parse_assign(line: &str) -> Result<Directive, ParseFault> {
    // 与原语言一致的识别次序：出现 '+' 即 +=，其次 '-' 即 -=，否则 '='
    let (op, sep) = if line.contains('+') {
        (AssignOp::Add, "+=")
    } else if line.contains('-') {
        (AssignOp::Sub, "-=")
    } else if line.contains('=') {
        (AssignOp::Set, "=")
    } else {
        return Err(ParseFault::new("变量操作缺少赋值符号"));
    };
    let (var_part, value_part) = line
        .split_once(sep)
        .ok_or_else(|| ParseFault::new("变量操作格式非法"))?;
    let var = parse_var_name(var_part.trim())?;
    let operand = parse_operand(value_part.trim())?;
    Ok(Directive::Assign { var, op, operand })
}

fn parse_if(line: &str) -> Result<Directive, ParseFault> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() <= 1 {
        // 裸 `.if:`：条件块终点
        return Ok(Directive::If { cond: None });
    }
    if parts.len() < 4 {
        return Err(ParseFault::new("条件语句格式应为 .if $xx OP 值:"));
    }
    let var = parse_var_name(parts[1])?;
    let cmp = Comparator::parse(parts[2])
        .ok_or_else(|| ParseFault::new(format!("未知比较符: '{}'", parts[2])))?;
    let operand = parse_operand(parts[3].trim_end_matches(':'))?;
    Ok(Directive::If {
        cond: Some((var, cmp, operand)),
    })
}
