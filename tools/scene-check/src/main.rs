//! 场景脚本静态检查工具。
//!
//! 扫描目录下的全部 `*.vns` 场景文件，逐行解析并输出诊断；
//! `--resources` 同时列出每个脚本引用的外部资源，`--json` 输出机器可读报告。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use walkdir::WalkDir;

use nvl_runtime::{
    Diagnostic, ResourceReference, analyze_scene, extract_resource_references,
};

#[derive(Parser)]
#[command(name = "scene-check", about = "检查场景脚本的语法与资源引用")]
struct Cli {
    /// 场景目录
    scenes_dir: PathBuf,

    /// 以 JSON 输出报告
    #[arg(long)]
    json: bool,

    /// 同时列出资源引用
    #[arg(long)]
    resources: bool,
}

/// 单个场景的检查报告
#[derive(Serialize)]
struct SceneReport {
    scene: String,
    diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    resources: Vec<ResourceReference>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("scene-check: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    let mut reports = Vec::new();
    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;

    for entry in WalkDir::new(&cli.scenes_dir).sort_by_file_name() {
        let entry = entry.context("遍历场景目录失败")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("vns") {
            continue;
        }
        let scene = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let text = fs::read_to_string(path)
            .with_context(|| format!("无法读取 {}", path.display()))?;

        let result = analyze_scene(&scene, &text);
        total_errors += result.error_count();
        total_warnings += result.warn_count();

        reports.push(SceneReport {
            scene,
            diagnostics: result.diagnostics,
            resources: if cli.resources {
                extract_resource_references(&text)
            } else {
                Vec::new()
            },
        });
    }

    if reports.is_empty() {
        anyhow::bail!("{} 下没有找到任何 .vns 场景文件", cli.scenes_dir.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            for diagnostic in &report.diagnostics {
                println!("{diagnostic}");
            }
            if cli.resources {
                for r in &report.resources {
                    println!(
                        "[RES] {}:{}: {:?} {}",
                        report.scene, r.line, r.kind, r.name
                    );
                }
            }
        }
        println!(
            "共检查 {} 个场景：{} 个错误，{} 个警告",
            reports.len(),
            total_errors,
            total_warnings
        );
    }

    Ok(total_errors == 0)
}
