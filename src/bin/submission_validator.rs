// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/submission_validator.rs - 提交结果校验工具
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{Level, info};

use shanan_submission::{ValidateOptions, validate_submission};

/// 提交结果校验工具，在上传前检查提交中的错误与无效数值
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 包含提交结果的目录，校验通过后将该目录打包提交
  #[arg(value_name = "SUBMISSION_DIRECTORY")]
  pub submission_directory: PathBuf,

  /// 不输出警告（概率未归一化、检测被忽略等），警告不是错误，但可能很多
  #[arg(short, long)]
  pub quiet: bool,

  /// 只校验指定的序列编号，以逗号分隔，默认校验全部 18 个序列
  #[arg(long, value_name = "IDS", value_delimiter = ',')]
  pub sequence_ids: Option<Vec<u32>>,
}

/// 安静模式下不输出进度与汇总
fn max_level(quiet: bool) -> Level {
  if quiet { Level::WARN } else { Level::INFO }
}

fn main() -> Result<()> {
  let args = Args::parse();

  tracing_subscriber::fmt()
    .with_target(false)
    .with_max_level(max_level(args.quiet))
    .init();

  info!("提交目录: {}", args.submission_directory.display());

  let mut options = ValidateOptions::default().with_warnings(!args.quiet);
  if let Some(ids) = args.sequence_ids {
    options = options.with_sequence_ids(ids);
  }

  let report = validate_submission(&args.submission_directory, &options)
    .with_context(|| format!("校验失败: {}", args.submission_directory.display()))?;

  info!(
    "校验通过: {} 个序列, {} 张图像, {} 个检测, {} 条警告",
    report.sequences.len(),
    report.num_images(),
    report.num_detections(),
    report.warnings.len()
  );

  Ok(())
}
