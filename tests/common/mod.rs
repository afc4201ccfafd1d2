// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/common/mod.rs - 测试辅助函数
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

#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::path::Path;

use shanan_submission::ValidateOptions;
use shanan_submission::classes::CLASSES;

pub fn quiet() -> ValidateOptions {
  ValidateOptions::default()
    .with_warnings(false)
    .with_progress(false)
}

/// 在 `root/subfolder` 下为每个序列写入一个文件，类别为完整的标准类别表
pub fn make_submission<'a>(
  root: &Path,
  subfolder: Option<&str>,
  sequences: impl IntoIterator<Item = (&'a str, Value)>,
) {
  let dir = match subfolder {
    Some(sub) => root.join(sub),
    None => root.to_path_buf(),
  };
  fs::create_dir_all(&dir).unwrap();
  for (name, detections) in sequences {
    let doc = json!({ "classes": CLASSES, "detections": detections });
    fs::write(dir.join(format!("{name}.json")), doc.to_string()).unwrap();
  }
}

pub fn sequence_name(id: u32) -> String {
  format!("{id:06}")
}
