// 该文件是 Shanan （山南西风） 项目的一部分。
// src/validate/submission.rs - 整个提交目录校验
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

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::sequence::{ValidatedSequence, validate_sequence};
use super::{ValidateError, ValidationWarning};
use crate::config::ValidateOptions;

const SEQUENCE_EXTENSION: &str = "json";

/// 序列编号对应的文件名，如 `000017.json`
pub fn sequence_file_name(sequence_id: u32) -> String {
  format!("{:06}.{}", sequence_id, SEQUENCE_EXTENSION)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSummary {
  pub id: String,
  pub images: usize,
  pub detections: usize,
}

/// 校验通过后的汇总
#[derive(Debug, Clone, Default)]
pub struct SubmissionReport {
  pub sequences: Vec<SequenceSummary>,
  pub warnings: Vec<ValidationWarning>,
}

impl SubmissionReport {
  pub fn num_images(&self) -> usize {
    self.sequences.iter().map(|s| s.images).sum()
  }

  pub fn num_detections(&self) -> usize {
    self.sequences.iter().map(|s| s.detections).sum()
  }
}

/// 在目录树中为每个期望的序列找到唯一的文件
///
/// 同一序列出现两个文件时报错，并给出两者相对于根目录的路径。
pub fn discover_sequences(
  directory: &Path,
  sequence_ids: &[u32],
) -> Result<BTreeMap<String, PathBuf>, ValidateError> {
  if !directory.is_dir() {
    return Err(ValidateError::NotADirectory(directory.to_path_buf()));
  }

  let expected: BTreeMap<String, String> = sequence_ids
    .iter()
    .map(|&id| (sequence_file_name(id), format!("{:06}", id)))
    .collect();
  let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
  for entry in WalkDir::new(directory).sort_by_file_name() {
    let entry = entry.map_err(|err| walk_error(directory, err))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let Some(id) = entry.file_name().to_str().and_then(|name| expected.get(name)) else {
      continue;
    };
    let path = entry.path();
    if let Some(first) = found.get(id) {
      return Err(ValidateError::Duplicate {
        id: id.clone(),
        first: relative(directory, first),
        second: relative(directory, path),
      });
    }
    debug!("序列 {} 对应文件 {}", id, path.display());
    found.insert(id.clone(), path.to_path_buf());
  }

  // 文件名与编号同序，缺失列表自然有序
  let missing: Vec<String> = expected
    .values()
    .filter(|id| !found.contains_key(*id))
    .cloned()
    .collect();
  if !missing.is_empty() {
    return Err(ValidateError::Missing(missing));
  }

  Ok(found)
}

fn walk_error(root: &Path, err: walkdir::Error) -> ValidateError {
  let path = err.path().unwrap_or(root).to_path_buf();
  let source = err
    .into_io_error()
    .unwrap_or_else(|| std::io::Error::other("目录中存在符号链接循环"));
  ValidateError::Io { path, source }
}

fn relative(root: &Path, path: &Path) -> String {
  path
    .strip_prefix(root)
    .unwrap_or(path)
    .display()
    .to_string()
}

/// 校验并读取整个提交，按序列编号返回标准化后的检测结果
///
/// 第一个错误即终止整个校验。
pub fn read_submission(
  directory: &Path,
  options: &ValidateOptions,
) -> Result<BTreeMap<String, ValidatedSequence>, ValidateError> {
  let sequences = discover_sequences(directory, options.sequence_ids())?;

  let mut validated = BTreeMap::new();
  for (id, path) in sequences {
    info!("正在校验序列 {} 的提交...", id);
    let sequence = validate_sequence(&path, options)?;
    validated.insert(id, sequence);
  }
  Ok(validated)
}

/// 校验整个提交目录
pub fn validate_submission(
  directory: &Path,
  options: &ValidateOptions,
) -> Result<SubmissionReport, ValidateError> {
  let validated = read_submission(directory, options)?;

  let mut report = SubmissionReport::default();
  for (id, sequence) in validated {
    report.sequences.push(SequenceSummary {
      id,
      images: sequence.num_images(),
      detections: sequence.num_detections(),
    });
    report.warnings.extend(sequence.warnings);
  }
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  #[test]
  fn file_names_are_zero_padded() {
    assert_eq!(sequence_file_name(0), "000000.json");
    assert_eq!(sequence_file_name(17), "000017.json");
    assert_eq!(sequence_file_name(123456), "123456.json");
  }

  #[test]
  fn missing_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("not").join("a").join("dir");
    let err = discover_sequences(&not_a_dir, &[0]).unwrap_err();
    assert!(matches!(err, ValidateError::NotADirectory(_)));
    assert!(err.to_string().contains(&not_a_dir.display().to_string()));
  }

  #[test]
  fn ignores_unrelated_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("000000.json"), "{}").unwrap();
    fs::write(dir.path().join("000000.txt"), "").unwrap();
    fs::write(dir.path().join("readme.json"), "").unwrap();
    let found = discover_sequences(dir.path(), &[0]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found["000000"], dir.path().join("000000.json"));
  }

  #[test]
  fn walks_nested_folders_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("b").join("c")).unwrap();
    fs::create_dir_all(dir.path().join("a").join("000000.json")).unwrap();
    fs::write(dir.path().join("a").join("000001.json"), "{}").unwrap();
    fs::write(dir.path().join("b").join("c").join("000000.json"), "{}").unwrap();
    fs::write(dir.path().join("b").join("c").join("000001.json"), "{}").unwrap();

    let found = discover_sequences(&dir.path().join("b"), &[0, 1]).unwrap();
    assert_eq!(found["000000"], dir.path().join("b").join("c").join("000000.json"));

    let err = discover_sequences(dir.path(), &[0, 1]).unwrap_err();
    let ValidateError::Duplicate { id, first, second } = &err else {
      panic!("unexpected error: {err}");
    };
    assert_eq!(id, "000001");
    assert_eq!(*first, Path::new("a").join("000001.json").display().to_string());
    assert_eq!(
      *second,
      Path::new("b").join("c").join("000001.json").display().to_string()
    );
  }
}
