// 该文件是 Shanan （山南西风） 项目的一部分。
// src/validate.rs - 提交结果校验
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

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::detection::Corner;
use crate::geometry::CovarianceError;

mod progress;
mod sequence;
mod submission;

pub use self::sequence::{
  CanonicalDetection, SubmittedDetection, ValidatedSequence,
  validate_detections, validate_sequence, validate_sequence_json,
};
pub use self::submission::{
  SequenceSummary, SubmissionReport, discover_sequences, read_submission, sequence_file_name,
  validate_submission,
};

/// 检测结果在提交中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub sequence: String,
  pub image: usize,
  pub detection: usize,
}

impl Location {
  pub fn new(sequence: &str, image: usize, detection: usize) -> Self {
    Location {
      sequence: sequence.to_string(),
      image,
      detection,
    }
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}, 图像索引 {}, 检测索引 {}",
      self.sequence, self.image, self.detection
    )
  }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Structural,
  Geometry,
  Completeness,
  Conflict,
  Vocabulary,
  Io,
}

#[derive(Error, Debug)]
pub enum ValidateError {
  #[error("提交目录 {} 不存在", .0.display())]
  NotADirectory(PathBuf),
  #[error("{} : I/O 错误: {source}", path.display())]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("{name} : JSON 解析错误: {source}")]
  Json {
    name: String,
    source: serde_json::Error,
  },
  #[error("{name} : 顶层必须是 JSON 对象")]
  NotAnObject { name: String },
  #[error("{name} : 缺少键 '{key}'")]
  MissingSequenceKey { name: String, key: &'static str },
  #[error("{name} : 键 '{key}' 类型错误: {source}")]
  SequenceKeyType {
    name: String,
    key: &'static str,
    source: serde_json::Error,
  },
  #[error("{name}, 图像索引 {image} : 检测列表必须是数组")]
  ImageNotList { name: String, image: usize },
  #[error("{name} : 类别列表 classes 中没有任何可识别的类别")]
  Vocabulary { name: String },
  #[error("{location} : 检测结果必须是 JSON 对象")]
  DetectionNotObject { location: Location },
  #[error("{location} : 缺少键 '{key}'")]
  MissingDetectionKey {
    location: Location,
    key: &'static str,
  },
  #[error("{location} : 键 '{key}' 类型错误: {source}")]
  DetectionKeyType {
    location: Location,
    key: &'static str,
    source: serde_json::Error,
  },
  #[error("{location} : 类别概率数量 {actual} 与类别数量 {expected} 不一致")]
  LabelProbsLength {
    location: Location,
    expected: usize,
    actual: usize,
  },
  #[error("{location} : 边界框 bbox 必须恰好包含 4 个数值，实际为 {actual} 个")]
  BboxLength { location: Location, actual: usize },
  #[error("{location} : x1 坐标必须不大于 x2 坐标")]
  XOrder { location: Location },
  #[error("{location} : y1 坐标必须不大于 y2 坐标")]
  YOrder { location: Location },
  #[error("{location} : 键 'covars' 必须包含两个 2x2 矩阵")]
  CovarsShape { location: Location },
  #[error("{location} : {corner}协方差{source}")]
  Covariance {
    location: Location,
    corner: Corner,
    source: CovarianceError,
  },
  #[error("{id} : 找到多个序列文件, {first} 和 {second}")]
  Duplicate {
    id: String,
    first: String,
    second: String,
  },
  #[error("以下序列没有提交检测结果: {}", .0.join(", "))]
  Missing(Vec<String>),
}

impl ValidateError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ValidateError::NotADirectory(_) | ValidateError::Io { .. } => ErrorKind::Io,
      ValidateError::Json { .. }
      | ValidateError::NotAnObject { .. }
      | ValidateError::MissingSequenceKey { .. }
      | ValidateError::SequenceKeyType { .. }
      | ValidateError::ImageNotList { .. }
      | ValidateError::DetectionNotObject { .. }
      | ValidateError::MissingDetectionKey { .. }
      | ValidateError::DetectionKeyType { .. }
      | ValidateError::LabelProbsLength { .. }
      | ValidateError::BboxLength { .. }
      | ValidateError::CovarsShape { .. } => ErrorKind::Structural,
      ValidateError::XOrder { .. }
      | ValidateError::YOrder { .. }
      | ValidateError::Covariance { .. } => ErrorKind::Geometry,
      ValidateError::Vocabulary { .. } => ErrorKind::Vocabulary,
      ValidateError::Duplicate { .. } => ErrorKind::Conflict,
      ValidateError::Missing(_) => ErrorKind::Completeness,
    }
  }

  /// 出错检测结果的位置，序列级或提交级错误返回 None
  pub fn location(&self) -> Option<&Location> {
    match self {
      ValidateError::DetectionNotObject { location }
      | ValidateError::MissingDetectionKey { location, .. }
      | ValidateError::DetectionKeyType { location, .. }
      | ValidateError::LabelProbsLength { location, .. }
      | ValidateError::BboxLength { location, .. }
      | ValidateError::XOrder { location }
      | ValidateError::YOrder { location }
      | ValidateError::CovarsShape { location }
      | ValidateError::Covariance { location, .. } => Some(location),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WarningKind {
  /// 已知类别的概率之和不超过阈值，检测被忽略
  Ignored { total: f64 },
  /// 概率之和大于 1，已归一化
  Renormalized { total: f64 },
}

/// 不致命的问题，只报告不中断校验
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
  pub location: Location,
  pub kind: WarningKind,
}

impl fmt::Display for ValidationWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      WarningKind::Ignored { total } => write!(
        f,
        "{} : 检测结果在所有已知类别上的概率之和为 {}，不超过 0.5，已忽略",
        self.location, total
      ),
      WarningKind::Renormalized { total } => write!(
        f,
        "{} : 类别概率之和为 {}，大于 1，已归一化",
        self.location, total
      ),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn location_is_rendered_in_messages() {
    let err = ValidateError::XOrder {
      location: Location::new("000004.json", 13, 2),
    };
    let msg = err.to_string();
    assert!(msg.contains("000004.json"));
    assert!(msg.contains("13"));
    assert!(msg.contains("2"));
    assert_eq!(err.kind(), ErrorKind::Geometry);
    assert_eq!(err.location().map(|l| l.image), Some(13));
  }

  #[test]
  fn missing_lists_every_sequence() {
    let err = ValidateError::Missing(vec!["000003".into(), "000017".into()]);
    let msg = err.to_string();
    assert!(msg.contains("000003, 000017"));
    assert_eq!(err.kind(), ErrorKind::Completeness);
    assert!(err.location().is_none());
  }
}
