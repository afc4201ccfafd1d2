// 该文件是 Shanan （山南西风） 项目的一部分。
// src/validate/sequence.rs - 单个序列文件校验
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

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

use super::progress::Progress;
use super::{Location, ValidateError, ValidationWarning, WarningKind};
use crate::classes::{ClassMapping, is_recognized};
use crate::config::{RELEVANCE_THRESHOLD, ValidateOptions};
use crate::detection::Corner;
use crate::geometry::{
  CovarianceError, Matrix2, ZERO_MATRIX, is_positive_semi_definite, is_symmetric_approx,
  to_matrix2,
};

/// 文件中读出的单个检测，键是否存在在校验时检查
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedDetection<'a> {
  pub label_probs: Option<Vec<f64>>,
  pub bbox: Option<Vec<f64>>,
  /// `null` 与缺省同样视为没有协方差
  pub covars: Option<&'a Value>,
}

impl<'a> SubmittedDetection<'a> {
  /// 逐键读取检测，类型错误附带检测位置
  pub fn from_value(value: &'a Value, location: &Location) -> Result<Self, ValidateError> {
    let det = value
      .as_object()
      .ok_or_else(|| ValidateError::DetectionNotObject {
        location: location.clone(),
      })?;
    Ok(SubmittedDetection {
      label_probs: field(det, "label_probs", location)?,
      bbox: field(det, "bbox", location)?,
      covars: det.get("covars").filter(|covars| !covars.is_null()),
    })
  }
}

fn field<'a, T: Deserialize<'a>>(
  det: &'a Map<String, Value>,
  key: &'static str,
  location: &Location,
) -> Result<Option<T>, ValidateError> {
  det
    .get(key)
    .map(|value| {
      T::deserialize(value).map_err(|source| ValidateError::DetectionKeyType {
        location: location.clone(),
        key,
        source,
      })
    })
    .transpose()
}

/// 校验通过的检测，概率已重排为标准类别顺序
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDetection {
  pub class_probs: Vec<f64>,
  pub bbox: [f64; 4],
  /// 全零协方差视为没有不确定性，记为 None
  pub covars: Option<[Matrix2; 2]>,
}

#[derive(Debug, Clone)]
pub struct ValidatedSequence {
  pub name: String,
  pub classes: Vec<String>,
  pub images: Vec<Vec<CanonicalDetection>>,
  pub warnings: Vec<ValidationWarning>,
}

impl ValidatedSequence {
  pub fn num_images(&self) -> usize {
    self.images.len()
  }

  pub fn num_detections(&self) -> usize {
    self.images.iter().map(Vec::len).sum()
  }
}

/// 读取并校验一个序列文件
pub fn validate_sequence(
  sequence_json: &Path,
  options: &ValidateOptions,
) -> Result<ValidatedSequence, ValidateError> {
  let text = std::fs::read_to_string(sequence_json).map_err(|source| ValidateError::Io {
    path: sequence_json.to_path_buf(),
    source,
  })?;
  let name = sequence_json
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| sequence_json.display().to_string());
  validate_sequence_json(&name, &text, options)
}

/// 校验已读入内存的序列文件内容，`name` 用于错误信息
pub fn validate_sequence_json(
  name: &str,
  text: &str,
  options: &ValidateOptions,
) -> Result<ValidatedSequence, ValidateError> {
  let document: Value = serde_json::from_str(text).map_err(|source| ValidateError::Json {
    name: name.to_string(),
    source,
  })?;
  let Value::Object(mut document) = document else {
    return Err(ValidateError::NotAnObject {
      name: name.to_string(),
    });
  };

  let mut take = |key: &'static str| {
    document
      .remove(key)
      .ok_or_else(|| ValidateError::MissingSequenceKey {
        name: name.to_string(),
        key,
      })
  };
  let classes = take("classes")?;
  let detections = take("detections")?;
  let key_type = |key: &'static str| {
    move |source: serde_json::Error| ValidateError::SequenceKeyType {
      name: name.to_string(),
      key,
      source,
    }
  };

  let classes: Vec<String> = serde_json::from_value(classes).map_err(key_type("classes"))?;
  if !classes.iter().any(|class| is_recognized(class)) {
    return Err(ValidateError::Vocabulary {
      name: name.to_string(),
    });
  }
  let detections: Vec<Value> =
    serde_json::from_value(detections).map_err(key_type("detections"))?;

  let mapping = ClassMapping::new(&classes);
  debug!(
    "{}: {} 个类别，其中 {} 个可识别，共 {} 张图像",
    name,
    classes.len(),
    mapping.len(),
    detections.len()
  );

  let mut progress = Progress::new(detections.len(), options.show_progress());
  let mut warnings = Vec::new();
  let mut images = Vec::with_capacity(detections.len());
  for (img_idx, img_dets) in detections.iter().enumerate() {
    let img_dets = img_dets
      .as_array()
      .ok_or_else(|| ValidateError::ImageNotList {
        name: name.to_string(),
        image: img_idx,
      })?;
    let reported = warnings.len();
    images.push(validate_detections(
      img_dets,
      &mapping,
      name,
      img_idx,
      &mut warnings,
    )?);
    if options.report_warnings() {
      for warning in &warnings[reported..] {
        warn!("{}", warning);
      }
    }
    progress.update(img_idx);
  }
  progress.finish();

  Ok(ValidatedSequence {
    name: name.to_string(),
    classes,
    images,
    warnings,
  })
}

/// 校验一张图像的检测列表
///
/// 遇到第一个错误即返回；被忽略的检测不会出现在结果中。
pub fn validate_detections(
  img_dets: &[Value],
  mapping: &ClassMapping,
  sequence_name: &str,
  img_idx: usize,
  warnings: &mut Vec<ValidationWarning>,
) -> Result<Vec<CanonicalDetection>, ValidateError> {
  let num_classes = mapping.num_submission_classes();
  let mut kept = Vec::with_capacity(img_dets.len());

  for (det_idx, det) in img_dets.iter().enumerate() {
    let location = || Location::new(sequence_name, img_idx, det_idx);
    let det = SubmittedDetection::from_value(det, &location())?;

    let label_probs =
      det
        .label_probs
        .as_deref()
        .ok_or_else(|| ValidateError::MissingDetectionKey {
          location: location(),
          key: "label_probs",
        })?;
    let bbox = det
      .bbox
      .as_deref()
      .ok_or_else(|| ValidateError::MissingDetectionKey {
        location: location(),
        key: "bbox",
      })?;
    if label_probs.len() != num_classes {
      return Err(ValidateError::LabelProbsLength {
        location: location(),
        expected: num_classes,
        actual: label_probs.len(),
      });
    }
    let bbox = <[f64; 4]>::try_from(bbox).map_err(|_| ValidateError::BboxLength {
      location: location(),
      actual: bbox.len(),
    })?;
    if bbox[2] < bbox[0] {
      return Err(ValidateError::XOrder {
        location: location(),
      });
    }
    if bbox[3] < bbox[1] {
      return Err(ValidateError::YOrder {
        location: location(),
      });
    }

    let mut class_probs = mapping.remap(label_probs);
    let total: f64 = class_probs.iter().sum();
    if total <= RELEVANCE_THRESHOLD {
      warnings.push(ValidationWarning {
        location: location(),
        kind: WarningKind::Ignored { total },
      });
      continue;
    }
    if total > 1.0 {
      warnings.push(ValidationWarning {
        location: location(),
        kind: WarningKind::Renormalized { total },
      });
      class_probs.iter_mut().for_each(|p| *p /= total);
    }

    let covars = match det.covars {
      Some(value) => check_covars(value).map_err(|err| err.at(location()))?,
      None => None,
    };

    kept.push(CanonicalDetection {
      class_probs,
      bbox,
      covars,
    });
  }

  Ok(kept)
}

enum CovarsError {
  Shape,
  Invalid(Corner, CovarianceError),
}

impl CovarsError {
  fn at(self, location: Location) -> ValidateError {
    match self {
      CovarsError::Shape => ValidateError::CovarsShape { location },
      CovarsError::Invalid(corner, source) => ValidateError::Covariance {
        location,
        corner,
        source,
      },
    }
  }
}

fn check_covars(value: &Value) -> Result<Option<[Matrix2; 2]>, CovarsError> {
  let covars = parse_covars(value).ok_or(CovarsError::Shape)?;
  if covars == [ZERO_MATRIX; 2] {
    return Ok(None);
  }

  let corners = [Corner::UpperLeft, Corner::LowerRight];
  for (matrix, corner) in covars.iter().zip(corners) {
    if !is_symmetric_approx(matrix) {
      return Err(CovarsError::Invalid(corner, CovarianceError::NotSymmetric));
    }
  }
  for (matrix, corner) in covars.iter().zip(corners) {
    if !is_positive_semi_definite(matrix) {
      return Err(CovarsError::Invalid(
        corner,
        CovarianceError::NotPositiveSemiDefinite,
      ));
    }
  }
  Ok(Some(covars))
}

fn parse_covars(value: &Value) -> Option<[Matrix2; 2]> {
  match value.as_array()?.as_slice() {
    [upper_left, lower_right] => Some([parse_matrix(upper_left)?, parse_matrix(lower_right)?]),
    _ => None,
  }
}

fn parse_matrix(value: &Value) -> Option<Matrix2> {
  let rows = value
    .as_array()?
    .iter()
    .map(|row| {
      row
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<Vec<f64>>>()
    })
    .collect::<Option<Vec<Vec<f64>>>>()?;
  to_matrix2(&rows)
}
