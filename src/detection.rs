// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detection.rs - 检测结果记录与构造检查
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

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::geometry::{CovarianceError, Matrix2, check_covariance};

/// 构造检测时概率之和允许的误差
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-14;

/// 按行给出的协方差矩阵，形状在构造时检查
pub type RawMatrix = Vec<Vec<f64>>;

/// 边界框的角点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
  UpperLeft,
  LowerRight,
}

impl fmt::Display for Corner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Corner::UpperLeft => write!(f, "左上角 (upper-left)"),
      Corner::LowerRight => write!(f, "右下角 (lower-right)"),
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
  #[error("{0} 中含有 NaN 或无穷大")]
  NonFinite(&'static str),
  #[error("xmax 小于 xmin: {xmax} < {xmin}")]
  XOrder { xmin: f64, xmax: f64 },
  #[error("ymax 小于 ymin: {ymax} < {ymin}")]
  YOrder { ymin: f64, ymax: f64 },
  #[error("类别概率 (class probabilities) 之和为 {0}，超过 1")]
  ProbabilitySum(f64),
  #[error("只给出了{given}的协方差，缺少{missing}的协方差")]
  MissingCovariance { given: Corner, missing: Corner },
  #[error("{corner}协方差{source}")]
  InvalidCovariance {
    corner: Corner,
    source: CovarianceError,
  },
}

/// 单个检测结果，写入提交文件的形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  label_probs: Vec<f64>,
  bbox: [f64; 4], // [x_min, y_min, x_max, y_max]
  #[serde(default, skip_serializing_if = "Option::is_none")]
  covars: Option<[Matrix2; 2]>,
}

impl Detection {
  pub fn builder(class_probabilities: impl Into<Vec<f64>>) -> DetectionBuilder {
    DetectionBuilder {
      class_probabilities: class_probabilities.into(),
      bbox: [0.0; 4],
      upper_left_cov: None,
      lower_right_cov: None,
    }
  }

  pub fn label_probs(&self) -> &[f64] {
    &self.label_probs
  }

  pub fn bbox(&self) -> [f64; 4] {
    self.bbox
  }

  /// 左上角与右下角的协方差，未给出时为 None
  pub fn covars(&self) -> Option<&[Matrix2; 2]> {
    self.covars.as_ref()
  }
}

pub struct DetectionBuilder {
  class_probabilities: Vec<f64>,
  bbox: [f64; 4],
  upper_left_cov: Option<RawMatrix>,
  lower_right_cov: Option<RawMatrix>,
}

impl DetectionBuilder {
  pub fn corners(mut self, xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
    self.bbox = [xmin, ymin, xmax, ymax];
    self
  }

  /// 以左上角坐标和宽高给出边界框
  pub fn xywh(self, x: f64, y: f64, width: f64, height: f64) -> Self {
    self.corners(x, y, x + width, y + height)
  }

  pub fn upper_left_cov(mut self, cov: Option<RawMatrix>) -> Self {
    self.upper_left_cov = cov;
    self
  }

  pub fn lower_right_cov(mut self, cov: Option<RawMatrix>) -> Self {
    self.lower_right_cov = cov;
    self
  }

  pub fn covariances(self, upper_left: RawMatrix, lower_right: RawMatrix) -> Self {
    self
      .upper_left_cov(Some(upper_left))
      .lower_right_cov(Some(lower_right))
  }

  pub fn build(self) -> Result<Detection, DetectionError> {
    finite("label_probs", &self.class_probabilities)?;
    finite("bbox", &self.bbox)?;
    let [xmin, ymin, xmax, ymax] = self.bbox;
    if xmax < xmin {
      return Err(DetectionError::XOrder { xmin, xmax });
    }
    if ymax < ymin {
      return Err(DetectionError::YOrder { ymin, ymax });
    }

    let total: f64 = self.class_probabilities.iter().sum();
    if total > 1.0 + PROBABILITY_SUM_TOLERANCE {
      return Err(DetectionError::ProbabilitySum(total));
    }

    let covars = match (self.upper_left_cov, self.lower_right_cov) {
      (Some(upper_left), Some(lower_right)) => Some([
        checked(&upper_left, Corner::UpperLeft)?,
        checked(&lower_right, Corner::LowerRight)?,
      ]),
      (Some(_), None) => {
        return Err(DetectionError::MissingCovariance {
          given: Corner::UpperLeft,
          missing: Corner::LowerRight,
        });
      }
      (None, Some(_)) => {
        return Err(DetectionError::MissingCovariance {
          given: Corner::LowerRight,
          missing: Corner::UpperLeft,
        });
      }
      (None, None) => None,
    };

    Ok(Detection {
      label_probs: self.class_probabilities,
      bbox: self.bbox,
      covars,
    })
  }
}

fn finite(field: &'static str, values: &[f64]) -> Result<(), DetectionError> {
  if values.iter().all(|v| v.is_finite()) {
    Ok(())
  } else {
    Err(DetectionError::NonFinite(field))
  }
}

fn checked(cov: &RawMatrix, corner: Corner) -> Result<Matrix2, DetectionError> {
  for row in cov {
    finite("covars", row)?;
  }
  check_covariance(cov).map_err(|source| DetectionError::InvalidCovariance { corner, source })
}

/// 构造一个检测结果
///
/// 两个协方差要么都给出，要么都不给出；给出时坐标被视为角点的均值。
pub fn make_detection(
  class_probabilities: impl Into<Vec<f64>>,
  xmin: f64,
  ymin: f64,
  xmax: f64,
  ymax: f64,
  upper_left_cov: Option<RawMatrix>,
  lower_right_cov: Option<RawMatrix>,
) -> Result<Detection, DetectionError> {
  Detection::builder(class_probabilities)
    .corners(xmin, ymin, xmax, ymax)
    .upper_left_cov(upper_left_cov)
    .lower_right_cov(lower_right_cov)
    .build()
}

/// `make_detection` 的宽高形式
pub fn make_detection_xywh(
  class_probabilities: impl Into<Vec<f64>>,
  x: f64,
  y: f64,
  width: f64,
  height: f64,
  upper_left_cov: Option<RawMatrix>,
  lower_right_cov: Option<RawMatrix>,
) -> Result<Detection, DetectionError> {
  make_detection(
    class_probabilities,
    x,
    y,
    x + width,
    y + height,
    upper_left_cov,
    lower_right_cov,
  )
}

/// 轴对齐（无相关项）的协方差
pub fn make_simple_covariance(x_var: f64, y_var: f64) -> RawMatrix {
  vec![vec![x_var, 0.0], vec![0.0, y_var]]
}

#[cfg(test)]
mod tests {
  use super::*;

  const PROBS: [f64; 4] = [0.1, 0.4, 0.2, 0.3];

  #[test]
  fn makes_detection_without_covars() {
    let det = make_detection(PROBS, 1.0, 3.0, 12.0, 14.0, None, None).unwrap();
    assert_eq!(det.bbox(), [1.0, 3.0, 12.0, 14.0]);
    assert_eq!(det.label_probs(), &PROBS);
    assert!(det.covars().is_none());

    let json = serde_json::to_value(&det).unwrap();
    assert!(json.get("covars").is_none());
    assert!(json.get("bbox").is_some());
    assert!(json.get("label_probs").is_some());
  }

  #[test]
  fn makes_detection_with_covars() {
    let upper_left = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let lower_right = vec![vec![10.0, 2.0], vec![2.0, 10.0]];
    let det = make_detection(
      PROBS,
      1.0,
      3.0,
      12.0,
      14.0,
      Some(upper_left),
      Some(lower_right),
    )
    .unwrap();
    assert_eq!(
      det.covars(),
      Some(&[[[1.0, 0.0], [0.0, 1.0]], [[10.0, 2.0], [2.0, 10.0]]])
    );
  }

  #[test]
  fn xywh_forwards_to_corners() {
    let det = make_detection_xywh(PROBS, 1.0, 3.0, 11.0, 11.0, None, None).unwrap();
    assert_eq!(det.bbox(), [1.0, 3.0, 12.0, 14.0]);
  }

  #[test]
  fn rejects_bad_box_ordering() {
    let err = make_detection(PROBS, 12.0, 3.0, 1.0, 14.0, None, None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("xmax") && msg.contains("xmin"), "{msg}");

    let err = make_detection(PROBS, 1.0, 14.0, 12.0, 3.0, None, None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("ymax") && msg.contains("ymin"), "{msg}");
  }

  #[test]
  fn rejects_probabilities_over_one() {
    let err = make_detection([0.5, 0.4, 0.2], 1.0, 3.0, 12.0, 14.0, None, None).unwrap_err();
    assert!(matches!(err, DetectionError::ProbabilitySum(_)));
    assert!(err.to_string().contains("probabilities"));
  }

  #[test]
  fn single_covariance_is_incomplete() {
    let cov = make_simple_covariance(1.0, 2.0);
    let err = make_detection(PROBS, 1.0, 3.0, 12.0, 14.0, Some(cov.clone()), None).unwrap_err();
    assert!(matches!(err, DetectionError::MissingCovariance { .. }));
    let err = make_detection(PROBS, 1.0, 3.0, 12.0, 14.0, None, Some(cov)).unwrap_err();
    assert_eq!(
      err,
      DetectionError::MissingCovariance {
        given: Corner::LowerRight,
        missing: Corner::UpperLeft,
      }
    );
  }

  #[test]
  fn covariance_errors_name_corner_and_check() {
    let good = make_simple_covariance(1.0, 1.0);
    let cases = [
      (vec![vec![1.0, 0.0]], CovarianceError::NotSquare),
      (vec![vec![1.0, 2.0], vec![3.0, 4.0]], CovarianceError::NotSymmetric),
      (
        vec![vec![1.0, 2.0], vec![2.0, 1.0]],
        CovarianceError::NotPositiveSemiDefinite,
      ),
    ];
    for (bad, expected) in cases {
      let err = make_detection(
        PROBS,
        1.0,
        3.0,
        12.0,
        14.0,
        Some(bad.clone()),
        Some(good.clone()),
      )
      .unwrap_err();
      assert_eq!(
        err,
        DetectionError::InvalidCovariance {
          corner: Corner::UpperLeft,
          source: expected,
        }
      );
      let err = make_detection(PROBS, 1.0, 3.0, 12.0, 14.0, Some(good.clone()), Some(bad))
        .unwrap_err();
      assert_eq!(
        err,
        DetectionError::InvalidCovariance {
          corner: Corner::LowerRight,
          source: expected,
        }
      );
    }
  }

  #[test]
  fn rejects_non_finite_values() {
    let err = make_detection([f64::NAN], 0.0, 0.0, 1.0, 1.0, None, None).unwrap_err();
    assert_eq!(err, DetectionError::NonFinite("label_probs"));

    for bbox in [[f64::NAN, 0.0, 1.0, 1.0], [0.0, 0.0, f64::INFINITY, 1.0]] {
      let [xmin, ymin, xmax, ymax] = bbox;
      let err = make_detection([0.9], xmin, ymin, xmax, ymax, None, None).unwrap_err();
      assert_eq!(err, DetectionError::NonFinite("bbox"));
    }

    let good = make_simple_covariance(1.0, 1.0);
    let bad = make_simple_covariance(f64::NAN, 1.0);
    let err = make_detection([0.9], 0.0, 0.0, 1.0, 1.0, Some(good), Some(bad)).unwrap_err();
    assert_eq!(err, DetectionError::NonFinite("covars"));
  }
}
