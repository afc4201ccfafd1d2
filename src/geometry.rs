// 该文件是 Shanan （山南西风） 项目的一部分。
// src/geometry.rs - 协方差矩阵检查
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

use thiserror::Error;

/// 2x2 矩阵，按行存储: [[xx, xy], [yx, yy]]
pub type Matrix2 = [[f64; 2]; 2];

/// 全零协方差，等价于没有不确定性的普通边界框
pub const ZERO_MATRIX: Matrix2 = [[0.0, 0.0], [0.0, 0.0]];

const SYMMETRY_ATOL: f64 = 1e-8;
const SYMMETRY_RTOL: f64 = 1e-5;
const PSD_TOLERANCE: f64 = 1e-10;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceError {
  #[error("不是 2x2 矩阵")]
  NotSquare,
  #[error("不是对称矩阵")]
  NotSymmetric,
  #[error("不是半正定矩阵")]
  NotPositiveSemiDefinite,
}

/// 判断是否恰好两行、每行恰好两个元素
pub fn is_square_2x2<R: AsRef<[f64]>>(matrix: &[R]) -> bool {
  matrix.len() == 2 && matrix.iter().all(|row| row.as_ref().len() == 2)
}

/// 转换为定长矩阵，形状不对时返回 None
pub fn to_matrix2<R: AsRef<[f64]>>(matrix: &[R]) -> Option<Matrix2> {
  if !is_square_2x2(matrix) {
    return None;
  }
  let (r0, r1) = (matrix[0].as_ref(), matrix[1].as_ref());
  Some([[r0[0], r0[1]], [r1[0], r1[1]]])
}

pub fn is_symmetric(matrix: &Matrix2) -> bool {
  matrix[0][1] == matrix[1][0]
}

/// 带容差的对称性判断，用于从文本读回的浮点数
pub fn is_symmetric_approx(matrix: &Matrix2) -> bool {
  let (a, b) = (matrix[0][1], matrix[1][0]);
  (a - b).abs() <= SYMMETRY_ATOL + SYMMETRY_RTOL * b.abs()
}

/// 对称 2x2 矩阵的闭式特征值，升序
///
/// 只读取上三角的非对角元素，调用前应先检查对称性。
pub fn eigenvalues(matrix: &Matrix2) -> [f64; 2] {
  let [[a, b], [_, d]] = *matrix;
  let mean = 0.5 * (a + d);
  let radius = (0.5 * (a - d)).hypot(b);
  [mean - radius, mean + radius]
}

fn scale(matrix: &Matrix2) -> f64 {
  (matrix[0][0].abs() + matrix[1][1].abs()).max(1.0)
}

/// 半正定判断：两个特征值均不小于零（允许极小的数值误差）
pub fn is_positive_semi_definite(matrix: &Matrix2) -> bool {
  let tol = PSD_TOLERANCE * scale(matrix);
  eigenvalues(matrix).iter().all(|&lambda| lambda >= -tol)
}

/// 依次检查形状、对称性、半正定性，返回第一个失败的步骤
pub fn check_covariance<R: AsRef<[f64]>>(matrix: &[R]) -> Result<Matrix2, CovarianceError> {
  let matrix = to_matrix2(matrix).ok_or(CovarianceError::NotSquare)?;
  if !is_symmetric(&matrix) {
    return Err(CovarianceError::NotSymmetric);
  }
  if !is_positive_semi_definite(&matrix) {
    return Err(CovarianceError::NotPositiveSemiDefinite);
  }
  Ok(matrix)
}
