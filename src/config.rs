// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 校验参数
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

/// 完整提交所需的序列数量: 000000 ~ 000017
pub const DEFAULT_SEQUENCE_COUNT: u32 = 18;

/// 已知类别概率之和不超过该值的检测被忽略
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

/// 进度输出间隔（比例）
pub const PROGRESS_STEP: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct ValidateOptions {
  sequence_ids: Vec<u32>,
  report_warnings: bool,
  show_progress: bool,
}

impl Default for ValidateOptions {
  fn default() -> Self {
    ValidateOptions {
      sequence_ids: (0..DEFAULT_SEQUENCE_COUNT).collect(),
      report_warnings: true,
      show_progress: true,
    }
  }
}

impl ValidateOptions {
  /// 只校验给定的序列，可用于提交前检查部分结果
  pub fn with_sequence_ids(mut self, sequence_ids: impl IntoIterator<Item = u32>) -> Self {
    self.sequence_ids = sequence_ids.into_iter().collect();
    self
  }

  /// 是否通过日志输出警告，警告总会被收集
  pub fn with_warnings(mut self, report_warnings: bool) -> Self {
    self.report_warnings = report_warnings;
    self
  }

  pub fn with_progress(mut self, show_progress: bool) -> Self {
    self.show_progress = show_progress;
    self
  }

  pub fn sequence_ids(&self) -> &[u32] {
    &self.sequence_ids
  }

  pub fn report_warnings(&self) -> bool {
    self.report_warnings
  }

  pub fn show_progress(&self) -> bool {
    self.show_progress
  }
}
