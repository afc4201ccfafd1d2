// 该文件是 Shanan （山南西风） 项目的一部分。
// src/validate/progress.rs - 校验进度输出
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

use tracing::info;

use crate::config::PROGRESS_STEP;

const BAR_WIDTH: usize = 20;

/// 粗粒度的扫描进度，每前进约 5% 输出一次
pub(crate) struct Progress {
  total: usize,
  next: f64,
  enabled: bool,
}

impl Progress {
  pub(crate) fn new(total: usize, enabled: bool) -> Self {
    Progress {
      total,
      next: 0.0,
      enabled,
    }
  }

  /// 处理完第 `index` 张图像后调用，返回是否输出了进度
  pub(crate) fn update(&mut self, index: usize) -> bool {
    if self.total == 0 {
      return false;
    }
    let fraction = index as f64 / self.total as f64;
    if fraction <= self.next {
      return false;
    }
    while self.next < fraction {
      self.next += PROGRESS_STEP;
    }
    if self.enabled {
      info!("  [{}] {}%", bar(fraction), (100.0 * fraction) as u32);
    }
    true
  }

  pub(crate) fn finish(&self) {
    if self.enabled {
      info!("  完成!");
    }
  }
}

fn bar(fraction: f64) -> String {
  let filled = ((BAR_WIDTH as f64 * fraction) as usize).min(BAR_WIDTH);
  format!("{:<width$}", "=".repeat(filled), width = BAR_WIDTH)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reports_coarsely() {
    let mut progress = Progress::new(100, false);
    let reported = (0..100).filter(|&i| progress.update(i)).count();
    assert!(reported > 0 && reported <= 21, "{reported}");
  }

  #[test]
  fn empty_sequence_never_reports() {
    let mut progress = Progress::new(0, false);
    assert!(!progress.update(0));
  }

  #[test]
  fn bar_is_fixed_width() {
    assert_eq!(bar(0.0).len(), BAR_WIDTH);
    assert_eq!(bar(0.5), format!("{:<20}", "=========="));
    assert_eq!(bar(1.0), "=".repeat(BAR_WIDTH));
  }
}
