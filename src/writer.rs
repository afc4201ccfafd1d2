// 该文件是 Shanan （山南西风） 项目的一部分。
// src/writer.rs - 提交文件写入
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
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::detection::{Detection, DetectionError, RawMatrix, make_detection};

#[derive(Error, Debug)]
pub enum WriterError {
  #[error("类别概率数量 {actual} 与类别列表长度 {expected} 不一致")]
  ClassCountMismatch { expected: usize, actual: usize },
  #[error("检测结果无效: {0}")]
  Detection(#[from] DetectionError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 一个序列文件的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceOutput {
  pub classes: Vec<String>,
  pub detections: Vec<Vec<Detection>>,
}

pub fn make_sequence_output(detections: Vec<Vec<Detection>>, classes: Vec<String>) -> SequenceOutput {
  SequenceOutput {
    classes,
    detections,
  }
}

/// 按图像、按序列累积检测结果并写入提交目录
///
/// 每个检测调用 `add_detection`，每张图像结束调用 `next_image`（没有检测的图像也要调用），
/// 每个序列结束调用 `save_sequence`。
pub struct SubmissionWriter {
  submission_folder: PathBuf,
  class_list: Vec<String>,
  all_detections: Vec<Vec<Detection>>,
  current_detections: Vec<Detection>,
}

impl SubmissionWriter {
  pub fn new<S: Into<String>>(
    submission_folder: impl Into<PathBuf>,
    class_list: impl IntoIterator<Item = S>,
  ) -> Self {
    SubmissionWriter {
      submission_folder: submission_folder.into(),
      class_list: class_list.into_iter().map(Into::into).collect(),
      all_detections: Vec::new(),
      current_detections: Vec::new(),
    }
  }

  pub fn class_list(&self) -> &[String] {
    &self.class_list
  }

  /// 当前序列已完成的图像数量
  pub fn num_images(&self) -> usize {
    self.all_detections.len()
  }

  /// 为当前图像添加一个检测，参数同 `make_detection`
  #[allow(clippy::too_many_arguments)]
  pub fn add_detection(
    &mut self,
    class_probabilities: impl Into<Vec<f64>>,
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    upper_left_cov: Option<RawMatrix>,
    lower_right_cov: Option<RawMatrix>,
  ) -> Result<(), WriterError> {
    let class_probabilities = class_probabilities.into();
    self.check_class_count(class_probabilities.len())?;
    let detection = make_detection(
      class_probabilities,
      xmin,
      ymin,
      xmax,
      ymax,
      upper_left_cov,
      lower_right_cov,
    )?;
    self.current_detections.push(detection);
    Ok(())
  }

  #[allow(clippy::too_many_arguments)]
  pub fn add_detection_xywh(
    &mut self,
    class_probabilities: impl Into<Vec<f64>>,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    upper_left_cov: Option<RawMatrix>,
    lower_right_cov: Option<RawMatrix>,
  ) -> Result<(), WriterError> {
    self.add_detection(
      class_probabilities,
      x,
      y,
      x + width,
      y + height,
      upper_left_cov,
      lower_right_cov,
    )
  }

  /// 添加已经构造好的检测
  pub fn push_detection(&mut self, detection: Detection) -> Result<(), WriterError> {
    self.check_class_count(detection.label_probs().len())?;
    self.current_detections.push(detection);
    Ok(())
  }

  fn check_class_count(&self, actual: usize) -> Result<(), WriterError> {
    if actual != self.class_list.len() {
      return Err(WriterError::ClassCountMismatch {
        expected: self.class_list.len(),
        actual,
      });
    }
    Ok(())
  }

  /// 结束当前图像
  pub fn next_image(&mut self) {
    let detections = std::mem::take(&mut self.current_detections);
    self.all_detections.push(detections);
  }

  /// 写出当前序列到 `<sequence_name>.json` 并清空累积的结果
  ///
  /// 尚未结束的图像会作为最后一张图像写入；同名序列再次保存会覆盖原文件。
  pub fn save_sequence(&mut self, sequence_name: &str) -> Result<PathBuf, WriterError> {
    if !self.current_detections.is_empty() {
      self.next_image();
    }

    if !self.submission_folder.exists() {
      debug!("创建提交目录: {}", self.submission_folder.display());
      std::fs::create_dir_all(&self.submission_folder)?;
    }

    let path = self
      .submission_folder
      .join(format!("{}.json", sequence_name));
    let output = make_sequence_output(
      std::mem::take(&mut self.all_detections),
      self.class_list.clone(),
    );
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(&mut writer, &output)?;
    writer.flush()?;

    info!(
      "序列 {} 已保存: {} 张图像 -> {}",
      sequence_name,
      output.detections.len(),
      path.display()
    );
    Ok(path)
  }
}
