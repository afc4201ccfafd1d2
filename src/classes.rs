// 该文件是 Shanan （山南西风） 项目的一部分。
// src/classes.rs - 标准类别表与同义词解析
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

use tracing::debug;

/// 标准类别表，下标即类别编号，与评分端保持一致，不可随意修改
pub const CLASSES: [&str; 31] = [
  "none",
  "bottle",
  "cup",
  "knife",
  "bowl",
  "wine glass",
  "fork",
  "spoon",
  "banana",
  "apple",
  "orange",
  "cake",
  "potted plant",
  "mouse",
  "keyboard",
  "laptop",
  "cell phone",
  "book",
  "clock",
  "chair",
  "dining table",
  "couch",
  "bed",
  "toilet",
  "television",
  "microwave",
  "toaster",
  "refrigerator",
  "oven",
  "sink",
  "person",
];

/// 同义词表: (别名, 标准类别名)
pub const SYNONYMS: [(&str, &str); 11] = [
  ("tv", "television"),
  ("tvmonitor", "television"),
  ("computer monitor", "television"),
  ("stool", "chair"),
  ("diningtable", "dining table"),
  ("pottedplant", "potted plant"),
  ("cellphone", "cell phone"),
  ("wineglass", "wine glass"),
  ("background", "none"),
  ("bg", "none"),
  ("__background__", "none"),
];

pub const fn num_classes() -> usize {
  CLASSES.len()
}

pub fn class_name(class_id: usize) -> Option<&'static str> {
  CLASSES.get(class_id).copied()
}

fn canonical_id(name: &str) -> Option<usize> {
  CLASSES.iter().position(|&class| class == name)
}

fn synonym_target(name: &str) -> Option<&'static str> {
  SYNONYMS
    .iter()
    .find(|(alias, _)| *alias == name)
    .map(|&(_, target)| target)
}

/// 类别名解析为标准类别编号，先查标准表，再查同义词表，不区分大小写
pub fn resolve(class_name: &str) -> Option<usize> {
  let name = class_name.to_lowercase();
  canonical_id(&name).or_else(|| synonym_target(&name).and_then(canonical_id))
}

/// 是否为标准类别名或同义词（精确匹配）
pub fn is_recognized(class_name: &str) -> bool {
  canonical_id(class_name).is_some() || synonym_target(class_name).is_some()
}

/// 提交类别位置到标准类别位置的映射
///
/// 无法解析的类别不参与映射，其概率直接丢弃，不会重新分配。
#[derive(Debug, Clone)]
pub struct ClassMapping {
  pairs: Box<[(usize, usize)]>,
  num_submission_classes: usize,
}

impl ClassMapping {
  pub fn new<S: AsRef<str>>(classes: &[S]) -> Self {
    let mut pairs = Vec::with_capacity(classes.len());
    for (sub_id, class) in classes.iter().enumerate() {
      match resolve(class.as_ref()) {
        Some(our_id) => {
          debug!(
            "类别 '{}' 对应标准类别 '{}'",
            class.as_ref(),
            class_name(our_id).unwrap_or_default()
          );
          pairs.push((sub_id, our_id));
        }
        None => debug!("类别 '{}' 无法识别，将被忽略", class.as_ref()),
      }
    }
    ClassMapping {
      pairs: pairs.into_boxed_slice(),
      num_submission_classes: classes.len(),
    }
  }

  /// 参与映射的类别数量
  pub fn len(&self) -> usize {
    self.pairs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.pairs.is_empty()
  }

  pub fn num_submission_classes(&self) -> usize {
    self.num_submission_classes
  }

  /// 把提交的概率向量重排为标准长度的稠密向量
  ///
  /// 多个提交类别映射到同一标准类别时，后出现的覆盖先出现的。
  pub fn remap(&self, label_probs: &[f64]) -> Vec<f64> {
    let mut probs = vec![0.0; num_classes()];
    for &(sub_id, our_id) in self.pairs.iter() {
      if let Some(&p) = label_probs.get(sub_id) {
        probs[our_id] = p;
      }
    }
    probs
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vocabulary_has_none_first() {
    assert_eq!(num_classes(), 31);
    assert_eq!(class_name(0), Some("none"));
    assert_eq!(class_name(31), None);
  }

  #[test]
  fn synonym_targets_are_canonical() {
    for (alias, target) in SYNONYMS {
      assert!(canonical_id(target).is_some(), "{alias} -> {target}");
      assert!(canonical_id(alias).is_none(), "{alias} shadows a class");
    }
  }

  #[test]
  fn resolves_exact_synonym_and_case() {
    assert_eq!(resolve("bottle"), Some(1));
    assert_eq!(resolve("Person"), Some(30));
    assert_eq!(resolve("tvmonitor"), Some(24));
    assert_eq!(resolve("TV"), Some(24));
    assert_eq!(resolve("__background__"), Some(0));
    assert_eq!(resolve("giraffe"), None);
    assert_eq!(resolve("3"), None);
  }

  #[test]
  fn recognition_is_exact() {
    assert!(is_recognized("cup"));
    assert!(is_recognized("stool"));
    assert!(!is_recognized("Cup"));
    assert!(!is_recognized("17"));
  }

  #[test]
  fn mapping_drops_unknown_classes() {
    let mapping = ClassMapping::new(&["cat", "cup", "tv", "dog"]);
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.num_submission_classes(), 4);

    let probs = mapping.remap(&[0.4, 0.3, 0.2, 0.1]);
    assert_eq!(probs.len(), num_classes());
    assert_eq!(probs[2], 0.3);
    assert_eq!(probs[24], 0.2);
    let total: f64 = probs.iter().sum();
    assert!((total - 0.5).abs() < 1e-12);
  }
}
