//! 训练集 (数据集) 管理.
//!
//! [`Dataset`] 持有样本、类别表、特征名称与特征权重. 归一化、划分、读写、
//! 特征补齐分别位于各子模块中.

use crate::consts::{DEFAULT_CLASS_CAPACITY, UNKNOWN_CLASS};
use crate::error::{DatasetError, DatasetResult};
use crate::{Label, Sample, SampleId, TileId};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod io;
mod labels;
mod normalize;
mod pending;
mod split;

pub use labels::ClassTable;
pub use split::SplitSpec;

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 训练集.
///
/// 样本按加入顺序存放; 同一图像的多个 tile 必须连续存放.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Dataset {
    samples: Vec<Sample>,
    classes: ClassTable,
    continuous: bool,
    feature_names: Vec<String>,
    feature_count: Option<usize>,
    weights: Vec<f64>,
    bounds: Option<Vec<(f64, f64)>>,
    pending: BTreeSet<SampleId>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_CAPACITY)
    }
}

impl Dataset {
    /// 初始化一个空数据集. `class_capacity` 为离散类别数上限.
    pub fn new(class_capacity: usize) -> Self {
        Self {
            samples: vec![],
            classes: ClassTable::new(class_capacity),
            continuous: false,
            feature_names: vec![],
            feature_count: None,
            weights: vec![],
            bounds: None,
            pending: BTreeSet::new(),
        }
    }

    /// 与 `self` 布局相同 (类别、特征名、连续性) 的空数据集. 权重复位为 1.
    pub fn empty_like(&self) -> Self {
        let mut ans = Self::new(self.classes.capacity());
        ans.adopt_layout(self);
        ans
    }

    /// 采用 `other` 的类别表、特征名与连续性. 已有样本的类别计数保留.
    pub(crate) fn adopt_layout(&mut self, other: &Dataset) {
        self.classes = other.classes.cleared();
        for s in self.samples.iter() {
            let c = s.label().class_index();
            if c < self.classes.labels().len() {
                self.classes.increment(c);
            }
        }
        self.continuous = other.continuous;
        self.feature_names = other.feature_names.clone();
        if let Some(n) = other.feature_count {
            self.set_feature_count(n);
        }
    }

    fn set_feature_count(&mut self, n: usize) {
        self.feature_count = Some(n);
        if self.weights.len() != n {
            self.weights = vec![1.0; n];
        }
    }

    /// 添加离散类别, 返回其索引.
    ///
    /// 1. 空标签返回 0 (未知), 不做改动;
    /// 2. 与最后一个类别相同的标签直接返回该类别的索引;
    /// 3. 其它标签必须大于目前最后一个类别 (按字节序), 否则返回错误;
    /// 4. 已是连续值数据集时返回错误.
    pub fn add_class(&mut self, label: &str) -> DatasetResult<usize> {
        if label.is_empty() {
            return Ok(UNKNOWN_CLASS);
        }
        if self.continuous {
            return Err(DatasetError::AddingClassToContinuous(label.to_string()));
        }
        self.classes.push(label)
    }

    /// 把数据集设为连续值模式, 以 `label` 作为值的名称.
    ///
    /// 若已存在离散类别, 只记录警告并返回 `None`. 若已是连续值模式,
    /// 保留原名称.
    pub fn add_continuous_class(&mut self, label: &str) -> Option<usize> {
        use crate::consts::CONTINUOUS_CLASS;

        if self.continuous {
            if self.classes.label(CONTINUOUS_CLASS) != label {
                log::warn!(
                    "Dataset is already continuous as `{}`, ignoring `{label}`",
                    self.classes.label(CONTINUOUS_CLASS)
                );
            }
            return Some(CONTINUOUS_CLASS);
        }
        if !self.classes.is_empty() {
            log::warn!(
                "Refusing to make a dataset with {} discrete classes continuous",
                self.classes.len()
            );
            return None;
        }
        self.continuous = true;
        self.classes.set_continuous(label);
        Some(CONTINUOUS_CLASS)
    }

    fn check_label(&self, label: Label) -> DatasetResult<()> {
        match label {
            Label::Unknown => Ok(()),
            Label::Continuous(_) if self.continuous => Ok(()),
            Label::Discrete(index) if !self.continuous => {
                if index == UNKNOWN_CLASS || index > self.classes.len() {
                    Err(DatasetError::SampleClassUndefined {
                        index,
                        class_count: self.classes.len(),
                    })
                } else {
                    Ok(())
                }
            }
            _ => Err(DatasetError::LabelKindMismatch),
        }
    }

    /// 添加样本.
    ///
    /// 第一个特征完整的样本确定特征个数; 之后的样本必须与之相同.
    pub fn add_sample(&mut self, sample: Sample) -> DatasetResult<SampleId> {
        self.check_label(sample.label())?;
        if sample.is_pending() {
            self.pending.insert(sample.id());
        } else {
            let found = sample.features().len();
            match self.feature_count {
                Some(expected) if expected != found => {
                    return Err(DatasetError::FeatureCountMismatch { expected, found });
                }
                Some(_) => {}
                None => self.set_feature_count(found),
            }
        }
        self.classes.increment(sample.label().class_index());
        let id = sample.id();
        self.samples.push(sample);
        Ok(id)
    }

    /// 删除类别 `index` 及其全部样本; 后续类别索引前移.
    ///
    /// `index` 为 0 时删除所有未知样本. 连续值数据集上该操作没有意义, 直接忽略.
    pub fn remove_class(&mut self, index: usize) {
        if self.continuous || index > self.classes.len() {
            return;
        }
        let before = self.samples.len();
        let pending = &mut self.pending;
        self.samples.retain(|s| {
            let keep = s.label().class_index() != index;
            if !keep {
                pending.remove(&s.id());
            }
            keep
        });
        log::debug!(
            "Removed {} samples of class `{}`",
            before - self.samples.len(),
            self.classes.label(index)
        );
        if index == UNKNOWN_CLASS {
            self.classes.reset_count(UNKNOWN_CLASS);
            return;
        }
        for s in self.samples.iter_mut() {
            if let Label::Discrete(c) = s.label() {
                if c > index {
                    s.set_label(Label::Discrete(c - 1));
                }
            }
        }
        self.classes.remove(index);
    }

    /// 把类别 `index` 的全部样本标为未知, 再删除该类别; 后续类别索引前移.
    ///
    /// 与 [`Dataset::remove_class`] 相同, 只是样本不删除而是移入未知槽位.
    /// `index` 为 0 或越界时不做改动.
    pub fn mark_unknown(&mut self, index: usize) {
        if self.continuous || index == UNKNOWN_CLASS || index > self.classes.len() {
            return;
        }
        let mut moved = 0;
        for s in self.samples.iter_mut() {
            match s.label() {
                Label::Discrete(c) if c == index => {
                    s.set_label(Label::Unknown);
                    moved += 1;
                }
                Label::Discrete(c) if c > index => s.set_label(Label::Discrete(c - 1)),
                _ => {}
            }
        }
        log::debug!(
            "Marked {moved} samples of class `{}` as unknown",
            self.classes.label(index)
        );
        self.classes.remove(index);
        self.classes.add_count(UNKNOWN_CLASS, moved);
    }

    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 全部样本.
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// 按稳定标识查找样本.
    pub fn by_id(&self, id: SampleId) -> Option<&Sample> {
        self.samples.iter().find(|s| s.id() == id)
    }

    /// 类别表.
    #[inline]
    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    /// 真实类别个数.
    #[inline]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// 是否为连续值数据集.
    #[inline]
    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// 特征个数. 尚无完整样本且未设置特征名时为 0.
    #[inline]
    pub fn feature_count(&self) -> usize {
        self.feature_count.unwrap_or(0)
    }

    /// 特征名称. 可能为空 (未设置).
    #[inline]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// 设置特征名称, 同时确定特征个数.
    pub fn set_feature_names(&mut self, names: Vec<String>) -> DatasetResult<()> {
        if let Some(expected) = self.feature_count {
            if expected != names.len() {
                return Err(DatasetError::FeatureCountMismatch {
                    expected,
                    found: names.len(),
                });
            }
        }
        self.set_feature_count(names.len());
        self.feature_names = names;
        Ok(())
    }

    /// 第 `index` 个特征的名称; 未设置名称时返回 `"feature {index}"`.
    pub fn feature_name(&self, index: usize) -> String {
        match self.feature_names.get(index) {
            Some(name) => name.clone(),
            None => format!("feature {index}"),
        }
    }

    /// 特征权重. 新数据集的权重全部为 1.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline]
    pub(crate) fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    /// 直接设置特征权重.
    pub fn set_weights(&mut self, weights: Vec<f64>) -> DatasetResult<()> {
        let expected = self.feature_count();
        if weights.len() != expected {
            return Err(DatasetError::FeatureCountMismatch {
                expected,
                found: weights.len(),
            });
        }
        self.weights = weights;
        Ok(())
    }

    /// 归一化时记录的逐特征 `(min, max)`. 未归一化时为 `None`.
    #[inline]
    pub fn bounds(&self) -> Option<&[(f64, f64)]> {
        self.bounds.as_deref()
    }

    /// 样本的真值数值: 连续值目标, 或数值类别标签的值.
    pub fn label_value(&self, label: Label) -> Option<f64> {
        match label {
            Label::Unknown => None,
            Label::Continuous(v) => Some(v),
            Label::Discrete(c) => self.classes.value(c),
        }
    }

    /// 按图像遍历: 每 `tiles` 个连续样本为一张图像. 末尾不足一张的样本被忽略.
    pub fn images(&self, tiles: usize) -> std::slice::ChunksExact<'_, Sample> {
        self.samples.chunks_exact(tiles.max(1))
    }

    /// 按 tile 区域拆分: 第 `i` 个子集包含每张图像的第 `i` 个 tile.
    ///
    /// 子集继承 `self` 的权重与归一化边界, 可直接用作 tile 局部模型.
    pub fn split_areas(&self, tiles: usize) -> Vec<Dataset> {
        let tiles = tiles.max(1);
        let mut areas: Vec<Dataset> = (0..tiles)
            .map(|_| {
                let mut d = self.empty_like();
                d.weights = self.weights.clone();
                d.bounds = self.bounds.clone();
                d
            })
            .collect();
        for (i, s) in self.samples.iter().enumerate() {
            let area = &mut areas[i % tiles];
            area.classes.increment(s.label().class_index());
            if s.is_pending() {
                area.pending.insert(s.id());
            }
            area.samples.push(s.clone());
        }
        areas
    }

    /// 若仍有缺特征的样本, 返回错误.
    #[inline]
    pub fn ensure_complete(&self) -> DatasetResult<()> {
        match self.pending.len() {
            0 => Ok(()),
            n => Err(DatasetError::PendingSamples(n)),
        }
    }

    /// 记录一个特征尚未就绪的样本.
    pub fn add_pending<S: Into<String>>(
        &mut self,
        label: Label,
        source: S,
        tile: TileId,
    ) -> DatasetResult<SampleId> {
        self.add_sample(Sample::new(vec![], label, source).with_tile(tile))
    }

    /// 尚未就绪的样本个数.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 两个类别, 每类 `per_class` 个单 tile 样本, 特征为 `[class * 10 + i, i]`.
    pub(crate) fn two_class_dataset(per_class: usize) -> Dataset {
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();
        ds.add_class("b").unwrap();
        for c in 1..=2usize {
            for i in 0..per_class {
                let f = vec![(c * 10 + i) as f64, i as f64];
                let s = Sample::new(f, Label::Discrete(c), format!("{c}/{i}.tif"));
                ds.add_sample(s).unwrap();
            }
        }
        ds
    }

    #[test]
    fn test_add_sample_checks() {
        let mut ds = two_class_dataset(2);
        assert_eq!(ds.feature_count(), 2);
        assert_eq!(ds.weights(), &[1.0, 1.0]);

        let bad = Sample::new(vec![1.0], Label::Discrete(1), "x");
        assert!(matches!(
            ds.add_sample(bad),
            Err(DatasetError::FeatureCountMismatch { expected: 2, found: 1 })
        ));
        let bad = Sample::new(vec![1.0, 2.0], Label::Discrete(3), "x");
        assert!(matches!(
            ds.add_sample(bad),
            Err(DatasetError::SampleClassUndefined { index: 3, .. })
        ));
        let bad = Sample::new(vec![1.0, 2.0], Label::Continuous(3.0), "x");
        assert!(matches!(ds.add_sample(bad), Err(DatasetError::LabelKindMismatch)));
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn test_continuous_class() {
        let mut ds = Dataset::default();
        assert_eq!(ds.add_continuous_class("age"), Some(1));
        assert_eq!(ds.add_continuous_class("weight"), Some(1));
        assert_eq!(ds.classes().label(1), "age");
        assert!(matches!(
            ds.add_class("x"),
            Err(DatasetError::AddingClassToContinuous(_))
        ));

        let mut ds = two_class_dataset(1);
        assert_eq!(ds.add_continuous_class("age"), None);
        assert!(!ds.is_continuous());
    }

    /// 删除类别后再按相同标签插入, 得到同样的类别表.
    #[test]
    fn test_remove_then_readd_class() {
        let mut ds = Dataset::default();
        for l in ["a", "b", "c"] {
            ds.add_class(l).unwrap();
        }
        ds.add_sample(Sample::new(vec![0.0], Label::Discrete(3), "c.tif"))
            .unwrap();
        let before = ds.classes().labels().to_vec();

        ds.remove_class(3);
        assert_eq!(ds.class_count(), 2);
        assert!(ds.is_empty());
        ds.add_class("c").unwrap();
        assert_eq!(ds.classes().labels(), before.as_slice());

        ds.remove_class(1);
        assert_eq!(ds.classes().labels(), &["", "b", "c"]);
    }

    #[test]
    fn test_remove_class_shifts_labels() {
        let mut ds = two_class_dataset(3);
        ds.remove_class(1);
        assert_eq!(ds.len(), 3);
        assert!(ds.samples().iter().all(|s| s.label() == Label::Discrete(1)));
        assert_eq!(ds.classes().count(1), 3);
    }

    #[test]
    fn test_mark_unknown() {
        let mut ds = two_class_dataset(3);
        ds.mark_unknown(2);
        assert_eq!(ds.class_count(), 1);
        assert_eq!(ds.classes().labels(), &["", "a"]);
        assert_eq!(ds.classes().count(0), 3);
        assert_eq!(ds.classes().count(1), 3);
        ds.remove_class(0);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.classes().count(0), 0);
    }

    fn three_class_dataset() -> Dataset {
        let mut ds = Dataset::default();
        for l in ["a", "b", "c"] {
            ds.add_class(l).unwrap();
        }
        for c in 1..=3usize {
            for i in 0..c {
                let s = Sample::new(vec![c as f64], Label::Discrete(c), format!("{c}/{i}.tif"));
                ds.add_sample(s).unwrap();
            }
        }
        ds
    }

    /// 重复添加最后一个类别返回原索引; 插到中间仍然报错.
    #[test]
    fn test_add_class_idempotent() {
        let mut ds = Dataset::default();
        assert_eq!(ds.add_class("a").unwrap(), 1);
        assert_eq!(ds.add_class("a").unwrap(), 1);
        assert_eq!(ds.add_class("c").unwrap(), 2);
        assert_eq!(ds.add_class("c").unwrap(), 2);
        assert_eq!(ds.class_count(), 2);
        assert!(matches!(
            ds.add_class("b"),
            Err(DatasetError::UnorderedClassInsertion { .. })
        ));
        assert!(matches!(
            ds.add_class("a"),
            Err(DatasetError::UnorderedClassInsertion { .. })
        ));
    }

    /// 删除中间类别: 后面类别的标签和样本索引都前移一位.
    #[test]
    fn test_remove_middle_class() {
        let mut ds = three_class_dataset();
        ds.remove_class(2);
        assert_eq!(ds.classes().labels(), &["", "a", "c"]);
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.classes().count(1), 1);
        assert_eq!(ds.classes().count(2), 3);
        for s in ds.samples() {
            let expected = if s.source().starts_with("3/") { 2 } else { 1 };
            assert_eq!(s.label(), Label::Discrete(expected));
        }
    }

    /// 把中间类别标为未知: 样本保留, 类别删除, 后续索引前移.
    #[test]
    fn test_mark_unknown_middle_class() {
        let mut ds = three_class_dataset();
        ds.mark_unknown(2);
        assert_eq!(ds.class_count(), 2);
        assert_eq!(ds.classes().label(2), "c");
        assert_eq!(ds.len(), 6);
        assert_eq!(ds.classes().count(0), 2);
        assert_eq!(ds.classes().count(1), 1);
        assert_eq!(ds.classes().count(2), 3);
        for s in ds.samples() {
            let expected = match &s.source()[..2] {
                "1/" => Label::Discrete(1),
                "2/" => Label::Unknown,
                _ => Label::Discrete(2),
            };
            assert_eq!(s.label(), expected);
        }

        // 未知槽位与越界索引不做改动
        ds.mark_unknown(0);
        ds.mark_unknown(5);
        assert_eq!(ds.class_count(), 2);
        assert_eq!(ds.len(), 6);
    }

    #[test]
    fn test_split_areas_round_robin() {
        let ds = two_class_dataset(4);
        let areas = ds.split_areas(2);
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].len(), 4);
        assert_eq!(areas[0].samples()[1].id(), ds.samples()[2].id());
        assert_eq!(areas[1].samples()[0].id(), ds.samples()[1].id());
        assert_eq!(areas[1].classes().count(1), 2);
    }
}
