//! 训练集/测试集划分.

use super::Dataset;
use crate::error::{DatasetError, DatasetResult};
use either::Either::{self, Left, Right};
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 划分参数.
///
/// 所有数量都以 "图像" 为单位: 一张图像是 `tiles` 个连续样本.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SplitSpec {
    /// 训练图像数: 按比例 (`Left`) 或固定个数 (`Right`).
    ///
    /// 只有这两种给法, 用 `Either` 足够.
    train: Either<f64, usize>,

    /// 每类测试图像数. `None` 表示取剩余全部.
    test: Option<usize>,

    /// 是否随机抽取训练图像.
    randomize: bool,

    /// 每张图像的 tile 数.
    tiles: usize,

    /// 固定训练数时, 是否裁掉图像不足的类别.
    prune: bool,
}

impl SplitSpec {
    fn base(train: Either<f64, usize>) -> Self {
        Self {
            train,
            test: None,
            randomize: true,
            tiles: 1,
            prune: false,
        }
    }

    /// 按比例划分, 每类训练图像数为 `floor(ratio * 图像数 + 0.5)`, 其余全部作测试.
    ///
    /// `ratio` 不在 `[0, 1]` 内 (包括 NaN) 时返回错误.
    pub fn with_ratio(ratio: f64) -> DatasetResult<Self> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(DatasetError::ParameterOutOfRange {
                name: "ratio",
                value: ratio,
                range: "[0, 1]",
            });
        }
        Ok(Self::base(Left(ratio)))
    }

    /// 每类固定 `train` 张训练图像, 其余全部作测试.
    pub fn with_fixed(train: usize) -> Self {
        Self::base(Right(train))
    }

    /// 每类只取 `test` 张测试图像.
    #[inline]
    pub fn test_images(mut self, test: usize) -> Self {
        self.test = Some(test);
        self
    }

    /// 设置是否随机抽取. 不随机时按原顺序取前若干张.
    #[inline]
    pub fn randomize(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }

    /// 设置每张图像的 tile 数 (至少为 1).
    #[inline]
    pub fn tiles(mut self, tiles: usize) -> Self {
        self.tiles = tiles.max(1);
        self
    }

    /// 设置是否裁掉图像数少于固定训练数的类别. 对按比例划分无效.
    #[inline]
    pub fn prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// 每张图像的 tile 数.
    #[inline]
    pub fn get_tiles(&self) -> usize {
        self.tiles
    }

    fn train_for(&self, available: usize) -> usize {
        match self.train {
            Left(ratio) => (ratio * available as f64 + 0.5).floor() as usize,
            Right(n) => n,
        }
    }
}

/// 单个类别的划分方案: 两组图像起始样本下标.
struct ClassPlan {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl Dataset {
    /// 把 `self` 按类别划分到 `train` 与 `test`.
    ///
    /// `train`/`test` 会先采用 `self` 的类别表与特征名. 若 `test` 已经有样本
    /// (例如从独立测试文件读入), 则不再从 `self` 抽取测试图像.
    ///
    /// 固定训练数且开启裁剪时, 图像不足的类别会从三个数据集中一并删除.
    /// 任何类别的训练数加测试数超过其图像数时返回错误, 此时三个数据集都不会被修改.
    ///
    /// 连续值数据集视为单一类别 (包括未知目标的样本).
    pub fn split<R: Rng + ?Sized>(
        &mut self,
        spec: &SplitSpec,
        rng: &mut R,
        train: &mut Dataset,
        test: &mut Dataset,
    ) -> DatasetResult<()> {
        self.ensure_complete()?;
        let tiles = spec.tiles;
        let fill_test = test.is_empty();

        let mut plans = Vec::with_capacity(self.class_count());
        let mut undersized = vec![];
        for class in 1..=self.class_count() {
            // 每张图像的首个样本下标
            let members: Vec<usize> = self
                .samples()
                .iter()
                .enumerate()
                .filter(|(_, s)| self.is_continuous() || s.label().class_index() == class)
                .map(|(i, _)| i)
                .collect();
            let images: Vec<usize> = members.chunks_exact(tiles).map(|c| c[0]).collect();
            let available = images.len();

            let n_train = spec.train_for(available);
            if spec.prune && spec.train.is_right() && available < n_train {
                undersized.push(class);
                plans.push(ClassPlan {
                    train: vec![],
                    test: vec![],
                });
                continue;
            }
            let n_test = match (fill_test, spec.test) {
                (false, _) => 0,
                (true, Some(n)) => n,
                (true, None) => available.saturating_sub(n_train),
            };
            if n_train + n_test > available {
                return Err(DatasetError::SplitExceedsClass {
                    class: self.classes().label(class).to_string(),
                    train: n_train,
                    test: n_test,
                    available,
                });
            }

            let mut remaining = images;
            let mut picked = Vec::with_capacity(n_train);
            for _ in 0..n_train {
                let pos = match spec.randomize {
                    true => rng.gen_range(0..remaining.len()),
                    false => 0,
                };
                picked.push(remaining.remove(pos));
            }
            remaining.truncate(n_test);
            plans.push(ClassPlan {
                train: picked,
                test: remaining,
            });
        }

        train.adopt_layout(self);
        test.adopt_layout(self);
        for plan in plans.iter() {
            for &start in plan.train.iter() {
                for s in &self.samples()[start..start + tiles] {
                    train.add_sample(s.clone())?;
                }
            }
            for &start in plan.test.iter() {
                for s in &self.samples()[start..start + tiles] {
                    test.add_sample(s.clone())?;
                }
            }
        }

        for &class in undersized.iter().rev() {
            log::info!(
                "Pruning class `{}`: fewer images than required for training",
                self.classes().label(class)
            );
            train.remove_class(class);
            test.remove_class(class);
            self.remove_class(class);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::two_class_dataset;
    use crate::{Label, Sample};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn one_class(n: usize) -> Dataset {
        let mut ds = Dataset::default();
        ds.add_class("only").unwrap();
        for i in 0..n {
            ds.add_sample(Sample::new(vec![i as f64], Label::Discrete(1), format!("{i}")))
                .unwrap();
        }
        ds
    }

    /// 比例越界返回错误而不是 panic.
    #[test]
    fn test_ratio_out_of_range() {
        for bad in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                SplitSpec::with_ratio(bad),
                Err(DatasetError::ParameterOutOfRange { name: "ratio", .. })
            ));
        }
        assert!(SplitSpec::with_ratio(0.0).is_ok());
        assert!(SplitSpec::with_ratio(1.0).is_ok());
    }

    /// 不随机时保持原顺序.
    #[test]
    fn test_split_in_order() {
        let mut ds = one_class(10);
        let (mut train, mut test) = (ds.empty_like(), ds.empty_like());
        let spec = SplitSpec::with_ratio(0.5).unwrap().randomize(false);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        ds.split(&spec, &mut rng, &mut train, &mut test).unwrap();

        let ids = |d: &Dataset| d.samples().iter().map(|s| s.id()).collect::<Vec<_>>();
        let all = ids(&ds);
        assert_eq!(ids(&train), all[..5]);
        assert_eq!(ids(&test), all[5..]);
        assert_eq!(train.classes().count(1), 5);
    }

    /// 随机划分: 训练与测试互不相交, 同一种子结果可复现.
    #[test]
    fn test_split_random_disjoint() {
        let run = |seed| {
            let mut ds = two_class_dataset(12);
            let (mut train, mut test) = (ds.empty_like(), ds.empty_like());
            let spec = SplitSpec::with_fixed(8).test_images(3);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            ds.split(&spec, &mut rng, &mut train, &mut test).unwrap();
            (train, test)
        };
        let (train, test) = run(7);
        assert_eq!(train.len(), 16);
        assert_eq!(test.len(), 6);
        let a: HashSet<_> = train.samples().iter().map(|s| s.id().get()).collect();
        assert!(test.samples().iter().all(|s| !a.contains(&s.id().get())));

        let (train2, _) = run(7);
        let src = |d: &Dataset| d.samples().iter().map(|s| s.source().to_string()).collect::<Vec<_>>();
        assert_eq!(src(&train), src(&train2));
    }

    /// 多 tile 图像整体划分.
    #[test]
    fn test_split_keeps_tiles_together() {
        let mut ds = one_class(12);
        let (mut train, mut test) = (ds.empty_like(), ds.empty_like());
        let spec = SplitSpec::with_fixed(2).tiles(3);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        ds.split(&spec, &mut rng, &mut train, &mut test).unwrap();
        assert_eq!(train.len(), 6);
        assert_eq!(test.len(), 6);
        for img in train.images(3) {
            let first = img[0].features()[0] as usize;
            assert_eq!(first % 3, 0);
            assert_eq!(img[2].features()[0] as usize, first + 2);
        }
    }

    #[test]
    fn test_split_exceeds_class() {
        let mut ds = one_class(4);
        let (mut train, mut test) = (ds.empty_like(), ds.empty_like());
        let spec = SplitSpec::with_fixed(3).test_images(2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = ds.split(&spec, &mut rng, &mut train, &mut test).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::SplitExceedsClass { train: 3, test: 2, available: 4, .. }
        ));
        assert!(train.is_empty() && test.is_empty());
        assert_eq!(ds.len(), 4);
    }

    /// 图像不足的类别在三个数据集中一并删除.
    #[test]
    fn test_split_prune() {
        let mut ds = Dataset::default();
        ds.add_class("big").unwrap();
        ds.add_class("small").unwrap();
        for i in 0..6 {
            ds.add_sample(Sample::new(vec![i as f64], Label::Discrete(1), "b"))
                .unwrap();
        }
        for i in 0..2 {
            ds.add_sample(Sample::new(vec![i as f64], Label::Discrete(2), "s"))
                .unwrap();
        }
        let (mut train, mut test) = (ds.empty_like(), ds.empty_like());
        let spec = SplitSpec::with_fixed(4).prune(true);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        ds.split(&spec, &mut rng, &mut train, &mut test).unwrap();

        assert_eq!(ds.class_count(), 1);
        assert_eq!(train.class_count(), 1);
        assert_eq!(test.class_count(), 1);
        assert_eq!(train.len(), 4);
        assert_eq!(test.len(), 2);
        assert_eq!(ds.len(), 6);
    }

    /// 已有测试样本时不再抽取测试图像.
    #[test]
    fn test_split_prepopulated_test() {
        let mut ds = one_class(6);
        let mut test = ds.empty_like();
        test.add_sample(Sample::new(vec![100.0], Label::Discrete(1), "ext"))
            .unwrap();
        let mut train = ds.empty_like();
        let spec = SplitSpec::with_ratio(0.5).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        ds.split(&spec, &mut rng, &mut train, &mut test).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(test.len(), 1);
        assert_eq!(test.classes().count(1), 1);
    }
}
