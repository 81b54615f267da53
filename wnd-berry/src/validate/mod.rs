//! 图像级评估与交叉验证.
//!
//! 一张测试图像由 `tiles` 个连续样本组成. 每个 tile 单独分类 (可选使用 tile 局部模型),
//! 再把概率平均 (或取最有把握的 tile) 得到图像级结果, 并累计到 [`SplitResult`].

use crate::classify::{KernelPick, Method, Prediction};
use crate::error::{DatasetError, DatasetResult};
use crate::{Dataset, SampleId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod correlation;
mod cross;
mod result;
mod summary;
pub mod tree;

pub use correlation::{gamma, ln_gamma, Correlation};
pub use cross::CrossValidator;
pub use result::{ImagePrediction, ImageSimilarity, SplitResult};
pub use summary::{ExportError, Summary};

/// 评估参数.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct EvalSpec {
    /// 分类方法.
    pub method: Method,
    /// WND-5 的类别挑选方式.
    pub kernel_pick: KernelPick,
    /// 每张图像的 tile 数.
    pub tiles: usize,
    /// 是否为每个 tile 位置使用单独的训练子集.
    pub tile_models: bool,
    /// 是否只采用最有把握的 tile.
    pub max_tile: bool,
    /// top-N 容忍: 真值在前 `rank` 个候选中即视为正确.
    pub rank: usize,
    /// 连续值插值使用的近邻数.
    pub neighbors: usize,
    /// 是否计算测试图像两两相似度.
    pub image_similarities: bool,
    /// 是否统计每个 tile 位置的准确率.
    pub tile_accuracy: bool,
}

impl Default for EvalSpec {
    fn default() -> Self {
        Self {
            method: Method::Wnd5,
            kernel_pick: KernelPick::Smallest,
            tiles: 1,
            tile_models: false,
            max_tile: false,
            rank: 1,
            neighbors: 1,
            image_similarities: false,
            tile_accuracy: false,
        }
    }
}

impl EvalSpec {
    /// 使用 `method` 的默认参数.
    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// 设置每张图像的 tile 数 (至少为 1).
    #[inline]
    pub fn tiles(mut self, tiles: usize) -> Self {
        self.tiles = tiles.max(1);
        self
    }

    /// 设置 top-N 容忍 (至少为 1).
    #[inline]
    pub fn rank(mut self, rank: usize) -> Self {
        self.rank = rank.max(1);
        self
    }
}

/// 单个 tile 的结论.
#[derive(Clone, Debug)]
struct TileOutcome {
    class: usize,
    probabilities: Vec<f64>,
    normalization: f64,
    value: Option<f64>,
    closest: Option<SampleId>,
    closest_distance: Option<f64>,
}

impl From<Prediction> for TileOutcome {
    fn from(p: Prediction) -> Self {
        Self {
            class: p.class,
            probabilities: p.probabilities,
            normalization: p.normalization,
            value: None,
            closest: p.closest,
            closest_distance: p.closest_distance,
        }
    }
}

impl TileOutcome {
    /// max-tile 模式下的把握程度, 越大越好.
    fn confidence(&self) -> f64 {
        match self.value {
            Some(_) => -self.closest_distance.unwrap_or(f64::INFINITY),
            None => {
                let own = self.probabilities[self.class];
                let others: f64 = self
                    .probabilities
                    .iter()
                    .enumerate()
                    .filter(|&(c, _)| c != 0 && c != self.class)
                    .map(|(_, p)| p)
                    .sum();
                match others {
                    o if o > 0.0 => own / o,
                    _ => f64::INFINITY,
                }
            }
        }
    }
}

impl Dataset {
    /// 以 `self` 为训练集, 对 `test` 中从 `image_start` 开始的一张图像分类.
    ///
    /// 1. 离散: 各 tile 概率取平均 (max-tile 模式取最有把握的 tile), 再按概率从高到低
    ///   依次挑选至多 `rank` 个类别, 挑到真值即停止, 最后挑到的类别作为预测;
    /// 2. 连续: 各 tile 插值取平均 (max-tile 模式取离训练样本最近的 tile).
    ///
    /// 插值会写回图像首个 tile 样本. `result` 给出时同时累计混淆矩阵、类相似度、
    /// tile 准确率与图像相似度.
    pub fn classify_image(
        &self,
        test: &mut Dataset,
        image_start: usize,
        spec: &EvalSpec,
        tile_models: Option<&[Dataset]>,
        mut result: Option<&mut SplitResult>,
    ) -> ImagePrediction {
        let tiles = spec.tiles.max(1);
        let k = self.class_count();
        let continuous = self.is_continuous();
        let images = test.len() / tiles;

        let first = &test.samples()[image_start];
        let (truth, source, id) = (first.label(), first.source().to_string(), first.id());

        let mut prob_sum = vec![0.0; k + 1];
        let mut value_sum = 0.0;
        let mut best: Option<(f64, usize, TileOutcome)> = None;
        let mut last: Option<TileOutcome> = None;
        for t in 0..tiles {
            let sample = &test.samples()[image_start + t];
            if sample.source() != source {
                log::warn!(
                    "Tile {t} of `{source}` comes from `{}`; tiles are not grouped",
                    sample.source()
                );
            }
            let model = tile_models.and_then(|m| m.get(t)).unwrap_or(self);

            let outcome = if continuous {
                let r = model.interpolate(sample, spec.neighbors);
                value_sum += r.value / tiles as f64;
                TileOutcome {
                    class: 0,
                    probabilities: vec![0.0; k + 1],
                    normalization: 0.0,
                    value: Some(r.value),
                    closest: r.closest,
                    closest_distance: Some(r.closest_distance),
                }
            } else {
                let p = model.classify(sample, spec.method, spec.kernel_pick);
                for c in 1..=k {
                    prob_sum[c] += p.probabilities[c] / tiles as f64;
                }
                if let Some(acc) = result.as_deref_mut().and_then(|r| r.tile_accuracy.as_mut()) {
                    if truth.is_known() && p.class == truth.class_index() {
                        acc[t] += 1.0 / images as f64;
                    }
                }
                TileOutcome::from(p)
            };

            if !spec.max_tile {
                if let Some(sim) = result.as_deref_mut().and_then(|r| r.image_similarity.as_mut()) {
                    self.add_image_distances(test, image_start + t, tiles, sim);
                }
            }

            if spec.max_tile {
                let score = outcome.confidence();
                if best.as_ref().map_or(true, |(s, _, _)| score > *s) {
                    best = Some((score, t, outcome.clone()));
                }
            }
            last = Some(outcome);
        }

        // max-tile 模式下只用最有把握的 tile 与其它图像比较
        if let Some((_, t, _)) = best.as_ref().filter(|_| spec.max_tile) {
            if let Some(sim) = result.as_deref_mut().and_then(|r| r.image_similarity.as_mut()) {
                self.add_image_distances(test, image_start + t, tiles, sim);
            }
        }

        let chosen = best.map(|(_, _, o)| o).or(last);
        let (probabilities, mut predicted, normalization, mut value) = match (&chosen, spec.max_tile) {
            (Some(o), true) => (o.probabilities.clone(), o.class, o.normalization, o.value),
            (Some(o), false) => (prob_sum, o.class, o.normalization, continuous.then_some(value_sum)),
            (None, _) => (prob_sum, 0, 0.0, None),
        };

        if !continuous && k > 1 {
            let mut picked = vec![false; k + 1];
            for _ in 0..spec.rank.max(1) {
                let found = (1..=k)
                    .filter(|&c| !picked[c] && probabilities[c] > 0.0)
                    .fold(None, |acc: Option<usize>, c| match acc {
                        Some(b) if probabilities[b] >= probabilities[c] => Some(b),
                        _ => Some(c),
                    });
                let Some(c) = found else {
                    break;
                };
                predicted = c;
                picked[c] = true;
                if c == truth.class_index() {
                    break;
                }
            }
            if self.classes().is_numeric() {
                value = Some(
                    (1..=k)
                        .map(|c| probabilities[c] * self.classes().value(c).unwrap_or(0.0))
                        .sum(),
                );
            }
        }
        if let Some(v) = value {
            test.samples_mut()[image_start].set_interpolated(v);
        }

        if let Some(r) = result {
            if !continuous {
                let row = truth.class_index().min(k);
                r.confusion[[row, predicted]] += 1;
                for c in 1..=k {
                    r.similarity[[row, c]] += probabilities[c];
                }
            }
        }

        let (closest, closest_distance) = match (&chosen, tiles == 1 || spec.max_tile) {
            (Some(o), true) => (o.closest, o.closest_distance),
            _ => (None, None),
        };
        ImagePrediction {
            sample: id,
            source,
            truth,
            predicted: if continuous { 0 } else { predicted },
            value,
            probabilities,
            normalization,
            closest,
            closest_distance,
        }
    }

    /// 把 `test` 第 `sample_index` 个样本到每张图像各 tile 的距离 (按训练集归一化)
    /// 累加到相似度矩阵中该图像所在的行. 每个 tile 贡献 `1 / tiles`.
    fn add_image_distances(
        &self,
        test: &Dataset,
        sample_index: usize,
        tiles: usize,
        sim: &mut ImageSimilarity,
    ) {
        let images = test.len() / tiles;
        let row = sample_index / tiles;
        let q = self.normalize_query(test.samples()[sample_index].features());
        for (j, other) in test.samples().iter().enumerate().take(images * tiles) {
            let d = self.distance(&q, &self.normalize_query(other.features()), 2.0);
            sim.matrix[[row, j / tiles]] += d / tiles as f64;
        }
    }

    /// 以 `self` 为训练集评估整个 `test`.
    ///
    /// 末尾不足一张图像的样本被忽略. 连续值或数值类别数据集还会计算插值与真值的相关性.
    pub fn evaluate(
        &self,
        test: &mut Dataset,
        spec: &EvalSpec,
        tile_models: Option<&[Dataset]>,
    ) -> DatasetResult<SplitResult> {
        self.ensure_complete()?;
        test.ensure_complete()?;
        if !test.is_empty() && test.feature_count() != self.feature_count() {
            return Err(DatasetError::FeatureCountMismatch {
                expected: self.feature_count(),
                found: test.feature_count(),
            });
        }
        let tiles = spec.tiles.max(1);
        let continuous = self.is_continuous();

        let mut result = SplitResult::new(self, test, spec);
        for i in 0..test.len() / tiles {
            let p = self.classify_image(test, i * tiles, spec, tile_models, Some(&mut result));
            if !continuous && p.truth.is_known() {
                result.known_images += 1;
                if p.predicted == p.truth.class_index() {
                    result.correct += 1;
                }
            }
            result.predictions.push(p);
        }
        result.finish(continuous);
        if continuous || self.classes().is_numeric() {
            result.correlation = Some(test.correlation(tiles));
        }
        log::info!(
            "Evaluated {} images with {}: accuracy {:.4}",
            result.predictions.len(),
            spec.method.name(),
            result.accuracy
        );
        Ok(result)
    }
}
