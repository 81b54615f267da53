//! 单次划分的评估结果.

use super::{Correlation, EvalSpec};
use crate::weights::{FeatureGroup, RankedFeature};
use crate::{Dataset, Label, SampleId};
use ndarray::{Array2, Axis};
use std::io::{self, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一张测试图像的预测.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePrediction {
    /// 图像首个 tile 样本的标识.
    pub sample: SampleId,
    /// 来源图像.
    pub source: String,
    /// 真值.
    pub truth: Label,
    /// 预测类别. 连续值数据集为 0.
    pub predicted: usize,
    /// 插值 (连续值, 或数值类别标签的概率加权值).
    pub value: Option<f64>,
    /// 各类别概率 (多 tile 时为平均值, max-tile 模式为最佳 tile 的值).
    pub probabilities: Vec<f64>,
    /// 最后一个 (或最佳) tile 的概率归一化因子.
    pub normalization: f64,
    /// 最近训练样本. 只在单 tile 或 max-tile 模式下给出.
    pub closest: Option<SampleId>,
    /// 与最近训练样本的距离.
    pub closest_distance: Option<f64>,
}

/// 测试图像两两之间的相似度.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSimilarity {
    /// 每张图像首个 tile 的标识.
    pub ids: Vec<SampleId>,
    /// 每张图像的真值.
    pub labels: Vec<Label>,
    /// 每张图像的来源.
    pub sources: Vec<String>,
    /// 相似度矩阵. 评估过程中累加距离, 结束后归一化.
    pub matrix: Array2<f64>,
}

/// 单次划分的评估结果.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct SplitResult {
    /// 类别标签, 下标 0 为未知.
    pub class_labels: Vec<String>,
    /// 混淆矩阵 `[真值, 预测]`, 形状 `(K + 1, K + 1)`.
    pub confusion: Array2<u64>,
    /// 类相似度矩阵 `[真值, 类别]`. 结束后每行按对角线归一化.
    pub similarity: Array2<f64>,
    /// 每行归一化时使用的对角线平均概率.
    pub similarity_norm: Vec<f64>,
    /// 每个 tile 位置单独判断的准确率.
    pub tile_accuracy: Option<Vec<f64>>,
    /// 图像相似度.
    pub image_similarity: Option<ImageSimilarity>,
    /// 每张图像的预测.
    pub predictions: Vec<ImagePrediction>,
    /// 真值已知的测试图像数.
    pub known_images: usize,
    /// 预测正确的图像数.
    pub correct: usize,
    /// 准确率. 连续值数据集为 0.
    pub accuracy: f64,
    /// 插值与真值的相关性 (连续值或数值类别).
    pub correlation: Option<Correlation>,
    /// 训练集中最强的特征.
    pub ranked_features: Vec<RankedFeature>,
    /// 训练集的特征组汇总.
    pub feature_groups: Vec<FeatureGroup>,
}

impl SplitResult {
    /// 按训练集 `train` 与测试集 `test` 的布局初始化空结果.
    pub fn new(train: &Dataset, test: &Dataset, spec: &EvalSpec) -> Self {
        let k = train.class_count();
        let tiles = spec.tiles.max(1);
        let image_similarity = spec.image_similarities.then(|| {
            let firsts: Vec<_> = test.images(tiles).map(|img| &img[0]).collect();
            let n = firsts.len();
            ImageSimilarity {
                ids: firsts.iter().map(|s| s.id()).collect(),
                labels: firsts.iter().map(|s| s.label()).collect(),
                sources: firsts.iter().map(|s| s.source().to_string()).collect(),
                matrix: Array2::zeros((n, n)),
            }
        });
        Self {
            class_labels: train.classes().labels().to_vec(),
            confusion: Array2::zeros((k + 1, k + 1)),
            similarity: Array2::zeros((k + 1, k + 1)),
            similarity_norm: vec![0.0; k + 1],
            tile_accuracy: spec.tile_accuracy.then(|| vec![0.0; tiles]),
            image_similarity,
            predictions: vec![],
            known_images: 0,
            correct: 0,
            accuracy: 0.0,
            correlation: None,
            ranked_features: vec![],
            feature_groups: vec![],
        }
    }

    /// 真实类别个数.
    #[inline]
    pub fn class_count(&self) -> usize {
        self.class_labels.len() - 1
    }

    /// 收尾: 计算准确率, 归一化类相似度与图像相似度.
    pub(crate) fn finish(&mut self, continuous: bool) {
        self.accuracy = match (continuous, self.known_images) {
            (true, _) | (false, 0) => 0.0,
            (false, n) => self.correct as f64 / n as f64,
        };
        self.normalize_similarity();
        if let Some(sim) = self.image_similarity.as_mut() {
            normalize_image_similarity(&mut sim.matrix);
        }
    }

    /// 每行除以 `行内样本数 × 对角线平均概率`, 使对角线为 1.
    fn normalize_similarity(&mut self) {
        let k = self.class_count();
        for c in 1..=k {
            let n: u64 = (1..=k).map(|b| self.confusion[[c, b]]).sum();
            if n == 0 {
                continue;
            }
            let n = n as f64;
            let diag = self.similarity[[c, c]] / n;
            self.similarity_norm[c] = diag;
            let denom = if diag > 0.0 { n * diag } else { n };
            self.similarity
                .index_axis_mut(Axis(0), c)
                .iter_mut()
                .for_each(|v| *v /= denom);
        }
    }

    /// 写出文本报告.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        let k = self.class_count();
        if let Some(c) = self.correlation.as_ref() {
            writeln!(
                w,
                "Pearson correlation: {:.4} (p-density {:.4}), mean absolute error {:.4}",
                c.coefficient, c.significance, c.mean_abs_error
            )?;
        }
        if k > 1 {
            writeln!(
                w,
                "Accuracy: {:.4} ({} / {} images)",
                self.accuracy, self.correct, self.known_images
            )?;
            writeln!(w, "Confusion matrix:")?;
            for c in 1..=k {
                write!(w, "{S4}{:>12}", self.class_labels[c])?;
                for b in 1..=k {
                    write!(w, " {:>6}", self.confusion[[c, b]])?;
                }
                writeln!(w)?;
            }
            writeln!(w, "Similarity matrix:")?;
            for c in 1..=k {
                write!(w, "{S4}{:>12}", self.class_labels[c])?;
                for b in 1..=k {
                    write!(w, " {:>6.3}", self.similarity[[c, b]])?;
                }
                writeln!(w)?;
            }
        }
        if let Some(acc) = self.tile_accuracy.as_ref() {
            let shown: Vec<String> = acc.iter().map(|a| format!("{a:.3}")).collect();
            writeln!(w, "Tile accuracy: {}", shown.join(" "))?;
        }
        if !self.feature_groups.is_empty() {
            writeln!(w, "Feature groups:")?;
            for (i, g) in self.feature_groups.iter().enumerate() {
                writeln!(w, "{S4}{}. {}: {:.6} [{}]", i + 1, g.name, g.weight, g.count)?;
            }
        }
        if !self.ranked_features.is_empty() {
            writeln!(w, "Top features:")?;
            for (i, f) in self.ranked_features.iter().enumerate() {
                writeln!(w, "{S4}{}. {}: {:.6}", i + 1, f.name, f.weight)?;
            }
        }
        Ok(())
    }
}

/// 图像相似度归一化: 减去最小正值, 再除以最大值.
fn normalize_image_similarity(m: &mut Array2<f64>) {
    let min = m
        .iter()
        .copied()
        .filter(|v| *v > 0.0)
        .fold(f64::INFINITY, f64::min);
    if min.is_finite() {
        m.mapv_inplace(|v| v - min);
    }
    let max = m.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        m.mapv_inplace(|v| v / max);
    }
}
