//! 特征权重.
//!
//! 离散数据集用 Fisher 判别分数 (类间方差 / 平均类内方差), 连续值数据集用特征与目标值的
//! Pearson 相关系数绝对值. 之后可按比例只保留最强特征, 或交给外部选择器 (mRMR) 再筛一遍.

use crate::consts::weights::DEFAULT_USED_FRACTION;
use crate::error::{DatasetError, DatasetResult};
use crate::Dataset;
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod file;
mod fisher;
mod groups;
mod selector;

pub use groups::FeatureGroup;
pub use selector::{parse_mrmr_output, FeatureSelector, MrmrSelector, SelectorError, SelectorOutcome};

/// 权重计算参数.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct WeightSpec {
    /// 保留的最强特征比例, 位于 `(0, 1]`.
    pub used_fraction: f64,

    /// 交给外部选择器时, 在保留特征中再取的比例. `None` 表示不使用外部选择器.
    pub selector_fraction: Option<f64>,
}

impl Default for WeightSpec {
    fn default() -> Self {
        Self {
            used_fraction: DEFAULT_USED_FRACTION,
            selector_fraction: None,
        }
    }
}

impl WeightSpec {
    /// 初始化. `used_fraction` 不在 `(0, 1]` 内 (包括 NaN) 时返回错误.
    pub fn new(used_fraction: f64) -> DatasetResult<Self> {
        if !(used_fraction > 0.0 && used_fraction <= 1.0) {
            return Err(DatasetError::ParameterOutOfRange {
                name: "used_fraction",
                value: used_fraction,
                range: "(0, 1]",
            });
        }
        Ok(Self {
            used_fraction,
            selector_fraction: None,
        })
    }

    /// 同时使用外部选择器, 在保留特征中再取 `fraction`.
    #[inline]
    pub fn with_selector(mut self, fraction: f64) -> Self {
        self.selector_fraction = Some(fraction);
        self
    }
}

/// 排名中的一个特征.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RankedFeature {
    /// 特征下标.
    pub index: usize,
    /// 特征名称.
    pub name: String,
    /// 权重.
    pub weight: f64,
}

impl Dataset {
    /// 只保留权重最高的 `fraction` 部分特征, 其余权重置 0. 返回使用的阈值.
    ///
    /// 阈值为升序排列后第 `floor((1 - fraction) * 特征数)` 个权重; 与阈值相等的特征都会保留.
    pub fn select_top_fraction(&mut self, fraction: f64) -> f64 {
        let n = self.feature_count();
        if n == 0 {
            return 0.0;
        }
        let mut sorted: Vec<OrderedFloat<f64>> =
            self.weights().iter().copied().map(OrderedFloat).collect();
        sorted.sort_unstable();
        let at = (((1.0 - fraction) * n as f64) as usize).min(n - 1);
        let threshold = sorted[at].0;
        for w in self.weights_mut() {
            if *w < threshold {
                *w = 0.0;
            }
        }
        log::debug!("Kept features with weight >= {threshold:.6}");
        threshold
    }

    /// 按权重降序列出前 `limit` 个正权重特征.
    pub fn ranked_features(&self, limit: usize) -> Vec<RankedFeature> {
        let mut order: Vec<usize> = (0..self.feature_count())
            .filter(|&i| self.weights()[i] > 0.0)
            .collect();
        // 稳定排序: 权重相同时保持原顺序
        order.sort_by_key(|&i| std::cmp::Reverse(OrderedFloat(self.weights()[i])));
        order
            .into_iter()
            .take(limit)
            .map(|index| RankedFeature {
                index,
                name: self.feature_name(index),
                weight: self.weights()[index],
            })
            .collect()
    }
}
