//! 逐特征分位数归一化.

use super::Dataset;
use crate::consts::normalize::{LOWER_QUANTILE, SCALE, UPPER_QUANTILE};
use crate::error::DatasetResult;
use ordered_float::OrderedFloat;

/// 按 `(min, max)` 把 `v` 映射到 `[0, SCALE]`.
///
/// 非有限值映射到 0. 上下界恰为 `(0, SCALE)` 时保持原值, 保证重复归一化不改变结果.
#[inline]
pub(crate) fn scale(v: f64, (min, max): (f64, f64)) -> f64 {
    if !v.is_finite() || v < min {
        0.0
    } else if v > max {
        SCALE
    } else if min >= max {
        0.0
    } else if v == max {
        SCALE
    } else if min == 0.0 && max == SCALE {
        v
    } else {
        SCALE * (v - min) / (max - min)
    }
}

impl Dataset {
    /// 归一化全部特征到 `[0, 100]`, 并记录每个特征的 `(min, max)`.
    ///
    /// 下界取 2.5% 分位数, 上界取 97.5% 分位数 (忽略正无穷). 之后可用
    /// [`Dataset::normalize_query`] 以相同边界处理外部样本.
    pub fn normalize(&mut self) -> DatasetResult<()> {
        self.ensure_complete()?;
        let n = self.len();
        if n == 0 {
            return Ok(());
        }

        let mut column = Vec::with_capacity(n);
        let mut bounds = Vec::with_capacity(self.feature_count());
        for f in 0..self.feature_count() {
            column.clear();
            column.extend(self.samples().iter().map(|s| OrderedFloat(s.features()[f])));
            column.sort_unstable();

            let mut top = n - 1;
            while top > 0 && column[top].0 == f64::INFINITY {
                top -= 1;
            }
            let max = column[(UPPER_QUANTILE * top as f64) as usize].0;
            let min = column[(LOWER_QUANTILE * n as f64) as usize].0;
            bounds.push((min, max));

            for s in self.samples_mut() {
                let v = &mut s.features_mut()[f];
                *v = scale(*v, (min, max));
            }
        }
        log::debug!("Normalized {} features over {n} samples", bounds.len());
        self.bounds = Some(bounds);
        Ok(())
    }

    /// 用训练集记录的边界归一化一个外部特征向量. 未归一化时原样复制.
    pub fn normalize_query(&self, features: &[f64]) -> Vec<f64> {
        match self.bounds() {
            Some(bounds) => features
                .iter()
                .zip(bounds.iter())
                .map(|(&v, &b)| scale(v, b))
                .collect(),
            None => features.to_vec(),
        }
    }
}
