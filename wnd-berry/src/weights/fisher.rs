//! Fisher 判别分数与 Pearson 相关权重.

use crate::consts::FISHER_EPSILON;
use crate::error::DatasetResult;
use crate::Dataset;

impl Dataset {
    /// 计算全部特征的权重并覆盖现有权重.
    ///
    /// 1. 离散: `类均值的方差 (除以 K - 1) / 平均类内方差`, 平均类内方差为 0 时加 1e-6;
    ///   未知样本不参与, 没有样本的类别也不参与.
    /// 2. 连续: 已知目标样本上, 特征与目标值 z 分数乘积的平均值的绝对值.
    ///
    /// 非有限的分数记为 0.
    pub fn compute_weights(&mut self) -> DatasetResult<()> {
        self.ensure_complete()?;
        let scores: Vec<f64> = (0..self.feature_count())
            .map(|f| match self.is_continuous() {
                true => self.pearson_score(f),
                false => self.fisher_score(f),
            })
            .map(|w| if w.is_finite() { w } else { 0.0 })
            .collect();
        self.weights_mut().copy_from_slice(&scores);
        log::debug!("Computed weights for {} features", scores.len());
        Ok(())
    }

    fn fisher_score(&self, f: usize) -> f64 {
        let k = self.class_count();
        let mut sum = vec![0.0; k + 1];
        let mut count = vec![0usize; k + 1];
        for s in self.samples() {
            let c = s.label().class_index();
            sum[c] += s.features()[f];
            count[c] += 1;
        }
        let mean: Vec<f64> = sum
            .iter()
            .zip(count.iter())
            .map(|(&s, &n)| if n > 0 { s / n as f64 } else { 0.0 })
            .collect();
        let mut var = vec![0.0; k + 1];
        for s in self.samples() {
            let c = s.label().class_index();
            var[c] += (s.features()[f] - mean[c]).powi(2);
        }

        let present: Vec<usize> = (1..=k).filter(|&c| count[c] > 0).collect();
        if present.is_empty() {
            return 0.0;
        }
        let m = present.len() as f64;
        let mean_of_means = present.iter().map(|&c| mean[c]).sum::<f64>() / m;
        let var_of_means = match present.len() {
            1 => 0.0,
            _ => present
                .iter()
                .map(|&c| (mean[c] - mean_of_means).powi(2))
                .sum::<f64>()
                / (m - 1.0),
        };
        let mut inner = present
            .iter()
            .map(|&c| var[c] / count[c] as f64)
            .sum::<f64>()
            / m;
        if inner == 0.0 {
            inner += FISHER_EPSILON;
        }
        var_of_means / inner
    }

    fn pearson_score(&self, f: usize) -> f64 {
        let pairs: Vec<(f64, f64)> = self
            .samples()
            .iter()
            .filter_map(|s| s.label().target().map(|t| (s.features()[f], t)))
            .collect();
        if pairs.is_empty() {
            return 0.0;
        }
        let n = pairs.len() as f64;
        let (mx, mt) = pairs
            .iter()
            .fold((0.0, 0.0), |(a, b), (x, t)| (a + x / n, b + t / n));
        let sx = (pairs.iter().map(|(x, _)| (x - mx).powi(2)).sum::<f64>() / n).sqrt();
        let st = (pairs.iter().map(|(_, t)| (t - mt).powi(2)).sum::<f64>() / n).sqrt();
        if sx == 0.0 || st == 0.0 {
            return 0.0;
        }
        let z: f64 = pairs
            .iter()
            .map(|(x, t)| ((x - mx) / sx) * ((t - mt) / st))
            .sum();
        (z / n).abs()
    }
}
