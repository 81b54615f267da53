//! 加权最近邻 (WNN).

use super::Prediction;
use crate::consts::{WNN_POWER, ZERO_DISTANCE};
use crate::{Dataset, Sample};

impl Dataset {
    /// 加权最近邻分类.
    ///
    /// 与查询样本距离为 0, 或来源路径与查询样本相同 (非空) 的训练样本不参与比较,
    /// 避免样本与自身匹配. 类别概率正比于该类最近距离的倒数.
    pub fn nearest_neighbor(&self, query: &Sample) -> Prediction {
        let k = self.class_count();
        let q = self.normalize_query(query.features());

        let mut ans = Prediction::empty(k);
        let mut class_min = vec![f64::INFINITY; k + 1];
        let mut closest = f64::INFINITY;
        for s in self.samples() {
            let d = self.distance(&q, s.features(), WNN_POWER);
            let same_source = !query.source().is_empty() && s.source() == query.source();
            if d < ZERO_DISTANCE || same_source {
                continue;
            }
            let c = s.label().class_index();
            if d < closest {
                closest = d;
                ans.class = c;
                ans.closest = Some(s.id());
                ans.closest_distance = Some(d);
            }
            if d < class_min[c] {
                class_min[c] = d;
            }
        }

        for c in 1..=k {
            ans.probabilities[c] = match class_min[c] {
                d if d == 0.0 => 1.0,
                d => d.recip(),
            };
        }
        ans.normalization = ans.probabilities.iter().sum();
        if ans.normalization > 0.0 {
            let sum = ans.normalization;
            ans.probabilities.iter_mut().for_each(|p| *p /= sum);
        }
        ans
    }
}
