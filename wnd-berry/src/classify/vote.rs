//! 逐特征排名投票 (实验性).

use super::Prediction;
use crate::{Dataset, Sample};
use ordered_float::OrderedFloat;

impl Dataset {
    /// 逐特征排名投票分类.
    ///
    /// 对每个特征, 按与查询值的差排序训练样本, 取最小类样本数个最近样本 (距离相同的一并取入),
    /// 若其中某类占比足够高, 则各类乘上 `该类入选数 / 该类样本数`. 最终取乘积最大的类别.
    /// 乘积在对数空间累积.
    pub fn rank_vote(&self, query: &Sample) -> Prediction {
        let k = self.class_count();
        let mut ans = Prediction::empty(k);
        let q = self.normalize_query(query.features());

        let mut per_class = vec![0usize; k + 1];
        for s in self.samples() {
            per_class[s.label().class_index()] += 1;
        }
        let Some(min_samples) = per_class[1..].iter().copied().filter(|&n| n > 0).min() else {
            return ans;
        };
        let threshold = (1.0 / k as f64).sqrt();

        let mut log_probs = vec![0.0f64; k + 1];
        let mut ranked: Vec<(OrderedFloat<f64>, usize)> = Vec::with_capacity(self.len());
        let mut close = vec![0usize; k + 1];
        for (f, &qf) in q.iter().enumerate() {
            ranked.clear();
            ranked.extend(
                self.samples()
                    .iter()
                    .map(|s| (OrderedFloat((qf - s.features()[f]).abs()), s.label().class_index())),
            );
            ranked.sort_by_key(|e| e.0);

            let edge = ranked[min_samples - 1].0;
            let size = ranked
                .iter()
                .position(|e| e.0 > edge)
                .unwrap_or(ranked.len());
            if size >= ranked.len() {
                continue;
            }
            close.iter_mut().for_each(|c| *c = 0);
            ranked[..size].iter().for_each(|&(_, c)| close[c] += 1);
            let max_close = close[1..].iter().copied().max().unwrap_or(0);
            if max_close as f64 / min_samples as f64 > threshold {
                for c in 1..=k {
                    if per_class[c] > 0 {
                        log_probs[c] += (close[c] as f64 / per_class[c] as f64).ln();
                    }
                }
            }
        }

        let candidates: Vec<usize> = (1..=k)
            .filter(|&c| per_class[c] > 0 && log_probs[c] > f64::NEG_INFINITY)
            .collect();
        let Some(&best) = candidates
            .iter()
            .max_by(|&&a, &&b| log_probs[a].total_cmp(&log_probs[b]).then(b.cmp(&a)))
        else {
            return ans;
        };
        ans.class = best;
        let top = log_probs[best];
        for &c in candidates.iter() {
            ans.probabilities[c] = (log_probs[c] - top).exp();
        }
        ans.normalization = ans.probabilities.iter().sum();
        let sum = ans.normalization;
        ans.probabilities.iter_mut().for_each(|p| *p /= sum);
        ans
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dataset, Label, Sample};

    #[test]
    fn test_rank_vote() {
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();
        ds.add_class("b").unwrap();
        for i in 0..4 {
            let i = i as f64;
            ds.add_sample(Sample::new(vec![i, 100.0 + i], Label::Discrete(1), "a"))
                .unwrap();
            ds.add_sample(Sample::new(vec![50.0 + i, 200.0 + i], Label::Discrete(2), "b"))
                .unwrap();
        }
        let q = Sample::new(vec![52.0, 201.0], Label::Unknown, "q");
        let p = ds.rank_vote(&q);
        assert_eq!(p.class, 2);
        assert!(p.probabilities[2] > p.probabilities[1]);
        assert!((p.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_rank_vote_empty() {
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();
        let q = Sample::new(vec![1.0], Label::Unknown, "q");
        assert_eq!(ds.rank_vote(&q).class, 0);
    }
}
