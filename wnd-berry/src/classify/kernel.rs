//! WND-5: 加权距离核分类.

use super::{KernelPick, Prediction};
use crate::consts::WND_KERNEL_POWER;
use crate::{Dataset, Sample};
use itertools::izip;

impl Dataset {
    /// WND-5 分类.
    ///
    /// 每个训练样本贡献 `d^-5`, 其中 `d = Σ w_i² (q_i − x_i)²` (只累加大于机器精度的项);
    /// `d` 小于机器精度的样本被跳过. 类别分数为其样本贡献之和, 没有贡献样本的类别分数为
    /// 正无穷. 概率为分数除以所有有限分数之和; 无穷分数的类别概率为 0.
    pub fn kernel_weighted(&self, query: &Sample, pick: KernelPick) -> Prediction {
        let k = self.class_count();
        let q = self.normalize_query(query.features());

        let mut scores = vec![0.0; k + 1];
        let mut contributors = vec![0usize; k + 1];
        for s in self.samples() {
            let d: f64 = izip!(self.weights(), &q, s.features())
                .map(|(w, x, y)| w * w * (x - y) * (x - y))
                .filter(|t| *t > f64::EPSILON)
                .sum();
            if d < f64::EPSILON {
                continue;
            }
            let c = s.label().class_index();
            scores[c] += d.powi(WND_KERNEL_POWER);
            contributors[c] += 1;
        }
        for c in 1..=k {
            if contributors[c] == 0 {
                scores[c] = f64::INFINITY;
            }
        }

        let mut ans = Prediction::empty(k);
        ans.normalization = scores[1..].iter().filter(|v| v.is_finite()).sum();
        for c in 1..=k {
            if scores[c].is_finite() && ans.normalization > 0.0 {
                ans.probabilities[c] = scores[c] / ans.normalization;
            }
        }

        let mut best = match pick {
            KernelPick::Smallest => f64::INFINITY,
            KernelPick::Largest => f64::NEG_INFINITY,
        };
        for c in 1..=k {
            let better = match pick {
                KernelPick::Smallest => scores[c] < best,
                KernelPick::Largest => scores[c].is_finite() && scores[c] > best,
            };
            if better {
                best = scores[c];
                ans.class = c;
            }
        }
        ans
    }
}

#[cfg(test)]
mod tests {
    use crate::classify::KernelPick;
    use crate::dataset::tests::two_class_dataset;
    use crate::{Dataset, Label, Sample};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_kernel_probabilities() {
        let mut ds = two_class_dataset(2);
        ds.set_weights(vec![1.0, 0.0]).unwrap();
        // 类 1: 10, 11; 类 2: 20, 21. 查询 12.
        let q = Sample::new(vec![12.0, 0.0], Label::Unknown, "q");
        let s1 = 4f64.powi(-5) + 1f64.powi(-5);
        let s2 = 64f64.powi(-5) + 81f64.powi(-5);

        let p = ds.kernel_weighted(&q, KernelPick::Largest);
        assert_eq!(p.class, 1);
        assert!(f64_eq(p.probabilities[1], s1 / (s1 + s2)));
        assert!(p.probabilities[1] > p.probabilities[2]);

        let p = ds.kernel_weighted(&q, KernelPick::Smallest);
        assert_eq!(p.class, 2);
    }

    /// 与查询重合的训练样本不贡献; 没有贡献的类别概率为 0.
    #[test]
    fn test_kernel_skips_exact_and_empty_class() {
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();
        ds.add_class("b").unwrap();
        ds.add_class("c").unwrap();
        for (v, c) in [(0.0, 1), (1.0, 1), (5.0, 2)] {
            ds.add_sample(Sample::new(vec![v], Label::Discrete(c), "x"))
                .unwrap();
        }
        let q = Sample::new(vec![0.0], Label::Unknown, "q");
        let p = ds.kernel_weighted(&q, KernelPick::Largest);
        assert_eq!(p.class, 1);
        assert_eq!(p.probabilities[3], 0.0);
        let sum: f64 = p.probabilities.iter().sum();
        assert!(f64_eq(sum, 1.0));
        assert!(f64_eq(p.normalization, 1.0 + 25f64.powi(-5)));
    }
}
