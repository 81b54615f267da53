//! 加权 Minkowski 距离.

use crate::Dataset;
use itertools::izip;

/// `(Σ w_i · |a_i − b_i|^p)^(1/p)`.
#[inline]
pub fn weighted_distance(weights: &[f64], a: &[f64], b: &[f64], power: f64) -> f64 {
    let sum: f64 = izip!(weights, a, b)
        .map(|(w, x, y)| w * (x - y).abs().powf(power))
        .sum();
    sum.powf(power.recip())
}

impl Dataset {
    /// 用本数据集的特征权重计算 `a` 与 `b` 的距离.
    #[inline]
    pub fn distance(&self, a: &[f64], b: &[f64], power: f64) -> f64 {
        weighted_distance(self.weights(), a, b, power)
    }
}

#[cfg(test)]
mod tests {
    use super::weighted_distance;
    use proptest::prelude::*;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_weighted_distance() {
        let w = [1.0, 4.0, 0.0];
        assert!(f64_eq(weighted_distance(&w, &[0.0, 0.0, 9.0], &[3.0, 2.0, 0.0], 2.0), 5.0));
        assert!(f64_eq(weighted_distance(&w, &[0.0, 0.0, 9.0], &[3.0, 2.0, 0.0], 1.0), 11.0));
    }

    proptest! {
        #[test]
        fn prop_self_distance_is_zero(
            v in prop::collection::vec((-1e6f64..1e6, 0.0f64..10.0), 1..40),
            p in 1.0f64..4.0,
        ) {
            let (a, w): (Vec<f64>, Vec<f64>) = v.into_iter().unzip();
            prop_assert_eq!(weighted_distance(&w, &a, &a, p), 0.0);
        }
    }
}
