//! 连续值插值.

use super::Interpolation;
use crate::consts::WNN_POWER;
use crate::{Dataset, Sample, SampleId};

impl Dataset {
    /// 用最近的 `neighbors` 个训练样本的目标值做距离倒数加权平均.
    ///
    /// 目标值为连续值标签或数值类别标签的值; 没有数值的训练样本不参与.
    /// 若存在距离为 0 的近邻, 结果为这些近邻目标值的平均.
    pub fn interpolate(&self, query: &Sample, neighbors: usize) -> Interpolation {
        let n = neighbors.max(1);
        let q = self.normalize_query(query.features());

        // 按距离升序的 (距离, 目标值)
        let mut nearest: Vec<(f64, f64)> = Vec::with_capacity(n + 1);
        let mut closest: Option<SampleId> = None;
        let mut closest_distance = f64::INFINITY;
        for s in self.samples() {
            let Some(value) = self.label_value(s.label()) else {
                continue;
            };
            let d = self.distance(&q, s.features(), WNN_POWER);
            if d < closest_distance {
                closest_distance = d;
                closest = Some(s.id());
            }
            let at = nearest.partition_point(|&(e, _)| e <= d);
            if at < n {
                nearest.insert(at, (d, value));
                nearest.truncate(n);
            }
        }

        let exact: Vec<f64> = nearest
            .iter()
            .filter(|(d, _)| *d == 0.0)
            .map(|(_, v)| *v)
            .collect();
        let value = if !exact.is_empty() {
            exact.iter().sum::<f64>() / exact.len() as f64
        } else {
            let (num, den) = nearest
                .iter()
                .fold((0.0, 0.0), |(num, den), (d, v)| (num + v / d, den + d.recip()));
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        };
        Interpolation {
            value,
            closest,
            closest_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Dataset, Label, Sample};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    fn line() -> Dataset {
        let mut ds = Dataset::default();
        ds.add_continuous_class("y");
        for x in [0.0, 1.0, 4.0, 10.0] {
            ds.add_sample(Sample::new(vec![x], Label::Continuous(x * 2.0), "t"))
                .unwrap();
        }
        ds.add_sample(Sample::new(vec![2.0], Label::Unknown, "u"))
            .unwrap();
        ds
    }

    #[test]
    fn test_interpolate() {
        let ds = line();
        let q = Sample::new(vec![2.0], Label::Unknown, "q");
        let r = ds.interpolate(&q, 2);
        // 近邻 x = 1 (d = 1, y = 2) 与 x = 4 (d = 2, y = 8)
        let expected = (2.0 / 1.0 + 8.0 / 2.0) / (1.0 + 0.5);
        assert!(f64_eq(r.value, expected));
        assert_eq!(r.closest, Some(ds.samples()[1].id()));
        assert!(f64_eq(r.closest_distance, 1.0));
    }

    #[test]
    fn test_interpolate_exact_hit() {
        let ds = line();
        let q = Sample::new(vec![4.0], Label::Unknown, "q");
        let r = ds.interpolate(&q, 3);
        assert!(f64_eq(r.value, 8.0));
        assert_eq!(r.closest_distance, 0.0);
    }
}
