//! 插值与真值的 Pearson 相关性.

use crate::Dataset;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 相关性统计.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Correlation {
    /// Pearson 相关系数.
    pub coefficient: f64,
    /// 显著性: 自由度 `N - 2` 的 t 分布在对应 t 值处的概率密度.
    pub significance: f64,
    /// 平均绝对误差.
    pub mean_abs_error: f64,
}

/// Lanczos 近似 (g = 7, 9 项).
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// `ln |Γ(x)|`.
pub fn ln_gamma(x: f64) -> f64 {
    use std::f64::consts::PI;
    if x < 0.5 {
        // 反射公式
        return (PI / (PI * x).sin()).abs().ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + 7.5;
    let a = LANCZOS[1..]
        .iter()
        .enumerate()
        .fold(LANCZOS[0], |acc, (i, c)| acc + c / (x + i as f64 + 1.0));
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// `Γ(x)`.
///
/// # 注意
///
/// 非正整数处没有定义, 返回值无意义.
pub fn gamma(x: f64) -> f64 {
    use std::f64::consts::PI;
    if x < 0.5 {
        PI / ((PI * x).sin() * gamma(1.0 - x))
    } else {
        ln_gamma(x).exp()
    }
}

/// 自由度 `nu` 的 t 分布在 `t` 处的密度.
fn t_density(t: f64, nu: f64) -> f64 {
    let ln = ln_gamma((nu + 1.0) / 2.0)
        - ln_gamma(nu / 2.0)
        - 0.5 * (nu * std::f64::consts::PI).ln()
        - (nu + 1.0) / 2.0 * (1.0 + t * t / nu).ln();
    ln.exp()
}

impl Correlation {
    /// 由 `(插值, 真值)` 对计算. 少于 3 对或任一方方差为 0 时系数与显著性为 0.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        let n = pairs.len();
        if n == 0 {
            return Self::default();
        }
        let nf = n as f64;
        let mean_abs_error = pairs.iter().map(|(p, t)| (p - t).abs()).sum::<f64>() / nf;
        if n < 3 {
            return Self {
                mean_abs_error,
                ..Self::default()
            };
        }

        let (mp, mt) = pairs
            .iter()
            .fold((0.0, 0.0), |(a, b), (p, t)| (a + p / nf, b + t / nf));
        let (vp, vt) = pairs.iter().fold((0.0, 0.0), |(a, b), (p, t)| {
            (a + (p - mp).powi(2), b + (t - mt).powi(2))
        });
        let (sp, st) = ((vp / (nf - 1.0)).sqrt(), (vt / (nf - 1.0)).sqrt());
        if sp == 0.0 || st == 0.0 {
            return Self {
                mean_abs_error,
                ..Self::default()
            };
        }
        let coefficient = pairs
            .iter()
            .map(|(p, t)| (p - mp) / sp * (t - mt) / st)
            .sum::<f64>()
            / (nf - 1.0);

        let nu = nf - 2.0;
        let r2 = (coefficient * coefficient).min(1.0);
        let significance = match 1.0 - r2 {
            d if d > 0.0 => t_density(coefficient * (nu / d).sqrt(), nu),
            _ => 0.0,
        };
        Self {
            coefficient,
            significance,
            mean_abs_error,
        }
    }
}

impl Dataset {
    /// 以每张图像首个 tile 的插值与真值计算相关性.
    ///
    /// 离散数据集中只要有一个类别标签不是数, 返回全零结果.
    /// 其余情况下, 没有插值或真值没有数值的图像不参与.
    pub fn correlation(&self, tiles: usize) -> Correlation {
        if !self.is_continuous() && !self.classes().is_numeric() {
            return Correlation::default();
        }
        let pairs: Vec<(f64, f64)> = self
            .images(tiles)
            .filter_map(|img| {
                let s = &img[0];
                Some((s.interpolated()?, self.label_value(s.label())?))
            })
            .collect();
        Correlation::from_pairs(&pairs)
    }
}
