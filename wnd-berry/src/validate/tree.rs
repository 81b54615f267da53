//! 相似度矩阵到距离矩阵的转换, 以及 PHYLIP 距离矩阵的输出.
//!
//! 树状图的绘制交给外部工具, 通过 [`TreeRenderer`] 注入.

use ndarray::{Array2, ArrayView2};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 把非对称相似度 `s[i, j]` 与 `s[j, i]` 合成一个距离的方式.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SimilarityFold {
    /// 取较小的相似度: `max(1 - s[i, j], 1 - s[j, i])`.
    MinSimilarity,

    /// 两个方向的平均: `1 - (s[i, j] + s[j, i]) / 2`.
    #[default]
    Average,

    /// 只用上三角.
    TopTriangle,

    /// 只用下三角.
    BottomTriangle,

    /// 直接使用相似度的平均值 (输入已是距离时使用, 例如图像相似度).
    MeanSimilarity,
}

/// 由方阵 `sim` 计算对称距离矩阵. `NaN` 与负值记为 0.
///
/// # 注意
///
/// `sim` 不是方阵时 panic.
pub fn similarity_to_distances(sim: ArrayView2<f64>, fold: SimilarityFold) -> Array2<f64> {
    let (n, m) = sim.dim();
    assert_eq!(n, m, "similarity matrix must be square");
    Array2::from_shape_fn((n, n), |(i, j)| {
        let (a, b) = (sim[[i, j]], sim[[j, i]]);
        let d = match fold {
            SimilarityFold::MinSimilarity => (1.0 - a).max(1.0 - b),
            SimilarityFold::Average => ((1.0 - a) + (1.0 - b)) / 2.0,
            SimilarityFold::TopTriangle if j >= i => 1.0 - a,
            SimilarityFold::TopTriangle => 1.0 - b,
            SimilarityFold::BottomTriangle if j <= i => 1.0 - a,
            SimilarityFold::BottomTriangle => 1.0 - b,
            SimilarityFold::MeanSimilarity => (a + b) / 2.0,
        };
        if d.is_nan() || d < 0.0 {
            0.0
        } else {
            d
        }
    })
}

/// PHYLIP 中的节点名: 取最后 8 个字符, 并去掉末尾一个非字母数字字符.
fn phylip_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    let mut short: Vec<char> = chars[chars.len().saturating_sub(8)..].to_vec();
    if short.last().map_or(false, |c| !c.is_alphanumeric()) {
        short.pop();
    }
    short.into_iter().collect()
}

/// 以 PHYLIP 距离矩阵格式写出 `dist`.
///
/// # 注意
///
/// `labels` 长度与 `dist` 的行数不一致时 panic.
pub fn write_phylip<W: Write>(w: &mut W, labels: &[String], dist: ArrayView2<f64>) -> io::Result<()> {
    assert_eq!(labels.len(), dist.nrows());
    writeln!(w, "{}", labels.len())?;
    for (label, row) in labels.iter().zip(dist.outer_iter()) {
        write!(w, "{:<10}", phylip_label(label))?;
        for d in row.iter() {
            write!(w, " {d:.4}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// 绘制树状图失败.
#[derive(Debug, Error)]
pub enum RenderError {
    /// 渲染工具不可用.
    #[error("tree renderer unavailable: {0}")]
    Unavailable(String),

    /// 渲染工具运行失败.
    #[error("tree renderer failed: {0}")]
    Failed(String),

    /// 读写中间文件失败.
    #[error("tree renderer I/O error: {0}")]
    Io(#[from] io::Error),
}

/// 由 PHYLIP 距离矩阵文件绘制树状图的外部工具.
pub trait TreeRenderer {
    /// 读取 `matrix` 并绘制名为 `name` 的树状图, 返回生成的图像路径.
    fn render(&self, matrix: &Path, name: &str) -> Result<PathBuf, RenderError>;
}

/// 在 `dir` 下写出 `{name}.phylip` 并调用 `renderer`.
///
/// 任何失败都只记录日志并返回 `None`.
pub fn render_tree(
    renderer: &dyn TreeRenderer,
    dir: &Path,
    name: &str,
    labels: &[String],
    dist: ArrayView2<f64>,
) -> Option<PathBuf> {
    let matrix = dir.join(format!("{name}.phylip"));
    let written = File::create(&matrix).and_then(|f| {
        let mut w = BufWriter::new(f);
        write_phylip(&mut w, labels, dist)?;
        w.flush()
    });
    if let Err(e) = written {
        log::warn!("Cannot write `{}`: {e}", matrix.display());
        return None;
    }
    match renderer.render(&matrix, name) {
        Ok(image) => {
            log::info!("Tree `{name}` rendered to `{}`", image.display());
            Some(image)
        }
        Err(e) => {
            log::warn!("Skipping tree `{name}`: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_folds() {
        let sim = array![[1.0, 0.2], [0.6, 1.0]];
        let d = similarity_to_distances(sim.view(), SimilarityFold::MinSimilarity);
        assert!(f64_eq(d[[0, 1]], 0.8) && f64_eq(d[[1, 0]], 0.8));
        assert!(f64_eq(d[[0, 0]], 0.0));

        let d = similarity_to_distances(sim.view(), SimilarityFold::Average);
        assert!(f64_eq(d[[0, 1]], 0.6));

        let d = similarity_to_distances(sim.view(), SimilarityFold::TopTriangle);
        assert!(f64_eq(d[[0, 1]], 0.8) && f64_eq(d[[1, 0]], 0.8));

        let d = similarity_to_distances(sim.view(), SimilarityFold::BottomTriangle);
        assert!(f64_eq(d[[0, 1]], 0.4) && f64_eq(d[[1, 0]], 0.4));

        let d = similarity_to_distances(sim.view(), SimilarityFold::MeanSimilarity);
        assert!(f64_eq(d[[0, 1]], 0.4) && f64_eq(d[[1, 1]], 1.0));
    }

    #[test]
    fn test_degenerate_distances() {
        let sim = array![[f64::NAN, 1.5], [1.5, 1.0]];
        let d = similarity_to_distances(sim.view(), SimilarityFold::Average);
        assert_eq!(d[[0, 0]], 0.0);
        assert_eq!(d[[0, 1]], 0.0);
    }

    #[test]
    fn test_write_phylip() {
        assert_eq!(phylip_label("a_very_long_label"), "ng_label");
        assert_eq!(phylip_label("abc_"), "abc");
        assert_eq!(phylip_label(""), "");

        let labels = vec!["x".to_string(), "y".to_string()];
        let mut buf = vec![];
        write_phylip(&mut buf, &labels, array![[0.0, 0.5], [0.5, 0.0]].view()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2");
        assert_eq!(lines[1], "x          0.0000 0.5000");
    }

    struct Failing;

    impl TreeRenderer for Failing {
        fn render(&self, _: &Path, _: &str) -> Result<PathBuf, RenderError> {
            Err(RenderError::Unavailable("fitch".into()))
        }
    }

    struct Echo;

    impl TreeRenderer for Echo {
        fn render(&self, matrix: &Path, name: &str) -> Result<PathBuf, RenderError> {
            assert!(matrix.exists());
            Ok(matrix.with_file_name(format!("{name}.ps")))
        }
    }

    #[test]
    fn test_render_tree() {
        let dir = tempfile::tempdir().unwrap();
        let labels = vec!["a".to_string()];
        let dist = array![[0.0]];
        assert!(render_tree(&Failing, dir.path(), "t", &labels, dist.view()).is_none());
        let image = render_tree(&Echo, dir.path(), "t", &labels, dist.view()).unwrap();
        assert_eq!(image, dir.path().join("t.ps"));
        assert!(dir.path().join("t.phylip").exists());
    }
}
