//! 多轮划分的汇总.

use super::{Correlation, SplitResult};
use ndarray::{arr1, Array2};
use ndarray_npy::{NpzWriter, WriteNpzError};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 导出汇总失败.
#[derive(Debug, Error)]
pub enum ExportError {
    /// 创建文件失败.
    #[error("cannot create `{}`: {source}", .path.display())]
    Io {
        /// 目标文件.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },

    /// 写入 npz 失败.
    #[error("cannot write npz archive: {0}")]
    Npz(#[from] WriteNpzError),
}

/// 多轮交叉验证的汇总.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Summary {
    /// 轮数.
    pub rounds: usize,
    /// 每轮准确率.
    pub accuracies: Vec<f64>,
    /// 平均准确率.
    pub mean_accuracy: f64,
    /// 准确率标准差 (总体).
    pub std_accuracy: f64,
    /// 各轮混淆矩阵之和.
    pub confusion: Array2<u64>,
    /// 各轮类相似度矩阵的平均.
    pub similarity: Array2<f64>,
    /// 各轮相关性的平均.
    pub correlation: Option<Correlation>,
}

impl Summary {
    /// 汇总 `results`. 类别布局取自第一轮, 空输入返回 `None`.
    pub fn from_results(results: &[SplitResult]) -> Option<Self> {
        let first = results.first()?;
        let n = results.len() as f64;
        let accuracies: Vec<f64> = results.iter().map(|r| r.accuracy).collect();
        let mean_accuracy = accuracies.iter().sum::<f64>() / n;
        let std_accuracy = (accuracies
            .iter()
            .map(|a| (a - mean_accuracy).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();

        let dim = first.confusion.dim();
        let mut confusion = Array2::zeros(dim);
        let mut similarity = Array2::zeros(first.similarity.dim());
        for r in results.iter().filter(|r| r.confusion.dim() == dim) {
            confusion += &r.confusion;
            similarity.scaled_add(1.0 / n, &r.similarity);
        }

        let correlations: Vec<&Correlation> =
            results.iter().filter_map(|r| r.correlation.as_ref()).collect();
        let correlation = (!correlations.is_empty()).then(|| {
            let m = correlations.len() as f64;
            correlations.iter().fold(Correlation::default(), |acc, c| Correlation {
                coefficient: acc.coefficient + c.coefficient / m,
                significance: acc.significance + c.significance / m,
                mean_abs_error: acc.mean_abs_error + c.mean_abs_error / m,
            })
        });

        Some(Self {
            rounds: results.len(),
            accuracies,
            mean_accuracy,
            std_accuracy,
            confusion,
            similarity,
            correlation,
        })
    }

    /// 写出文本报告.
    pub fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(
            w,
            "{} rounds, accuracy {:.4} ± {:.4}",
            self.rounds, self.mean_accuracy, self.std_accuracy
        )?;
        if let Some(c) = self.correlation.as_ref() {
            writeln!(
                w,
                "Mean correlation {:.4}, mean absolute error {:.4}",
                c.coefficient, c.mean_abs_error
            )?;
        }
        Ok(())
    }

    /// 以 npz 归档导出 `accuracies`, `confusion` 与 `similarity`.
    pub fn write_npz<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut npz = NpzWriter::new(file);
        npz.add_array("accuracies", &arr1(&self.accuracies))?;
        npz.add_array("confusion", &self.confusion)?;
        npz.add_array("similarity", &self.similarity)?;
        npz.finish()?;
        log::info!("Summary of {} rounds written to `{}`", self.rounds, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::EvalSpec;
    use crate::Dataset;
    use ndarray::{Ix1, Ix2, OwnedRepr};
    use ndarray_npy::NpzReader;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    fn round(accuracy: f64, hit: u64) -> SplitResult {
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();
        ds.add_class("b").unwrap();
        let mut r = SplitResult::new(&ds, &ds, &EvalSpec::default());
        r.accuracy = accuracy;
        r.confusion[[1, 1]] = hit;
        r.similarity[[1, 1]] = 1.0;
        r
    }

    #[test]
    fn test_summary() {
        assert!(Summary::from_results(&[]).is_none());

        let s = Summary::from_results(&[round(0.5, 1), round(1.0, 3)]).unwrap();
        assert_eq!(s.rounds, 2);
        assert!(f64_eq(s.mean_accuracy, 0.75));
        assert!(f64_eq(s.std_accuracy, 0.25));
        assert_eq!(s.confusion[[1, 1]], 4);
        assert!(f64_eq(s.similarity[[1, 1]], 1.0));
        assert!(s.correlation.is_none());
    }

    /// 类别布局与第一轮不同的结果不计入混淆矩阵.
    #[test]
    fn test_summary_skips_other_layout() {
        let mut ds = Dataset::default();
        for label in ["a", "b", "c"] {
            ds.add_class(label).unwrap();
        }
        let mut other = SplitResult::new(&ds, &ds, &EvalSpec::default());
        other.confusion[[1, 1]] = 7;

        let s = Summary::from_results(&[round(0.5, 1), other]).unwrap();
        assert_eq!(s.rounds, 2);
        assert_eq!(s.confusion.dim(), (3, 3));
        assert_eq!(s.confusion[[1, 1]], 1);
    }

    #[test]
    fn test_write_npz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.npz");
        let s = Summary::from_results(&[round(0.5, 1), round(1.0, 3)]).unwrap();
        s.write_npz(&path).unwrap();

        let mut npz = NpzReader::new(File::open(&path).unwrap()).unwrap();
        // 按写入顺序读取
        let acc = npz.by_index::<OwnedRepr<f64>, Ix1>(0).unwrap();
        assert_eq!(acc.to_vec(), vec![0.5, 1.0]);
        let confusion = npz.by_index::<OwnedRepr<u64>, Ix2>(1).unwrap();
        assert_eq!(confusion[[1, 1]], 4);
    }
}
