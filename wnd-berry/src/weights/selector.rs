//! 外部特征选择器.

use crate::Dataset;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// 外部选择器错误.
#[derive(Debug, Error)]
pub enum SelectorError {
    /// 可执行文件不存在.
    #[error("外部选择器 `{}` 不可用", .0.display())]
    Unavailable(PathBuf),

    /// 进程返回非 0.
    #[error("外部选择器执行失败: {0}")]
    Failed(String),

    /// 输出无法解析.
    #[error("无法解析外部选择器输出: {0}")]
    Unparsable(String),

    /// 底层 I/O 错误.
    #[error("外部选择器 I/O 错误: {0}")]
    Io(#[from] io::Error),
}

/// 外部选择的结果.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectorOutcome {
    /// 已应用, 参数为保留的特征个数.
    Applied(usize),
    /// 已跳过, 权重不变. 参数为原因.
    Skipped(String),
}

/// 外部特征选择器.
pub trait FeatureSelector {
    /// 在 `dataset` 的正权重特征中选出至多 `budget` 个, 返回 `(特征下标, 新权重)`.
    fn select(&self, dataset: &Dataset, budget: usize) -> Result<Vec<(usize, f64)>, SelectorError>;
}

/// 调用外部 `mrmr` 程序的选择器.
///
/// 正权重特征与类别以 CSV 写入工作目录, 结果从标准输出中 `mRMR` 表格读取.
#[derive(Clone, Debug)]
pub struct MrmrSelector {
    executable: PathBuf,
    work_dir: PathBuf,
}

impl MrmrSelector {
    /// 初始化.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(executable: P, work_dir: Q) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    fn write_csv(dataset: &Dataset, path: &Path) -> io::Result<()> {
        let used: Vec<usize> = (0..dataset.feature_count())
            .filter(|&i| dataset.weights()[i] > 0.0)
            .collect();
        let mut w = BufWriter::new(File::create(path)?);
        write!(w, "class")?;
        for i in used.iter() {
            write!(w, ",{i}")?;
        }
        writeln!(w)?;
        for s in dataset.samples() {
            write!(w, "{}", s.label().class_index())?;
            for &i in used.iter() {
                write!(w, ",{:.0}", s.features()[i])?;
            }
            writeln!(w)?;
        }
        w.flush()
    }
}

impl FeatureSelector for MrmrSelector {
    fn select(&self, dataset: &Dataset, budget: usize) -> Result<Vec<(usize, f64)>, SelectorError> {
        if !self.executable.is_file() {
            return Err(SelectorError::Unavailable(self.executable.clone()));
        }
        let csv = self.work_dir.join("mrmr_sigs.csv");
        Self::write_csv(dataset, &csv)?;
        log::info!(
            "Running `{}` for {budget} features",
            self.executable.display()
        );
        let output = Command::new(&self.executable)
            .arg("-i")
            .arg(&csv)
            .args(["-n", &budget.to_string()])
            .args(["-s", &dataset.len().to_string()])
            .args(["-v", &dataset.feature_count().to_string()])
            .output();
        let _ = fs::remove_file(&csv);

        let output = output?;
        if !output.status.success() {
            return Err(SelectorError::Failed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        let picked = parse_mrmr_output(&String::from_utf8_lossy(&output.stdout))?;
        match picked.iter().find(|(i, _)| *i >= dataset.feature_count()) {
            Some((i, _)) => Err(SelectorError::Unparsable(format!(
                "feature index {i} out of range"
            ))),
            None => Ok(picked),
        }
    }
}

/// 解析 `mrmr` 的输出表格.
///
/// 表格以含 `mRMR` 的行开头, 随后一行表头, 之后每行为 `序号 列号 名称 分数`,
/// 名称即特征下标. 遇到空行或列数不足的行即结束. 负分数记为 0, 只返回正分数的特征.
pub fn parse_mrmr_output(text: &str) -> Result<Vec<(usize, f64)>, SelectorError> {
    let mut lines = text.lines().skip_while(|l| !l.contains("mRMR"));
    if lines.next().is_none() {
        return Err(SelectorError::Unparsable("no mRMR table".to_string()));
    }
    lines.next();

    let mut ans = vec![];
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            break;
        }
        let index: usize = tokens[2]
            .parse()
            .map_err(|_| SelectorError::Unparsable(line.to_string()))?;
        let weight: f64 = tokens[3]
            .parse()
            .map_err(|_| SelectorError::Unparsable(line.to_string()))?;
        if weight > 0.0 {
            ans.push((index, weight));
        }
    }
    Ok(ans)
}

impl Dataset {
    /// 用外部选择器进一步筛选特征.
    ///
    /// 预算为 `floor(selector_fraction * used_fraction * 特征数)`. 成功时所有未选中特征的权重置 0,
    /// 选中特征的权重替换为选择器给出的分数. 选择器失败时记录警告, 权重不变.
    pub fn apply_external_selector(
        &mut self,
        selector: &dyn FeatureSelector,
        used_fraction: f64,
        selector_fraction: f64,
    ) -> SelectorOutcome {
        let budget = (selector_fraction * used_fraction * self.feature_count() as f64) as usize;
        match selector.select(self, budget) {
            Ok(picked) => {
                self.weights_mut().iter_mut().for_each(|w| *w = 0.0);
                for &(i, w) in picked.iter() {
                    self.weights_mut()[i] = w;
                }
                SelectorOutcome::Applied(picked.len())
            }
            Err(e) => {
                log::warn!("Skipping external feature selection: {e}");
                SelectorOutcome::Skipped(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::two_class_dataset;

    const OUTPUT: &str = "\
You have specified parameters: threshold=mu+/-0.00*sigma.

*** MaxRel features ***
Order \t Fea \t Name \t Score
1 \t 2 \t 1 \t 0.400

*** mRMR features ***
Order \t Fea \t Name \t Score
1 \t 2 \t 1 \t 0.400
2 \t 1 \t 0 \t -0.010
3 \t 3 \t 7 \t 0.125

 *** This program and the respective minimum Redundancy Maximum Relevance (mRMR)
";

    #[test]
    fn test_parse_mrmr_output() {
        let picked = parse_mrmr_output(OUTPUT).unwrap();
        assert_eq!(picked, vec![(1, 0.4), (7, 0.125)]);
        assert!(parse_mrmr_output("nothing here").is_err());
    }

    struct Fixed(Vec<(usize, f64)>);

    impl FeatureSelector for Fixed {
        fn select(&self, _: &Dataset, _: usize) -> Result<Vec<(usize, f64)>, SelectorError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_apply_selector() {
        let mut ds = two_class_dataset(3);
        let out = ds.apply_external_selector(&Fixed(vec![(1, 0.7)]), 1.0, 1.0);
        assert_eq!(out, SelectorOutcome::Applied(1));
        assert_eq!(ds.weights(), &[0.0, 0.7]);
    }

    /// 没有可执行文件时跳过, 权重不变.
    #[test]
    fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = two_class_dataset(3);
        let sel = MrmrSelector::new(dir.path().join("mrmr"), dir.path());
        let out = ds.apply_external_selector(&sel, 0.5, 0.5);
        assert!(matches!(out, SelectorOutcome::Skipped(_)));
        assert_eq!(ds.weights(), &[1.0, 1.0]);
    }
}
