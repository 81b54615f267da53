//! 数据集文本格式读写, 以及 (可选) 二进制快照.
//!
//! 文本格式:
//!
//! ```text
//! <类别数> [continuous]
//! <特征数>
//! <样本数>
//! <特征名>            (每行一个, 共 <特征数> 行)
//! <类别标签>          (共 <类别数> + 1 行, 第一行为未知槽位, 内容忽略)
//! <特征值 ...> <类别> (每个样本两行: 本行与下一行)
//! <来源路径>
//! ```
//!
//! 整数值的特征按整数写出, 其余按 `%.5e` 科学计数法写出. 连续值数据集中,
//! `<类别>` 一列为目标值, 未知写作 `NaN`.

use super::Dataset;
use crate::error::{DatasetError, DatasetResult};
use crate::{Label, Sample};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const CONTINUOUS_TAG: &str = "continuous";

/// 特征值的文本形式.
fn format_value(v: f64) -> String {
    if v.is_finite() && v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.5e}")
    }
}

/// 按行读取, 并记录行号.
struct Lines<'p, R> {
    inner: std::io::Lines<R>,
    path: &'p Path,
    line: usize,
}

impl<'p, R: BufRead> Lines<'p, R> {
    fn next_line(&mut self, what: &str) -> DatasetResult<String> {
        self.line += 1;
        match self.inner.next() {
            Some(Ok(l)) => Ok(l),
            Some(Err(e)) => Err(DatasetError::io_at(self.path)(e)),
            None => Err(self.malformed(format!("unexpected end of file, expecting {what}"))),
        }
    }

    fn malformed<S: Into<String>>(&self, reason: S) -> DatasetError {
        DatasetError::malformed(self.path, self.line, reason)
    }

    fn next_usize(&mut self, what: &str) -> DatasetResult<usize> {
        let l = self.next_line(what)?;
        l.trim()
            .parse()
            .map_err(|_| self.malformed(format!("invalid {what} `{}`", l.trim())))
    }
}

impl Dataset {
    /// 从文本文件读取数据集.
    pub fn read_from<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(DatasetError::io_at(path))?;
        Self::read(BufReader::new(file), path)
    }

    /// 从任意 `BufRead` 读取数据集. `origin` 只用于错误信息.
    pub fn read<R: BufRead>(reader: R, origin: &Path) -> DatasetResult<Self> {
        let mut lines = Lines {
            inner: reader.lines(),
            path: origin,
            line: 0,
        };

        let header = lines.next_line("class count")?;
        let mut tokens = header.split_whitespace();
        let class_count: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| lines.malformed("invalid class count"))?;
        let continuous = match tokens.next() {
            None => false,
            Some(CONTINUOUS_TAG) => true,
            Some(t) => return Err(lines.malformed(format!("unknown header token `{t}`"))),
        };
        let feature_count = lines.next_usize("feature count")?;
        let sample_count = lines.next_usize("sample count")?;

        let mut names = Vec::with_capacity(feature_count);
        for _ in 0..feature_count {
            names.push(lines.next_line("feature name")?.trim_end().to_string());
        }

        let mut ds = Self::new(class_count.max(crate::consts::DEFAULT_CLASS_CAPACITY));
        ds.set_feature_names(names)?;
        lines.next_line("unknown class label")?;
        for _ in 0..class_count {
            let label = lines.next_line("class label")?;
            let label = label.trim_end();
            if continuous {
                ds.add_continuous_class(label);
            } else {
                ds.add_class(label)
                    .map_err(|e| lines.malformed(e.to_string()))?;
            }
        }

        for _ in 0..sample_count {
            let row = lines.next_line("sample values")?;
            let mut values = Vec::with_capacity(feature_count + 1);
            for t in row.split_whitespace() {
                let v: f64 = t
                    .parse()
                    .map_err(|_| lines.malformed(format!("invalid value `{t}`")))?;
                values.push(v);
            }
            if values.len() != feature_count + 1 {
                return Err(lines.malformed(format!(
                    "expected {} values, found {}",
                    feature_count + 1,
                    values.len()
                )));
            }
            let class = values.pop().unwrap_or(0.0);
            let label = match (continuous, class) {
                (true, v) if v.is_nan() => Label::Unknown,
                (true, v) => Label::Continuous(v),
                (false, c) if c == 0.0 => Label::Unknown,
                (false, c) if c > 0.0 && c == c.trunc() => Label::Discrete(c as usize),
                (false, c) => return Err(lines.malformed(format!("invalid class `{c}`"))),
            };
            let source = lines.next_line("sample source")?.trim_end().to_string();
            ds.add_sample(Sample::new(values, label, source))
                .map_err(|e| lines.malformed(e.to_string()))?;
        }
        log::info!(
            "Loaded {} samples of {} classes from `{}`",
            ds.len(),
            ds.class_count(),
            origin.display()
        );
        Ok(ds)
    }

    /// 写入文本文件.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> DatasetResult<()> {
        self.ensure_complete()?;
        let path = path.as_ref();
        let file = File::create(path).map_err(DatasetError::io_at(path))?;
        let mut w = BufWriter::new(file);
        self.write(&mut w)
            .and_then(|_| w.flush())
            .map_err(DatasetError::io_at(path))
    }

    /// 写入任意 `Write`. 调用方需保证没有未就绪样本.
    pub fn write<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        match self.is_continuous() {
            true => writeln!(w, "{} {CONTINUOUS_TAG}", self.class_count())?,
            false => writeln!(w, "{}", self.class_count())?,
        }
        writeln!(w, "{}", self.feature_count())?;
        writeln!(w, "{}", self.len())?;
        for f in 0..self.feature_count() {
            writeln!(w, "{}", self.feature_name(f))?;
        }
        for label in self.classes().labels() {
            writeln!(w, "{label}")?;
        }
        for s in self.samples() {
            for &v in s.features() {
                write!(w, "{} ", format_value(v))?;
            }
            match s.label() {
                Label::Unknown if self.is_continuous() => writeln!(w, "NaN")?,
                Label::Unknown => writeln!(w, "0")?,
                Label::Discrete(c) => writeln!(w, "{c}")?,
                Label::Continuous(v) => writeln!(w, "{v:.6}")?,
            }
            writeln!(w, "{}", s.source())?;
        }
        Ok(())
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "serde")] {
        impl Dataset {
            /// 以 `bincode` 保存完整快照 (包括权重与归一化边界).
            pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> DatasetResult<()> {
                let path = path.as_ref();
                let file = File::create(path).map_err(DatasetError::io_at(path))?;
                let mut w = BufWriter::new(file);
                bincode::serialize_into(&mut w, self)?;
                w.flush().map_err(DatasetError::io_at(path))
            }

            /// 读取 [`Dataset::save_snapshot`] 保存的快照.
            pub fn load_snapshot<P: AsRef<Path>>(path: P) -> DatasetResult<Self> {
                let path = path.as_ref();
                let file = File::open(path).map_err(DatasetError::io_at(path))?;
                let ds: Self = bincode::deserialize_from(BufReader::new(file))?;
                if let Some(max) = ds.samples().iter().map(|s| s.id()).max() {
                    max.reserve_through();
                }
                Ok(ds)
            }
        }
    }
}
