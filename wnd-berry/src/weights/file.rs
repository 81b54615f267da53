//! 权重文件读写. 每行 `<权重> <特征名>`.

use crate::error::{DatasetError, DatasetResult};
use crate::Dataset;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

impl Dataset {
    /// 保存权重.
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> DatasetResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(DatasetError::io_at(path))?;
        let mut w = BufWriter::new(file);
        (0..self.feature_count())
            .try_for_each(|i| writeln!(w, "{:.6} {}", self.weights()[i], self.feature_name(i)))
            .and_then(|_| w.flush())
            .map_err(DatasetError::io_at(path))
    }

    /// 读取权重文件并与当前权重合并, 返回原权重与文件中权重的欧氏距离.
    ///
    /// 1. `factor` 为 0 时直接替换;
    /// 2. 否则 `w += factor * 读入值`, 结果截断到非负.
    ///
    /// 距离只取决于原权重和读入值, 与 `factor` 无关.
    ///
    /// 文件中的权重个数与特征数不一致时返回错误, 权重不变.
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P, factor: f64) -> DatasetResult<f64> {
        let path = path.as_ref();
        let file = File::open(path).map_err(DatasetError::io_at(path))?;
        let mut loaded = Vec::with_capacity(self.feature_count());
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(DatasetError::io_at(path))?;
            let Some(token) = line.split_whitespace().next() else {
                continue;
            };
            let v: f64 = token
                .parse()
                .map_err(|_| DatasetError::malformed(path, i + 1, format!("invalid weight `{token}`")))?;
            loaded.push(v);
        }
        if loaded.len() != self.feature_count() {
            return Err(DatasetError::WeightCountMismatch {
                path: path.to_path_buf(),
                found: loaded.len(),
                expected: self.feature_count(),
            });
        }

        let mut dist = 0.0;
        for (w, v) in self.weights_mut().iter_mut().zip(loaded) {
            let old = *w;
            *w = match factor {
                f if f == 0.0 => v,
                f => (old + f * v).max(0.0),
            };
            dist += (old - v).powi(2);
        }
        Ok(dist.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use crate::dataset::tests::two_class_dataset;
    use crate::DatasetError;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_weights_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("w.txt");

        let mut ds = two_class_dataset(2);
        ds.set_weights(vec![0.25, 3.0]).unwrap();
        ds.save_weights(&p).unwrap();
        let text = std::fs::read_to_string(&p).unwrap();
        assert_eq!(text, "0.250000 feature 0\n3.000000 feature 1\n");

        let mut other = two_class_dataset(2);
        let d = other.load_weights(&p, 0.0).unwrap();
        assert_eq!(other.weights(), &[0.25, 3.0]);
        assert!(f64_eq(d, (0.75f64.powi(2) + 4.0).sqrt()));

        // w += -2 * loaded, 截断到 0
        other.load_weights(&p, -2.0).unwrap();
        assert!(f64_eq(other.weights()[0], 0.0));
        assert!(f64_eq(other.weights()[1], 0.0));
    }

    /// 合并模式下, 距离按原权重与读入值计算.
    #[test]
    fn test_blend_distance() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("w.txt");
        std::fs::write(&p, "2 feature 0\n2 feature 1\n").unwrap();

        let mut ds = two_class_dataset(2);
        let d = ds.load_weights(&p, 1.0).unwrap();
        assert_eq!(ds.weights(), &[3.0, 3.0]);
        assert!(f64_eq(d, 2f64.sqrt()));

        let d = ds.load_weights(&p, 0.5).unwrap();
        assert_eq!(ds.weights(), &[4.0, 4.0]);
        assert!(f64_eq(d, 2f64.sqrt()));
    }

    #[test]
    fn test_weights_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("w.txt");
        std::fs::write(&p, "1.0 a\n2.0 b\n3.0 c\n").unwrap();
        let mut ds = two_class_dataset(2);
        let err = ds.load_weights(&p, 0.0).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::WeightCountMismatch { found: 3, expected: 2, .. }
        ));
        assert_eq!(ds.weights(), &[1.0, 1.0]);
    }
}
