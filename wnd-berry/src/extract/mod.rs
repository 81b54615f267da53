//! 特征提取接口与磁盘特征缓存.
//!
//! 真正的图像特征算法由外部实现 [`FeatureExtractor`]. 本模块负责把提取结果写入缓存,
//! 并协调多个进程对同一 tile 的提取: 通过独占创建锁文件认领, 未认领到的 tile
//! 先以未就绪样本加入数据集, 之后用 [`crate::Dataset::backfill`] 补齐.

use crate::error::{DatasetError, DatasetResult};
use crate::{Dataset, Sample, SampleId};
use std::fmt::Display;

mod cache;

pub use cache::{CacheError, CacheWriter, Claim, SigCache};

/// 一个 tile 的特征: 值与 (可选的) 名称, 顺序固定.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    /// 特征名称. 可以为空.
    pub names: Vec<String>,
    /// 特征值.
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// 初始化.
    ///
    /// # 注意
    ///
    /// `names` 非空时长度必须与 `values` 相同, 否则 panic.
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Self {
        assert!(names.is_empty() || names.len() == values.len());
        Self { names, values }
    }

    /// 不带名称的特征.
    #[inline]
    pub fn unnamed(values: Vec<f64>) -> Self {
        Self {
            names: vec![],
            values,
        }
    }
}

/// 外部特征提取器.
pub trait FeatureExtractor {
    /// 图像 tile 的类型.
    type Tile: ?Sized;

    /// 提取失败时的错误.
    type Error: Display;

    /// 计算 `tile` 的特征. `colors` 表示是否计算颜色相关特征.
    fn extract(&self, tile: &Self::Tile, colors: bool) -> Result<FeatureVector, Self::Error>;
}

/// 为未就绪样本提供特征.
pub trait FeatureSource {
    /// 加载 `sample` 的特征.
    fn load(&mut self, sample: &Sample) -> Result<FeatureVector, CacheError>;
}

/// [`Dataset::add_extracted`] 的结果.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Acquired {
    /// 本进程计算了特征 (并写入了缓存).
    Computed(SampleId),
    /// 直接读取了已有缓存.
    Cached(SampleId),
    /// 其它进程正在计算; 样本以未就绪状态加入.
    Deferred(SampleId),
}

impl Dataset {
    /// 为 `sample` (特征为空的模板) 获取特征并加入数据集.
    ///
    /// 没有缓存时直接调用 `extractor`. 有缓存时:
    ///
    /// 1. 缓存已存在: 直接读取;
    /// 2. 认领成功: 调用 `extractor` 计算并写入缓存;
    /// 3. 其它进程已认领: 样本以未就绪状态加入, 留待补齐.
    pub fn add_extracted<E: FeatureExtractor>(
        &mut self,
        extractor: &E,
        cache: Option<&SigCache>,
        tile: &E::Tile,
        colors: bool,
        mut sample: Sample,
    ) -> DatasetResult<Acquired> {
        let compute = |sample: &Sample| {
            extractor
                .extract(tile, colors)
                .map_err(|e| DatasetError::Extraction {
                    source_path: sample.source().to_string(),
                    reason: e.to_string(),
                })
        };

        let (fv, made): (FeatureVector, fn(SampleId) -> Acquired) = match cache {
            None => (compute(&sample)?, Acquired::Computed),
            Some(cache) => match cache.claim(sample.source(), sample.tile())? {
                Claim::Ready(path) => (SigCache::read(&path)?, Acquired::Cached),
                Claim::Owner(writer) => {
                    let fv = compute(&sample)?;
                    writer.commit(&fv)?;
                    (fv, Acquired::Computed)
                }
                Claim::Busy(path) => {
                    log::debug!("`{}` is being computed elsewhere, deferring", path.display());
                    return Ok(Acquired::Deferred(self.add_sample(sample)?));
                }
            },
        };

        if self.feature_names().is_empty() && !fv.names.is_empty() {
            self.set_feature_names(fv.names)?;
        }
        sample.set_features(fv.values);
        Ok(made(self.add_sample(sample)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Label, TileId};
    use std::cell::Cell;

    /// 把 tile 像素的平均值和最大值作为特征, 并记录调用次数.
    struct MeanMax {
        calls: Cell<usize>,
    }

    impl FeatureExtractor for MeanMax {
        type Tile = [f64];
        type Error = String;

        fn extract(&self, tile: &[f64], _colors: bool) -> Result<FeatureVector, String> {
            self.calls.set(self.calls.get() + 1);
            if tile.is_empty() {
                return Err("empty tile".to_string());
            }
            let mean = tile.iter().sum::<f64>() / tile.len() as f64;
            let max = tile.iter().copied().fold(f64::MIN, f64::max);
            Ok(FeatureVector::new(
                vec!["Mean Intensity [0]".into(), "Max Intensity [0]".into()],
                vec![mean, max],
            ))
        }
    }

    fn template(source: &str) -> Sample {
        Sample::new(vec![], Label::Discrete(1), source).with_tile(TileId::new(0, 1, 2))
    }

    #[test]
    fn test_add_extracted_with_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SigCache::new(dir.path());
        let ex = MeanMax {
            calls: Cell::new(0),
        };
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();

        let tile = [1.0, 2.0, 6.0];
        let got = ds
            .add_extracted(&ex, Some(&cache), &tile[..], false, template("img/a.tif"))
            .unwrap();
        assert!(matches!(got, Acquired::Computed(_)));
        assert_eq!(ds.feature_names()[0], "Mean Intensity [0]");

        // 第二次直接读缓存, 不再调用提取器.
        let got = ds
            .add_extracted(&ex, Some(&cache), &tile[..], false, template("img/a.tif"))
            .unwrap();
        assert!(matches!(got, Acquired::Cached(_)));
        assert_eq!(ex.calls.get(), 1);
        assert_eq!(ds.samples()[1].features(), &[3.0, 6.0]);
    }

    /// 别的进程持有锁时, 样本延后补齐.
    #[test]
    fn test_add_extracted_deferred() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SigCache::new(dir.path());
        let ex = MeanMax {
            calls: Cell::new(0),
        };
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();

        let sample = template("img/b.tif");
        let writer = match cache.claim(sample.source(), sample.tile()).unwrap() {
            Claim::Owner(w) => w,
            _ => panic!("expected to own the tile"),
        };
        let got = ds
            .add_extracted(&ex, Some(&cache), &[1.0][..], false, sample)
            .unwrap();
        assert!(matches!(got, Acquired::Deferred(_)));
        assert_eq!(ds.pending_count(), 1);
        assert_eq!(ex.calls.get(), 0);

        writer.commit(&FeatureVector::unnamed(vec![4.0, 5.0])).unwrap();
        let mut source = cache.clone();
        assert_eq!(ds.backfill(&mut source).unwrap(), 1);
        assert_eq!(ds.samples()[0].features(), &[4.0, 5.0]);
    }

    #[test]
    fn test_extractor_failure() {
        let ex = MeanMax {
            calls: Cell::new(0),
        };
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();
        let err = ds
            .add_extracted(&ex, None, &[][..], false, template("empty.tif"))
            .unwrap_err();
        assert!(matches!(err, DatasetError::Extraction { .. }));
        assert!(ds.is_empty());
    }
}
