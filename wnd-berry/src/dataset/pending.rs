//! 补齐延后提取的样本特征.

use super::Dataset;
use crate::error::{DatasetError, DatasetResult};
use crate::extract::FeatureSource;

impl Dataset {
    /// 从 `source` 为所有未就绪样本加载特征, 返回补齐的样本数.
    ///
    /// 任何样本加载失败都会在遍历结束后返回 [`DatasetError::IncompleteSamples`];
    /// 已成功加载的样本保持补齐状态.
    pub fn backfill<S: FeatureSource + ?Sized>(&mut self, source: &mut S) -> DatasetResult<usize> {
        let mut filled = 0;
        let mut failed: Vec<String> = vec![];
        for i in 0..self.samples.len() {
            if !self.samples[i].is_pending() {
                continue;
            }
            let fv = match source.load(&self.samples[i]) {
                Ok(fv) => fv,
                Err(e) => {
                    log::warn!("Cannot backfill `{}`: {e}", self.samples[i].source());
                    failed.push(self.samples[i].source().to_string());
                    continue;
                }
            };
            match self.feature_count {
                Some(expected) if expected != fv.values.len() => {
                    return Err(DatasetError::FeatureCountMismatch {
                        expected,
                        found: fv.values.len(),
                    });
                }
                Some(_) => {}
                None => self.set_feature_count(fv.values.len()),
            }
            if self.feature_names.is_empty() && !fv.names.is_empty() {
                self.feature_names = fv.names;
            }
            let sample = &mut self.samples[i];
            self.pending.remove(&sample.id());
            sample.set_features(fv.values);
            filled += 1;
        }

        log::info!("Backfilled {filled} samples");
        match failed.first() {
            None => Ok(filled),
            Some(first) => Err(DatasetError::IncompleteSamples {
                count: failed.len(),
                first: first.clone(),
            }),
        }
    }
}
