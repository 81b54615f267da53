//! 重复随机划分的交叉验证.

use super::{EvalSpec, SplitResult};
use crate::consts::weights::REPORTED_FEATURES;
use crate::dataset::SplitSpec;
use crate::error::DatasetResult;
use crate::weights::{FeatureSelector, SelectorOutcome, WeightSpec};
use crate::Dataset;
use rand::Rng;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 交叉验证器.
///
/// 每一轮: 划分 → 归一化训练集 → 计算权重 → 特征筛选 → (可选) 外部选择 → 评估.
pub struct CrossValidator {
    split: SplitSpec,
    eval: EvalSpec,
    weights: WeightSpec,
    normalize: bool,
    selector: Option<Box<dyn FeatureSelector + Send + Sync>>,
}

impl CrossValidator {
    /// 初始化. 评估使用的 tile 数与 `split` 保持一致.
    pub fn new(split: SplitSpec, eval: EvalSpec) -> Self {
        let eval = EvalSpec {
            tiles: split.get_tiles(),
            ..eval
        };
        Self {
            split,
            eval,
            weights: WeightSpec::default(),
            normalize: true,
            selector: None,
        }
    }

    /// 设置权重参数.
    #[inline]
    pub fn with_weights(mut self, weights: WeightSpec) -> Self {
        self.weights = weights;
        self
    }

    /// 是否归一化训练集 (默认是).
    #[inline]
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// 注入外部特征选择器. 只有 [`WeightSpec::selector_fraction`] 给出时才会调用.
    #[inline]
    pub fn with_selector(mut self, selector: Box<dyn FeatureSelector + Send + Sync>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// 划分参数.
    #[inline]
    pub fn get_split(&self) -> &SplitSpec {
        &self.split
    }

    /// 评估参数.
    #[inline]
    pub fn get_eval(&self) -> &EvalSpec {
        &self.eval
    }

    /// 执行一轮.
    ///
    /// `test_source` 给出时作为测试集 (例如独立的测试文件), 此时不再从 `dataset` 抽取测试图像.
    /// 裁剪类别会直接作用于 `dataset`.
    pub fn run_round<R: Rng + ?Sized>(
        &self,
        dataset: &mut Dataset,
        test_source: Option<&Dataset>,
        rng: &mut R,
    ) -> DatasetResult<SplitResult> {
        let mut train = Dataset::default();
        let mut test = test_source.cloned().unwrap_or_default();
        dataset.split(&self.split, rng, &mut train, &mut test)?;

        if self.normalize {
            train.normalize()?;
        }
        train.compute_weights()?;
        let groups = train.feature_groups();
        train.select_top_fraction(self.weights.used_fraction);
        if let (Some(selector), Some(fraction)) = (self.selector.as_deref(), self.weights.selector_fraction) {
            if let SelectorOutcome::Applied(n) =
                train.apply_external_selector(selector, self.weights.used_fraction, fraction)
            {
                log::debug!("External selector kept {n} features");
            }
        }

        let tile_models = self
            .eval
            .tile_models
            .then(|| train.split_areas(self.eval.tiles));
        let mut result = train.evaluate(&mut test, &self.eval, tile_models.as_deref())?;
        result.ranked_features = train.ranked_features(REPORTED_FEATURES);
        result.feature_groups = groups;
        Ok(result)
    }

    /// 执行 `rounds` 轮, 每轮基于 `dataset` 的一份拷贝.
    pub fn run<R: Rng + ?Sized>(
        &self,
        dataset: &Dataset,
        test_source: Option<&Dataset>,
        rounds: usize,
        rng: &mut R,
    ) -> DatasetResult<Vec<SplitResult>> {
        let mut results = Vec::with_capacity(rounds);
        for round in 0..rounds {
            let mut ds = dataset.clone();
            let r = self.run_round(&mut ds, test_source, rng)?;
            log::info!(
                "Round {}/{rounds}: accuracy {:.4} over {} images",
                round + 1,
                r.accuracy,
                r.predictions.len()
            );
            results.push(r);
        }
        Ok(results)
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl CrossValidator {
    /// 借助 `rayon`, 并行地执行 `rounds` 轮.
    ///
    /// 第 `i` 轮使用以 `seed + i` 初始化的 `ChaCha8Rng`, 因此结果与线程调度无关.
    pub fn par_run(
        &self,
        dataset: &Dataset,
        test_source: Option<&Dataset>,
        rounds: usize,
        seed: u64,
    ) -> DatasetResult<Vec<SplitResult>> {
        (0..rounds)
            .into_par_iter()
            .map(|round| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(round as u64));
                let mut ds = dataset.clone();
                self.run_round(&mut ds, test_source, &mut rng)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Method;
    use crate::validate::Summary;
    use crate::weights::SelectorError;
    use crate::{Label, Sample};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// 两个类别相距很远; 特征 0 区分类别, 特征 1 为噪声.
    fn separated(per_class: usize) -> Dataset {
        let mut ds = Dataset::default();
        ds.add_class("a").unwrap();
        ds.add_class("b").unwrap();
        ds.set_feature_names(vec!["Signal 0".into(), "Noise 0".into()])
            .unwrap();
        for c in 1..=2usize {
            for i in 0..per_class {
                let f = vec![(c * 100 + i) as f64, i as f64];
                ds.add_sample(Sample::new(f, Label::Discrete(c), format!("{c}/{i}.tif")))
                    .unwrap();
            }
        }
        ds
    }

    #[test]
    fn test_cross_validation() {
        let ds = separated(10);
        for method in [Method::Wnn, Method::Wnd5] {
            let cv = CrossValidator::new(
                SplitSpec::with_ratio(0.5).unwrap(),
                EvalSpec::with_method(method),
            )
            .with_weights(WeightSpec::new(0.5).unwrap());
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let results = cv.run(&ds, None, 3, &mut rng).unwrap();
            assert_eq!(results.len(), 3);
            for r in results.iter() {
                assert_eq!(r.known_images, 10);
                assert_eq!(r.correct, 10);
                assert_eq!(r.ranked_features.len(), 1);
                assert_eq!(r.ranked_features[0].index, 0);
            }
            let s = Summary::from_results(&results).unwrap();
            assert_eq!(s.mean_accuracy, 1.0);
            assert_eq!(s.confusion[[2, 2]], 15);
        }
        // 原数据集不受影响
        assert_eq!(ds.len(), 20);
    }

    #[test]
    fn test_reproducible_rounds() {
        let ds = separated(6);
        let cv = CrossValidator::new(SplitSpec::with_ratio(0.5).unwrap(), EvalSpec::default());
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            cv.run(&ds, None, 2, &mut rng)
                .unwrap()
                .iter()
                .flat_map(|r| r.predictions.iter().map(|p| p.source.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }

    struct Broken;

    impl FeatureSelector for Broken {
        fn select(&self, _: &Dataset, _: usize) -> Result<Vec<(usize, f64)>, SelectorError> {
            Err(SelectorError::Failed("exit status 1".into()))
        }
    }

    struct KeepNoise;

    impl FeatureSelector for KeepNoise {
        fn select(&self, _: &Dataset, _: usize) -> Result<Vec<(usize, f64)>, SelectorError> {
            Ok(vec![(1, 0.5)])
        }
    }

    #[test]
    fn test_selector_injection() {
        let ds = separated(8);
        let spec = WeightSpec::new(1.0).unwrap().with_selector(0.5);

        let cv = CrossValidator::new(SplitSpec::with_fixed(4), EvalSpec::default())
            .with_weights(spec.clone())
            .with_selector(Box::new(Broken));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let r = cv.run_round(&mut ds.clone(), None, &mut rng).unwrap();
        assert_eq!(r.ranked_features[0].index, 0);
        assert_eq!(r.correct, 8);

        let cv = CrossValidator::new(SplitSpec::with_fixed(4), EvalSpec::default())
            .with_weights(spec)
            .with_selector(Box::new(KeepNoise));
        let r = cv.run_round(&mut ds.clone(), None, &mut rng).unwrap();
        assert_eq!(r.ranked_features.len(), 1);
        assert_eq!(r.ranked_features[0].index, 1);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_run() {
        let ds = separated(6);
        let cv = CrossValidator::new(SplitSpec::with_ratio(0.5).unwrap(), EvalSpec::default());
        let a = cv.par_run(&ds, None, 4, 11).unwrap();
        let b = cv.par_run(&ds, None, 4, 11).unwrap();
        assert_eq!(a.len(), 4);
        let sources = |rs: &[SplitResult]| -> Vec<String> {
            rs.iter()
                .flat_map(|r| r.predictions.iter().map(|p| p.source.clone()))
                .collect()
        };
        assert_eq!(sources(&a), sources(&b));
    }

    /// 独立测试集: 训练集使用全部图像.
    #[test]
    fn test_external_test_set() {
        let ds = separated(5);
        let mut held_out = ds.empty_like();
        held_out
            .add_sample(Sample::new(vec![203.0, 0.0], Label::Discrete(2), "x.tif"))
            .unwrap();
        let cv = CrossValidator::new(SplitSpec::with_ratio(1.0).unwrap(), EvalSpec::default());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let r = cv.run_round(&mut ds.clone(), Some(&held_out), &mut rng).unwrap();
        assert_eq!(r.predictions.len(), 1);
        assert_eq!(r.predictions[0].predicted, 2);
        assert_eq!(r.confusion[[2, 2]], 1);
    }
}
