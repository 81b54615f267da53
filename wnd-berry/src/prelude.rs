//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Dataset, DatasetError, DatasetResult};
pub use crate::{Label, Sample, SampleId, TileId};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{ClassTable, SplitSpec};

pub use crate::classify::{KernelPick, Method, Prediction};

pub use crate::weights::{FeatureSelector, MrmrSelector, WeightSpec};

pub use crate::extract::{FeatureExtractor, FeatureVector, SigCache};

pub use crate::validate::tree::{SimilarityFold, TreeRenderer};
pub use crate::validate::{CrossValidator, EvalSpec, SplitResult, Summary};
