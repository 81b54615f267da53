//! 样本: 一个 tile 的特征向量, 及其标签与来源.

use crate::consts::{CONTINUOUS_CLASS, UNKNOWN_CLASS};
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 进程内全局样本编号.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// 样本的稳定标识.
///
/// 编号在进程内唯一, 并在复制样本 (例如划分训练集/测试集) 时保持不变.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(u64);

impl SampleId {
    /// 分配一个新编号.
    #[inline]
    fn fresh() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// 保证此后分配的编号都大于 `self`. 加载快照后调用.
    #[inline]
    pub(crate) fn reserve_through(self) {
        NEXT_ID.fetch_max(self.0 + 1, Ordering::Relaxed);
    }

    /// 原始编号.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// 样本标签.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Label {
    /// 真值未知.
    Unknown,

    /// 离散类别, 索引从 1 开始.
    Discrete(usize),

    /// 连续值目标.
    Continuous(f64),
}

impl Label {
    /// 标签在类别表中对应的索引. 未知为 0, 连续值统一为 [`CONTINUOUS_CLASS`].
    #[inline]
    pub fn class_index(&self) -> usize {
        match *self {
            Label::Unknown => UNKNOWN_CLASS,
            Label::Discrete(c) => c,
            Label::Continuous(_) => CONTINUOUS_CLASS,
        }
    }

    /// 真值是否已知.
    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Label::Unknown)
    }

    /// 连续值目标. 离散标签返回 `None`.
    #[inline]
    pub fn target(&self) -> Option<f64> {
        match *self {
            Label::Continuous(v) => Some(v),
            _ => None,
        }
    }
}

/// tile 在原图中的位置: 旋转角度序号与网格坐标.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileId {
    /// 旋转序号.
    pub rotation: u16,
    /// 网格列.
    pub x: u16,
    /// 网格行.
    pub y: u16,
}

impl TileId {
    /// 初始化.
    #[inline]
    pub fn new(rotation: u16, x: u16, y: u16) -> Self {
        Self { rotation, x, y }
    }
}

/// 一个样本.
///
/// 样本的特征向量可以暂时为空 (见 [`crate::Dataset::add_pending`]), 此时它只记录来源,
/// 待特征缓存就绪后再补齐.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Sample {
    id: SampleId,
    features: Vec<f64>,
    label: Label,
    source: String,
    tile: TileId,
    interpolated: Option<f64>,
}

impl Sample {
    /// 初始化.
    pub fn new<S: Into<String>>(features: Vec<f64>, label: Label, source: S) -> Self {
        Self {
            id: SampleId::fresh(),
            features,
            label,
            source: source.into(),
            tile: TileId::default(),
            interpolated: None,
        }
    }

    /// 设置 tile 位置.
    #[inline]
    pub fn with_tile(mut self, tile: TileId) -> Self {
        self.tile = tile;
        self
    }

    /// 稳定标识.
    #[inline]
    pub fn id(&self) -> SampleId {
        self.id
    }

    /// 特征向量.
    #[inline]
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    /// 标签.
    #[inline]
    pub fn label(&self) -> Label {
        self.label
    }

    /// 来源图像路径.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// tile 位置.
    #[inline]
    pub fn tile(&self) -> TileId {
        self.tile
    }

    /// 最近一次评估得到的插值 (连续值或数值标签).
    #[inline]
    pub fn interpolated(&self) -> Option<f64> {
        self.interpolated
    }

    /// 特征是否尚未就绪.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.features.is_empty()
    }

    #[inline]
    pub(crate) fn features_mut(&mut self) -> &mut [f64] {
        &mut self.features
    }

    #[inline]
    pub(crate) fn set_features(&mut self, features: Vec<f64>) {
        self.features = features;
    }

    #[inline]
    pub(crate) fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    #[inline]
    pub(crate) fn set_interpolated(&mut self, value: f64) {
        self.interpolated = Some(value);
    }
}
