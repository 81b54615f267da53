//! 基于训练集的分类与插值.
//!
//! 所有方法都把查询样本先用训练集的归一化边界处理, 再与训练样本比较.
//! 概率向量长度为 `类别数 + 1`, 下标 0 (未知) 恒为 0.

use crate::{Dataset, Sample, SampleId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod distance;
mod interpolate;
mod kernel;
mod nearest;
mod vote;

pub use distance::weighted_distance;

/// 分类方法.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// 加权最近邻.
    Wnn,

    /// 加权距离 -5 次幂核.
    #[default]
    Wnd5,

    /// 逐特征排名投票 (实验性).
    RankVote,
}

impl Method {
    /// 简短名称.
    pub fn name(&self) -> &'static str {
        match self {
            Method::Wnn => "wnn",
            Method::Wnd5 => "wnd5",
            Method::RankVote => "rank-vote",
        }
    }
}

/// WND-5 从类别分数中挑选预测类别的方式.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum KernelPick {
    /// 取分数最小的类别.
    #[default]
    Smallest,

    /// 取分数最大的类别, 即核相似度最高者.
    Largest,
}

/// 单个样本的分类结果.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// 预测类别. 无法判断时为 0.
    pub class: usize,

    /// 各类别的 (归一化) 概率, 下标 0 恒为 0.
    pub probabilities: Vec<f64>,

    /// 归一化前的概率总和.
    pub normalization: f64,

    /// 最近的训练样本 (仅 WNN 给出).
    pub closest: Option<SampleId>,

    /// 与最近训练样本的距离 (仅 WNN 给出).
    pub closest_distance: Option<f64>,
}

impl Prediction {
    /// 没有任何信息的结果.
    pub(crate) fn empty(class_count: usize) -> Self {
        Self {
            class: 0,
            probabilities: vec![0.0; class_count + 1],
            normalization: 0.0,
            closest: None,
            closest_distance: None,
        }
    }
}

/// 连续值插值结果.
#[derive(Clone, Debug, PartialEq)]
pub struct Interpolation {
    /// 插值.
    pub value: f64,

    /// 最近的训练样本.
    pub closest: Option<SampleId>,

    /// 与最近训练样本的距离.
    pub closest_distance: f64,
}

impl Dataset {
    /// 用 `method` 对 `query` 分类. `pick` 只对 WND-5 有效.
    pub fn classify(&self, query: &Sample, method: Method, pick: KernelPick) -> Prediction {
        match method {
            Method::Wnn => self.nearest_neighbor(query),
            Method::Wnd5 => self.kernel_weighted(query, pick),
            Method::RankVote => self.rank_vote(query),
        }
    }
}
