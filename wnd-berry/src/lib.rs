#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 管理显微图像特征训练集, 并提供加权近邻 (WNN / WND-5) 分类、
//! 连续值插值以及交叉验证统计.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 特征提取算法本身不在本 crate 内. 本 crate 只定义提取器接口 ([`extract::FeatureExtractor`])
//!   与磁盘特征缓存, 由外部实现负责真正的图像计算.
//! 2. 所有数据集都在单个进程内独占使用, 没有共享内存并发. 多进程之间唯一的协作点是特征缓存目录.
//!
//! # 开发计划
//!
//! ### 训练集管理 ✅
//!
//! 类别表 (有序插入, 数值标签检测)、样本增删、未知类别标记、文本格式读写.
//!
//! 实现位于 `wnd-berry/src/dataset`.
//!
//! ### 特征归一化与随机划分 ✅
//!
//! 2.5% / 97.5% 分位数归一化到 `[0, 100]`; 按图像 (tile 组) 划分训练集/测试集,
//! 按固定训练数裁剪样本不足的类别.
//!
//! ### 特征权重 ✅
//!
//! Fisher 判别分数 (离散) 与 Pearson 相关 (连续), 特征组汇总, 按比例保留最强特征,
//! 外部 mRMR 选择器.
//!
//! 实现位于 `wnd-berry/src/weights`.
//!
//! ### 分类器 ✅
//!
//! 1. WNN: 加权最近邻, 排除自身匹配. ✅
//! 2. WND-5: 加权距离 -5 次幂核. ✅
//! 3. 连续值插值: 加权 N 近邻. ✅
//! 4. 逐特征排名投票 (实验性). ✅
//!
//! 实现位于 `wnd-berry/src/classify`.
//!
//! ### 图像级评估与交叉验证 ✅
//!
//! 多 tile 聚合, max-tile 模式, top-N 排名容忍, 混淆矩阵, 类相似度矩阵,
//! 图像相似度, Pearson 相关及其显著性, 多轮汇总与 `.npz` 导出.
//! 打开 `rayon` feature 后多轮划分可以并行执行.
//!
//! 实现位于 `wnd-berry/src/validate`.
//!
//! ### 特征缓存 ✅
//!
//! 多进程通过独占创建锁文件认领 tile; 未认领到的样本稍后补齐 (backfill).
//!
//! 实现位于 `wnd-berry/src/extract`.

pub mod consts;
pub mod error;

mod sample;

pub use sample::{Label, Sample, SampleId, TileId};

pub mod classify;
pub mod dataset;
pub mod extract;
pub mod validate;
pub mod weights;

pub mod prelude;

pub use dataset::Dataset;
pub use error::{DatasetError, DatasetResult};
