//! 对 `wnd-berry::Dataset` 读取的更一层封装. 提供更直接的数据集加载器.

use std::env;
use std::path::{Path, PathBuf};
use wnd_berry::{Dataset, DatasetResult};

/// 默认交叉验证轮数.
pub const DEFAULT_ROUNDS: usize = 20;

/// 获取训练集文件路径.
///
/// 1. 若环境变量 `$WND_DATASET` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/wnd/train.fit`.
///
/// # 注意
///
/// 环境变量未设置且无法确定用户主目录时 panic.
pub fn dataset_path_from_env_or_home() -> PathBuf {
    match env::var("WND_DATASET") {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => wnd_berry::dataset::home_dataset_dir_with(["wnd", "train.fit"])
            .expect("Cannot locate home directory"),
    }
}

/// 从 `$WND_ROUNDS` 读取交叉验证轮数. 未设置或无法解析时为 [`DEFAULT_ROUNDS`].
pub fn rounds_from_env() -> usize {
    env::var("WND_ROUNDS")
        .ok()
        .and_then(|r| r.trim().parse().ok())
        .filter(|&r| r > 0)
        .unwrap_or(DEFAULT_ROUNDS)
}

/// 读取训练集文件.
#[inline]
pub fn load_dataset<P: AsRef<Path>>(path: P) -> DatasetResult<Dataset> {
    Dataset::read_from(path)
}

/// 从 `$WND_DATASET` 或者 `$HOME/dataset/wnd/train.fit` 读取训练集.
#[inline]
pub fn dataset_from_env_or_home() -> DatasetResult<Dataset> {
    load_dataset(dataset_path_from_env_or_home())
}
