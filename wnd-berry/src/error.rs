//! 运行时错误.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 数据集操作的运行时错误.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 数据集文件或权重文件格式错误.
    ///
    /// `line` 从 1 开始计数.
    #[error("{}:{line}: 格式错误: {reason}", .path.display())]
    Malformed {
        /// 出错文件.
        path: PathBuf,
        /// 出错行号.
        line: usize,
        /// 具体原因.
        reason: String,
    },

    /// 特征个数与数据集不一致.
    #[error("特征个数不符: 期望 {expected}, 实际 {found}")]
    FeatureCountMismatch {
        /// 数据集的特征个数.
        expected: usize,
        /// 实际给出的特征个数.
        found: usize,
    },

    /// 类别数超出容量.
    #[error("类别数超出上限 {0}")]
    TooManyClasses(usize),

    /// 新类别标签不大于最后一个类别标签 (按字节序).
    #[error("类别 `{label}` 必须排在最后一个类别 `{last}` 之后")]
    UnorderedClassInsertion {
        /// 新标签.
        label: String,
        /// 目前最后一个类别的标签.
        last: String,
    },

    /// 向连续值数据集添加离散类别.
    #[error("不能向连续值数据集添加离散类别 `{0}`")]
    AddingClassToContinuous(String),

    /// 样本的类别索引超出类别表.
    #[error("样本类别 {index} 未定义 (共 {class_count} 个类别)")]
    SampleClassUndefined {
        /// 样本声明的类别.
        index: usize,
        /// 数据集已有的类别数.
        class_count: usize,
    },

    /// 离散标签加入连续值数据集, 或者反之.
    #[error("样本标签类型与数据集不符")]
    LabelKindMismatch,

    /// 权重文件中的特征数与数据集不一致.
    #[error("权重文件 `{}` 含 {found} 个特征, 数据集为 {expected} 个", .path.display())]
    WeightCountMismatch {
        /// 权重文件.
        path: PathBuf,
        /// 文件中的权重个数.
        found: usize,
        /// 数据集的特征个数.
        expected: usize,
    },

    /// 底层 I/O 错误.
    #[error("无法访问 `{}`: {source}", .path.display())]
    Io {
        /// 访问的路径.
        path: PathBuf,
        /// 底层错误.
        source: io::Error,
    },

    /// 某类别的图像不足以同时满足训练数与测试数.
    #[error("类别 `{class}`: 训练图像 {train} + 测试图像 {test} 超过了总图像数 {available}")]
    SplitExceedsClass {
        /// 类别标签.
        class: String,
        /// 需要的训练图像数.
        train: usize,
        /// 需要的测试图像数.
        test: usize,
        /// 该类实际图像数.
        available: usize,
    },

    /// 比例参数超出允许范围.
    #[error("参数 `{name}` 的取值 {value} 超出范围 {range}")]
    ParameterOutOfRange {
        /// 参数名.
        name: &'static str,
        /// 给出的值.
        value: f64,
        /// 允许范围.
        range: &'static str,
    },

    /// 数据集中仍有尚未补齐特征的样本.
    #[error("数据集中仍有 {0} 个样本缺少特征")]
    PendingSamples(usize),

    /// 补齐特征后仍有样本不完整.
    #[error("{count} 个样本无法补齐特征, 首个为 `{first}`")]
    IncompleteSamples {
        /// 不完整样本个数.
        count: usize,
        /// 第一个不完整样本的来源.
        first: String,
    },

    /// 外部特征提取器失败.
    #[error("提取 `{source_path}` 的特征失败: {reason}")]
    Extraction {
        /// 图像来源.
        source_path: String,
        /// 提取器给出的原因.
        reason: String,
    },

    /// 特征缓存错误.
    #[error(transparent)]
    Cache(#[from] crate::extract::CacheError),

    /// 二进制快照编解码错误.
    #[cfg(feature = "serde")]
    #[error("快照编解码错误: {0}")]
    Snapshot(#[from] bincode::Error),
}

/// 数据集操作结果.
pub type DatasetResult<T> = Result<T, DatasetError>;

impl DatasetError {
    /// 生成一个把 `io::Error` 关联到 `path` 的闭包. 用于 `map_err`.
    #[inline]
    pub(crate) fn io_at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// 构造格式错误.
    #[inline]
    pub(crate) fn malformed<S: Into<String>>(path: &Path, line: usize, reason: S) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }
}
