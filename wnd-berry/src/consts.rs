//! 通用常量.

/// 未知类别 (或未标注样本) 的类别索引.
pub const UNKNOWN_CLASS: usize = 0;

/// 连续值数据集中, 全部已知样本共享的伪类别索引.
pub const CONTINUOUS_CLASS: usize = 1;

/// 默认类别容量.
pub const DEFAULT_CLASS_CAPACITY: usize = 1024;

/// 低于该值的距离视为 "完全重合".
pub const ZERO_DISTANCE: f64 = 1e-30;

/// Fisher 分数为 0 时补上的微小正数, 避免后续除零.
pub const FISHER_EPSILON: f64 = 1e-6;

/// WNN 使用的距离幂次.
pub const WNN_POWER: f64 = 2.0;

/// WND 核的幂次 (作用于加权平方距离).
pub const WND_KERNEL_POWER: i32 = -5;

/// 特征归一化.
pub mod normalize {
    /// 取作下界的分位数.
    pub const LOWER_QUANTILE: f64 = 0.025;

    /// 取作上界的分位数.
    pub const UPPER_QUANTILE: f64 = 0.975;

    /// 归一化后的最大值. 最小值固定为 0.
    pub const SCALE: f64 = 100.0;
}

/// 特征权重.
pub mod weights {
    /// 默认保留的最强特征比例.
    pub const DEFAULT_USED_FRACTION: f64 = 0.15;

    /// 报告中列出的最强特征个数.
    pub const REPORTED_FEATURES: usize = 50;
}
