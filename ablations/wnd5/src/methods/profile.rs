//! 分类方法运行统计.

use std::time::{Duration, Instant};
use wnd_berry::validate::SplitResult;

/// 累计计时器, 用于统计多轮划分与评估的耗时.
///
/// 每一轮用 `start()` 与 `elapsed()` 括起来, 两次调用之间的时间被累加到总量里;
/// 两轮之间做的事情 (克隆数据集, 打印结果) 不计入. 因此可以随时 "暂停",
/// 之后再调用 `start()` 接着累计.
///
/// 计时用的是 [`Instant`], 即单调时钟, 结果包含调度与 I/O 等待.
#[derive(Clone, Debug)]
struct AccTimer {
    /// 已经累计的时间.
    consumed: Duration,

    /// 当前区间的开始时刻.
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器, 累计值为 0.
    ///
    /// 初始化时视为已经调用过一次 `self.start()`: 只需要一个 "从构造到结束"
    /// 的总时长时 (比如 [`Profile`] 的自然时间), 直接调用 `self.elapsed()` 即可.
    /// 不需要这段时间时, 在真正开始前再调用 `self.start()` 覆盖掉.
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::from_secs(0),
            since: Instant::now(),
        }
    }

    /// 开始一个新的计时区间.
    ///
    /// 反复调用只保留最后一次的时刻, 之前未结束的区间直接作废, 不计入总量.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束当前区间, 把它累加到总量里, 并返回该区间的长度.
    ///
    /// # 注意
    ///
    /// 调用前应该先调用 `self.start()` (或刚刚构造). 连续两次调用 `elapsed()`
    /// 会把同一段时间重复累加.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 总共累计的时间, 以微秒为单位. 超出 `u64` 的部分被截断, 实际运行中不会出现.
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 一种分类方法在多轮划分上的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 成功完成的轮数.
    rounds: u64,

    /// 因划分或评估错误而失败的轮数.
    failed: u64,

    /// 真值已知的测试图像总数.
    known: u64,

    /// 预测正确的图像总数.
    correct: u64,

    /// 每轮准确率之和与平方和.
    accuracy_sum: f64,
    accuracy_sq_sum: f64,

    /// 单轮最高/最低准确率.
    best: Option<f64>,
    worst: Option<f64>,

    /// 划分与评估花费的总时间.
    eval_time: AccTimer,

    /// 整个任务花费的总时间 (包括克隆数据集与打印).
    real_time: AccTimer,

    /// 最耗时的一轮.
    slowest: Option<Duration>,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            rounds: 0,
            failed: 0,
            known: 0,
            correct: 0,
            accuracy_sum: 0.0,
            accuracy_sq_sum: 0.0,
            best: None,
            worst: None,
            eval_time: AccTimer::default(),
            real_time: AccTimer::default(),
            slowest: None,
        }
    }

    /// 开始一轮计时.
    #[inline]
    pub fn round_start(&mut self) {
        self.eval_time.start();
    }

    /// 结束一轮计时.
    #[inline]
    pub fn round_elapsed(&mut self) {
        let d = self.eval_time.elapsed();
        self.slowest = Some(self.slowest.map_or(d, |s| s.max(d)));
    }

    /// 记录一轮结果.
    pub fn count_round(&mut self, r: &SplitResult) {
        self.rounds += 1;
        self.known += r.known_images as u64;
        self.correct += r.correct as u64;
        self.accuracy_sum += r.accuracy;
        self.accuracy_sq_sum += r.accuracy * r.accuracy;
        self.best = Some(self.best.map_or(r.accuracy, |b| b.max(r.accuracy)));
        self.worst = Some(self.worst.map_or(r.accuracy, |w| w.min(r.accuracy)));
    }

    /// 记录一轮失败.
    #[inline]
    pub fn count_failed(&mut self) {
        self.failed += 1;
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    #[inline]
    pub fn get_rounds(&self) -> u64 {
        self.rounds
    }

    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    #[inline]
    pub fn get_known(&self) -> u64 {
        self.known
    }

    #[inline]
    pub fn get_correct(&self) -> u64 {
        self.correct
    }

    /// 平均准确率. 没有成功的轮次时为 `None`.
    pub fn get_mean_accuracy(&self) -> Option<f64> {
        match self.rounds {
            0 => None,
            n => Some(self.accuracy_sum / n as f64),
        }
    }

    /// 准确率的总体标准差.
    pub fn get_std_accuracy(&self) -> Option<f64> {
        let mean = self.get_mean_accuracy()?;
        let var = self.accuracy_sq_sum / self.rounds as f64 - mean * mean;
        Some(var.max(0.0).sqrt())
    }

    #[inline]
    pub fn get_best(&self) -> Option<f64> {
        self.best
    }

    #[inline]
    pub fn get_worst(&self) -> Option<f64> {
        self.worst
    }

    /// 以微秒为单位获得划分与评估的总时间.
    #[inline]
    pub fn get_eval_time_us(&self) -> u64 {
        self.eval_time.get_total_us()
    }

    /// 以微秒为单位获得每轮平均时间.
    pub fn get_avg_eval_time_us(&self) -> Option<f64> {
        match self.rounds {
            0 => None,
            n => Some(self.get_eval_time_us() as f64 / n as f64),
        }
    }

    /// 以微秒为单位获得运行到目前的总自然时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 最耗时的一轮. 没有成功的轮次时为 `None`.
    #[inline]
    pub fn get_slowest_round(&self) -> Option<Duration> {
        self.slowest
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
