//! 类别表.

use crate::error::{DatasetError, DatasetResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 标签的数值性.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Numeric {
    /// 不以数字开头.
    No,
    /// 以数字开头, 但后面还有其它字符.
    Prefix(f64),
    /// 整个标签就是一个数.
    Pure(f64),
}

impl Numeric {
    #[inline]
    fn value(self) -> Option<f64> {
        match self {
            Numeric::No => None,
            Numeric::Prefix(v) | Numeric::Pure(v) => Some(v),
        }
    }
}

/// 判断 `s` 能否被解读为数. 允许前导空白与十六进制整数 (`0x1F`).
pub(crate) fn check_numeric(s: &str) -> Numeric {
    let t = s.trim_start();
    if let Some(v) = parse_hex(t) {
        return Numeric::Pure(v);
    }

    // 最长可解析前缀
    let best = t
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .filter_map(|end| t[..end].parse::<f64>().ok().map(|v| (end, v)))
        .last();
    match best {
        Some((end, v)) if v.is_finite() => {
            if end == t.len() {
                Numeric::Pure(v)
            } else {
                Numeric::Prefix(v)
            }
        }
        _ => Numeric::No,
    }
}

fn parse_hex(t: &str) -> Option<f64> {
    let (neg, rest) = match t.as_bytes().first()? {
        b'-' => (true, &t[1..]),
        b'+' => (false, &t[1..]),
        _ => (false, t),
    };
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))?;
    let v = i64::from_str_radix(digits, 16).ok()? as f64;
    Some(if neg { -v } else { v })
}

/// 有序类别表.
///
/// 索引 0 永远是 "未知" 槽位 (标签为空串), 真实类别从 1 开始.
/// 离散类别必须按字节序递增插入.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct ClassTable {
    labels: Vec<String>,
    counts: Vec<usize>,
    numeric: bool,
    pure_numeric: bool,
    capacity: usize,
}

impl ClassTable {
    /// 初始化. `capacity` 为离散类别数上限.
    pub fn new(capacity: usize) -> Self {
        Self {
            labels: vec![String::new()],
            counts: vec![0],
            numeric: false,
            pure_numeric: false,
            capacity,
        }
    }

    /// 真实类别个数 (不含未知槽位).
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len() - 1
    }

    /// 是否还没有任何真实类别.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 类别容量.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 第 `index` 个类别的标签. 越界时 panic.
    #[inline]
    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }

    /// 全部标签, 下标 0 为未知槽位.
    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// 第 `index` 个类别的样本数.
    #[inline]
    pub fn count(&self, index: usize) -> usize {
        self.counts[index]
    }

    /// 所有真实类别的标签是否都以数字开头.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    /// 所有真实类别的标签是否都恰好是一个数.
    #[inline]
    pub fn is_pure_numeric(&self) -> bool {
        self.pure_numeric
    }

    /// 第 `index` 个类别标签的数值 (取数字前缀).
    #[inline]
    pub fn value(&self, index: usize) -> Option<f64> {
        self.labels.get(index).and_then(|l| check_numeric(l).value())
    }

    /// 按标签查找类别.
    pub fn find(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .skip(1)
            .position(|l| l == label)
            .map(|i| i + 1)
    }

    /// 追加离散类别, 返回新索引.
    ///
    /// 空标签返回 0 且不做改动; 与最后一个类别相同的标签返回其索引.
    pub(crate) fn push(&mut self, label: &str) -> DatasetResult<usize> {
        if label.is_empty() {
            return Ok(0);
        }
        if !self.is_empty() && self.label(self.len()) == label {
            return Ok(self.len());
        }
        if self.len() >= self.capacity {
            return Err(DatasetError::TooManyClasses(self.capacity));
        }
        if let Some(last) = self.labels.last().filter(|_| !self.is_empty()) {
            if label.as_bytes() < last.as_bytes() {
                return Err(DatasetError::UnorderedClassInsertion {
                    label: label.to_string(),
                    last: last.clone(),
                });
            }
        }
        self.labels.push(label.to_string());
        self.counts.push(0);
        self.refresh_numeric();
        Ok(self.len())
    }

    /// 把类别表设为单一连续值伪类别.
    pub(crate) fn set_continuous(&mut self, label: &str) {
        self.labels.truncate(1);
        self.counts.truncate(1);
        self.labels.push(label.to_string());
        self.counts.push(0);
        self.numeric = true;
        self.pure_numeric = true;
    }

    /// 删除第 `index` 个类别, 后续类别下标前移.
    pub(crate) fn remove(&mut self, index: usize) {
        self.labels.remove(index);
        self.counts.remove(index);
        self.refresh_numeric();
    }

    #[inline]
    pub(crate) fn increment(&mut self, index: usize) {
        self.counts[index] += 1;
    }

    #[inline]
    pub(crate) fn reset_count(&mut self, index: usize) {
        self.counts[index] = 0;
    }

    #[inline]
    pub(crate) fn add_count(&mut self, index: usize, n: usize) {
        self.counts[index] += n;
    }

    /// 相同标签与容量, 计数清零.
    pub(crate) fn cleared(&self) -> Self {
        Self {
            counts: vec![0; self.counts.len()],
            ..self.clone()
        }
    }

    fn refresh_numeric(&mut self) {
        let kinds: Vec<Numeric> = self.labels[1..].iter().map(|l| check_numeric(l)).collect();
        self.numeric = !kinds.is_empty() && kinds.iter().all(|k| *k != Numeric::No);
        self.pure_numeric = !kinds.is_empty() && kinds.iter().all(|k| matches!(k, Numeric::Pure(_)));
    }
}
