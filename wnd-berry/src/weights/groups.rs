//! 特征组.
//!
//! 名称以大写字母开头的连续特征, 若首个单词相同, 则属于同一组
//! (例如 `Haralick Textures [3]` 与 `Haralick Textures (Fourier ()) [7]`).

use crate::Dataset;
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一个特征组的汇总.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureGroup {
    /// 展示名称.
    pub name: String,
    /// 组内权重之和.
    pub weight: f64,
    /// 组内特征个数.
    pub count: usize,
}

/// 按首单词分组的连续特征下标. 名称不以大写字母开头的特征不属于任何组.
pub(crate) fn group_runs(names: &[String]) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = vec![];
    let mut last: Option<&str> = None;
    for (i, name) in names.iter().enumerate() {
        if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
            continue;
        }
        let head = name.split(' ').next().unwrap_or(name);
        match (last, runs.last_mut()) {
            (Some(prev), Some(run)) if prev == head => run.push(i),
            _ => runs.push(vec![i]),
        }
        last = Some(head);
    }
    runs
}

/// 组的展示名称: 数字替换为空格, `bin ` 去掉, 统计类特征合并命名.
pub(crate) fn display_name(full: &str) -> String {
    if full.starts_with("Feature") {
        return "Feature Statistics".to_string();
    }
    if full.starts_with("Edge") {
        return "Edge Statistics".to_string();
    }
    let s: String = full
        .chars()
        .map(|c| if c.is_ascii_digit() { ' ' } else { c })
        .collect();
    s.replacen("bin ", "    ", 1)
}

impl Dataset {
    /// 按当前权重汇总特征组, 按组权重降序排列, 只保留正权重的组.
    pub fn feature_groups(&self) -> Vec<FeatureGroup> {
        let mut groups: Vec<FeatureGroup> = group_runs(self.feature_names())
            .into_iter()
            .map(|run| {
                let last = run[run.len() - 1];
                FeatureGroup {
                    name: display_name(&self.feature_names()[last]),
                    weight: run.iter().map(|&i| self.weights()[i]).sum(),
                    count: run.len(),
                }
            })
            .filter(|g| g.weight > 0.0)
            .collect();
        groups.sort_by_key(|g| std::cmp::Reverse(OrderedFloat(g.weight)));
        groups
    }

    /// 把第 `index` 个特征组 (从 0 开始, 按特征顺序) 的权重全部置 0, 返回该组展示名称.
    ///
    /// 组不存在时返回 `None`, 权重不变.
    pub fn ignore_feature_group(&mut self, index: usize) -> Option<String> {
        let run = group_runs(self.feature_names()).into_iter().nth(index)?;
        let name = display_name(&self.feature_names()[run[0]]);
        for i in run {
            self.weights_mut()[i] = 0.0;
        }
        log::info!("Ignoring feature group `{}`", name.trim());
        Some(name)
    }
}
