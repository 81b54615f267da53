//! 程序运行函数.

use crate::result::AblationResult;
use std::thread;
use utils::loader;

/// 实际运行.
pub fn run() -> AblationResult {
    let path = loader::dataset_path_from_env_or_home();
    assert!(path.is_file(), "Dataset `{}` not found", path.display());
    let dataset = loader::load_dataset(&path).expect("Loading dataset error");
    let rounds = loader::rounds_from_env();

    // 短路判断
    assert!(!dataset.is_empty(), "Empty dataset");
    log::info!(
        "Loaded {} samples in {} classes with {} features",
        dataset.len(),
        dataset.class_count(),
        dataset.feature_count()
    );

    println!(
        "Running ablation studies ({rounds} rounds, {} cores)...",
        utils::cpus()
    );
    let ds = &dataset;
    thread::scope(|s| {
        use super::methods::*;

        let handles = [wnn, wnd5, wnd5_largest, rank_vote].map(|t| s.spawn(move || t(ds, rounds)));

        AblationResult::from_iter(
            ["wnn", "wnd5", "wnd5-largest", "rank-vote"].into_iter().zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    })
}
