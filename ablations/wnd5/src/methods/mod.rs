mod profile;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wnd_berry::prelude::*;

pub use profile::Profile;

/// 每类训练图像比例.
const TRAIN_RATIO: f64 = 0.75;

/// 用 `cv` 在 `dataset` 上执行 `rounds` 轮, 记录每轮准确率与耗时.
///
/// 各方法使用相同的种子, 因此看到的训练/测试划分完全相同.
fn profile_rounds(name: &str, cv: CrossValidator, dataset: &Dataset, rounds: usize) -> Profile {
    let mut profile = Profile::new();
    let mut rng = ChaCha8Rng::seed_from_u64(utils::SPLIT_SEED);
    for round in 0..rounds {
        let mut ds = dataset.clone();
        profile.round_start();
        match cv.run_round(&mut ds, None, &mut rng) {
            Ok(r) => {
                profile.round_elapsed();
                println!("{name}: round {round}, accuracy {:.4}", r.accuracy);
                profile.count_round(&r);
            }
            Err(e) => {
                log::warn!("{name}: round {round} failed: {e}");
                profile.count_failed();
            }
        }
    }
    profile.finish()
}

fn validator(eval: EvalSpec) -> CrossValidator {
    let split = SplitSpec::with_ratio(TRAIN_RATIO).expect("Invalid train ratio");
    CrossValidator::new(split, eval)
}

pub fn wnn(dataset: &Dataset, rounds: usize) -> Profile {
    let cv = validator(EvalSpec::with_method(Method::Wnn));
    profile_rounds("WNN", cv, dataset, rounds)
}

pub fn wnd5(dataset: &Dataset, rounds: usize) -> Profile {
    let cv = validator(EvalSpec::with_method(Method::Wnd5));
    profile_rounds("WND-5", cv, dataset, rounds)
}

pub fn wnd5_largest(dataset: &Dataset, rounds: usize) -> Profile {
    let mut eval = EvalSpec::with_method(Method::Wnd5);
    eval.kernel_pick = KernelPick::Largest;
    eval.max_tile = true;
    profile_rounds("WND-5 (largest)", validator(eval), dataset, rounds)
}

pub fn rank_vote(dataset: &Dataset, rounds: usize) -> Profile {
    let cv = validator(EvalSpec::with_method(Method::RankVote));
    profile_rounds("Rank vote", cv, dataset, rounds)
}
