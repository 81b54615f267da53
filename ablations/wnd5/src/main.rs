//! 比较各分类方法在重复随机划分下的准确率与耗时.
//!
//! 训练集路径由 `$WND_DATASET` 指定 (默认 `$HOME/dataset/wnd/train.fit`),
//! 轮数由 `$WND_ROUNDS` 指定.

mod methods;
mod result;
mod runner;

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()
        .expect("Logger initialization error");

    runner::run().analyze();
}
