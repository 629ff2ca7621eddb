//! 进程级随机数生成器
//!
//! 整个生成流程共享一个可重播种的 ChaCha8 生成器，
//! 相同种子 + 相同调用顺序 → 完全相同的输出序列。
//! 生成流程是严格单线程的，线程局部存储即可满足需求。

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::cell::RefCell;

thread_local! {
    static GENERATOR: RefCell<ChaCha8Rng> = RefCell::new(ChaCha8Rng::seed_from_u64(0));
}

/// 重新播种。调用后序列从头开始。
pub fn reseed(seed: u64) {
    GENERATOR.with(|g| *g.borrow_mut() = ChaCha8Rng::seed_from_u64(seed));
}

/// [0, 1) 区间的均匀随机数
pub fn value() -> f64 {
    GENERATOR.with(|g| g.borrow_mut().gen::<f64>())
}

/// [min, max) 区间的均匀随机数
pub fn next_f64(min: f64, max: f64) -> f64 {
    if min >= max {
        return min;
    }
    min + value() * (max - min)
}

/// [min, max) 区间的均匀随机整数（上界不含）
pub fn next_int(min: i64, max: i64) -> i64 {
    if min >= max {
        return min;
    }
    GENERATOR.with(|g| g.borrow_mut().gen_range(min..max))
}

/// 从切片中等概率取一个元素
pub fn random_element<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    let idx = next_int(0, items.len() as i64) as usize;
    items.get(idx)
}
