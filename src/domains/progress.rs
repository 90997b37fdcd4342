// 进度模拟器
//
// 初始化页面上展示的进度条，与任何真实任务无关
// 每次 tick 随机增加 [0, max_increment) 的进度，上限 100，达到上限后停止

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// 进度上限
pub const PROGRESS_MAX: f64 = 100.0;

/// 进度模拟器
#[derive(Debug)]
pub struct ProgressSimulator {
    value: f64,
    running: bool,
    tick_interval: Duration,
    max_increment: f64,
    rng: StdRng,
}

impl ProgressSimulator {
    /// 创建新的模拟器（使用系统熵初始化随机源）
    pub fn new(tick_interval: Duration, max_increment: f64) -> Self {
        Self::with_rng(tick_interval, max_increment, StdRng::from_entropy())
    }

    /// 使用指定随机源创建（测试时传入固定种子）
    pub fn with_rng(tick_interval: Duration, max_increment: f64, rng: StdRng) -> Self {
        let max_increment = if max_increment.is_finite() {
            max_increment.clamp(0.0, PROGRESS_MAX)
        } else {
            0.0
        };

        Self {
            value: 0.0,
            running: false,
            tick_interval,
            max_increment,
            rng,
        }
    }

    /// 从0开始运行
    pub fn start(&mut self) {
        self.value = 0.0;
        self.running = true;
    }

    /// 停止模拟，可重复调用
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// 进度清零
    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    /// 推进一次
    ///
    /// 未运行时返回 None；达到上限后自动停止，之后的 tick 不再产生更新
    pub fn tick(&mut self) -> Option<f64> {
        if !self.running {
            return None;
        }

        let delta = if self.max_increment > 0.0 {
            self.rng.gen_range(0.0..self.max_increment)
        } else {
            0.0
        };
        self.advance(delta)
    }

    fn advance(&mut self, delta: f64) -> Option<f64> {
        if !self.running {
            return None;
        }

        self.value = (self.value + delta.max(0.0)).min(PROGRESS_MAX);
        if self.value >= PROGRESS_MAX {
            self.running = false;
        }
        Some(self.value)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_complete(&self) -> bool {
        self.value >= PROGRESS_MAX
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded(seed: u64) -> ProgressSimulator {
        ProgressSimulator::with_rng(Duration::from_millis(300), 30.0, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_idle_simulator_does_not_tick() {
        let mut progress = seeded(1);
        assert_eq!(progress.tick(), None);
        assert_eq!(progress.value(), 0.0);
    }

    #[test]
    fn test_reaches_max_and_stops() {
        let mut progress = seeded(7);
        progress.start();

        let mut ticks = 0;
        while progress.tick().is_some() {
            ticks += 1;
            assert!(ticks < 10_000, "进度应该最终达到上限");
        }

        assert!(progress.is_complete());
        assert!(!progress.is_running());
        assert_eq!(progress.value(), PROGRESS_MAX);
        // 达到上限后不再更新
        assert_eq!(progress.tick(), None);
    }

    #[test]
    fn test_restart_begins_from_zero() {
        let mut progress = seeded(3);
        progress.start();
        progress.tick();
        progress.tick();
        progress.stop();
        // 停止可以重复调用
        progress.stop();
        assert_eq!(progress.tick(), None);

        progress.start();
        assert_eq!(progress.value(), 0.0);
        assert!(progress.is_running());
    }

    #[test]
    fn test_zero_increment_never_moves() {
        let mut progress =
            ProgressSimulator::with_rng(Duration::from_millis(300), 0.0, StdRng::seed_from_u64(0));
        progress.start();
        for _ in 0..10 {
            assert_eq!(progress.tick(), Some(0.0));
        }
    }

    proptest! {
        #[test]
        fn prop_progress_bounded_and_monotonic(
            seed in any::<u64>(),
            ticks in 0usize..64,
        ) {
            let mut progress = seeded(seed);
            progress.start();
            let mut previous = progress.value();

            for _ in 0..ticks {
                if let Some(value) = progress.tick() {
                    prop_assert!((0.0..=PROGRESS_MAX).contains(&value));
                    prop_assert!(value >= previous);
                    previous = value;
                }
            }
        }

        #[test]
        fn prop_arbitrary_deltas_stay_in_range(
            deltas in proptest::collection::vec(-50.0f64..200.0, 0..32),
        ) {
            let mut progress = seeded(0);
            progress.start();
            let mut previous = 0.0;

            for delta in deltas {
                if let Some(value) = progress.advance(delta) {
                    prop_assert!((0.0..=PROGRESS_MAX).contains(&value));
                    prop_assert!(value >= previous);
                    previous = value;
                }
            }
        }
    }
}
