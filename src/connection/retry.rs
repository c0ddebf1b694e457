//! 连接重试策略
//!
//! 默认：5 秒起步的指数退避，上限 60 秒，±20% 抖动，不限次数。
//! `RetryPolicy::fixed` 给出固定间隔；`max_attempts` 用作熔断。

use anyhow::{bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单次等待的绝对上限（一天），与配置无关
pub const MAX_RETRY_DELAY_MS: u64 = 86_400_000;

/// 首次连接的重试策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// 第一次失败后的等待
    pub initial_delay_ms: u64,
    /// 单次等待上限
    pub max_delay_ms: u64,
    /// 每次失败后的增长倍数
    pub multiplier: f64,
    /// 抖动比例，0.2 即 ±20%
    pub jitter: f64,
    /// 失败这么多次后放弃；`None` 表示一直重试
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// 固定间隔，不限次数
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis().min(MAX_RETRY_DELAY_MS as u128) as u64;
        Self {
            initial_delay_ms: ms,
            max_delay_ms: ms,
            multiplier: 1.0,
            jitter: 0.0,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// 检查配置文件给出的值
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("initial_delay_ms", self.initial_delay_ms),
            ("max_delay_ms", self.max_delay_ms),
        ] {
            if value > MAX_RETRY_DELAY_MS {
                bail!("retry.{} must be at most {}, got {}", name, MAX_RETRY_DELAY_MS, value);
            }
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            bail!("retry.multiplier must be a finite number >= 1.0, got {}", self.multiplier);
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            bail!("retry.jitter must be within 0.0..=1.0, got {}", self.jitter);
        }
        Ok(())
    }

    /// 下一次尝试前的等待（不含抖动）
    ///
    /// `failed_attempts` 为已失败次数（第一次失败后为 1）。次数用尽时返回 `None`。
    /// 结果不会超过 [`MAX_RETRY_DELAY_MS`]。
    pub fn base_delay(&self, failed_attempts: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if failed_attempts >= max {
                return None;
            }
        }
        let exponent = failed_attempts.saturating_sub(1).min(63) as i32;
        let grown = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let ceiling = self
            .max_delay_ms
            .max(self.initial_delay_ms)
            .min(MAX_RETRY_DELAY_MS);
        let capped = grown.min(ceiling as f64);
        Some(Duration::from_millis(capped as u64))
    }

    /// 下一次尝试前的等待（含抖动）
    pub fn next_delay(&self, failed_attempts: u32) -> Option<Duration> {
        let base = self.base_delay(failed_attempts)?;
        let jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if jitter == 0.0 || base.is_zero() {
            return Some(base);
        }
        let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
        Some(base.mul_f64(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_capped_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.base_delay(2), Some(Duration::from_secs(10)));
        assert_eq!(policy.base_delay(3), Some(Duration::from_secs(20)));
        assert_eq!(policy.base_delay(4), Some(Duration::from_secs(40)));
        assert_eq!(policy.base_delay(5), Some(Duration::from_secs(60)));
        assert_eq!(policy.base_delay(500), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_fixed_never_grows() {
        let policy = RetryPolicy::fixed(Duration::from_millis(5000));
        for attempt in 1..20 {
            assert_eq!(policy.next_delay(attempt), Some(Duration::from_millis(5000)));
        }
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..200 {
            let delay = policy.next_delay(1).unwrap();
            assert!(delay >= Duration::from_millis(4000), "{:?}", delay);
            assert!(delay <= Duration::from_millis(6000), "{:?}", delay);
        }
    }

    #[test]
    fn test_max_attempts_gives_up() {
        let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(3);
        assert!(policy.next_delay(1).is_some());
        assert!(policy.next_delay(2).is_some());
        assert_eq!(policy.next_delay(3), None);
    }

    #[test]
    fn test_huge_delays_are_capped() {
        let policy = RetryPolicy {
            initial_delay_ms: u64::MAX,
            max_delay_ms: u64::MAX,
            multiplier: f64::INFINITY,
            jitter: f64::NAN,
            max_attempts: None,
        };
        for attempt in [1, 2, 64, u32::MAX] {
            assert_eq!(
                policy.next_delay(attempt),
                Some(Duration::from_millis(MAX_RETRY_DELAY_MS))
            );
        }

        let jittered = RetryPolicy {
            initial_delay_ms: u64::MAX,
            ..Default::default()
        };
        let delay = jittered.next_delay(1).unwrap();
        assert!(delay <= Duration::from_millis(MAX_RETRY_DELAY_MS).mul_f64(1.2));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::fixed(Duration::from_secs(5)).validate().is_ok());

        let too_long = RetryPolicy {
            initial_delay_ms: u64::MAX,
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let shrinking = RetryPolicy {
            multiplier: 0.5,
            ..Default::default()
        };
        assert!(shrinking.validate().is_err());

        let nan_jitter = RetryPolicy {
            jitter: f64::NAN,
            ..Default::default()
        };
        assert!(nan_jitter.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 10}"#).unwrap();
        assert_eq!(policy.max_attempts, Some(10));
        assert_eq!(policy.initial_delay_ms, 5000);
    }
}
