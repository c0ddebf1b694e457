//! Best-effort 执行 - 捕获错误和 panic，只记录日志，不向上传播

use anyhow::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// 在独立的失败边界中执行 `f`
///
/// 返回 `Err(描述)` 表示失败（错误或 panic），并已记录 warn 日志。
pub fn guard<T>(label: &str, f: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(operation = label, error = %e, "Best-effort operation failed");
            Err(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(operation = label, panic = %message, "Best-effort operation panicked");
            Err(format!("panicked: {}", message))
        }
    }
}

/// 执行 `f`，失败时返回 `None`
pub fn best_effort<T>(label: &str, f: impl FnOnce() -> Result<T>) -> Option<T> {
    guard(label, f).ok()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_passes_value_through() {
        assert_eq!(guard("ok", || Ok(7)), Ok(7));
    }

    #[test]
    fn test_guard_captures_error() {
        let result: std::result::Result<(), String> = guard("err", || anyhow::bail!("boom"));
        assert_eq!(result, Err("boom".to_string()));
    }

    #[test]
    fn test_guard_captures_panic() {
        let result: std::result::Result<(), String> = guard("panic", || panic!("kaboom"));
        assert_eq!(result, Err("panicked: kaboom".to_string()));
    }

    #[test]
    fn test_best_effort() {
        assert_eq!(best_effort("ok", || Ok("x")), Some("x"));
        assert_eq!(best_effort::<()>("err", || anyhow::bail!("nope")), None);
    }
}
