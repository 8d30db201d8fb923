use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, checked once per solver iteration.
///
/// Clones share the same flag, so a front end can keep one handle and pass
/// another into a long-running call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token nobody holds a second handle to.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Wall-clock timer for `elapsed_secs` fields.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    start_ms: f64,
}

impl Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    // `Instant::now` panics on wasm32-unknown-unknown.
    #[cfg(target_arch = "wasm32")]
    pub fn start() -> Self {
        Self {
            start_ms: js_sys::Date::now(),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    #[cfg(target_arch = "wasm32")]
    pub fn elapsed_secs(&self) -> f64 {
        ((js_sys::Date::now() - self.start_ms) / 1000.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(!CancelToken::never().is_cancelled());
    }

    #[test]
    fn stopwatch_is_monotonic() {
        let watch = Stopwatch::start();
        let first = watch.elapsed_secs();
        let second = watch.elapsed_secs();
        assert!(first >= 0.0);
        assert!(second >= first);
    }
}
