use std::time::{Duration, Instant};

/// Scoped wall-clock timer. Logs `"<message>:  <secs> sec"` when dropped.
#[derive(Debug)]
pub struct Timer {
    message: String,
    start: Instant,
}

impl Timer {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!("{}:  {:.6} sec", self.message, self.start.elapsed().as_secs_f64());
    }
}

/// Runs `f` under a [`Timer`] and returns its result with the elapsed time.
pub fn timed<T>(message: &str, f: impl FnOnce() -> T) -> (T, Duration) {
    let timer = Timer::new(message);
    let out = f();
    let elapsed = timer.elapsed();
    (out, elapsed)
}
