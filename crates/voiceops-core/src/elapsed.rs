use std::time::Instant;

/// Wall-clock elapsed time since a fixed starting point, in milliseconds.
///
/// Started once at pipeline entry and once at execution start; every
/// duration the service reports is read from one of these.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let sw = Stopwatch::start();
        let a = sw.elapsed_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = sw.elapsed_ms();
        assert!(b >= a + 5, "a={a} b={b}");
    }
}
