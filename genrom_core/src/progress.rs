use std::io::{self, Write};

/// Width budget for one console line; the bar and the partition diagram both
/// aim for it.
pub(crate) const LINE_SIZE: usize = 80;

const LABEL_WIDTH: usize = 16;
const BAR_WIDTH: usize = LINE_SIZE - 19;

/// A fixed-width progress bar on stderr.
///
/// Constructed per operation with an explicit `enabled` flag (there is no
/// global toggle), filled incrementally through [`Progress::update`], and
/// closed when dropped. Pure rendering; a disabled bar writes nothing.
#[derive(Debug)]
pub struct Progress {
    enabled: bool,
    total: usize,
    filled: usize,
}

impl Progress {
    pub fn new(enabled: bool, label: &str, total: usize) -> Self {
        if enabled {
            let pad = LABEL_WIDTH.saturating_sub(label.len() + 2);
            eprint!("{}..{}[", label, " ".repeat(pad));
            let _ = io::stderr().flush();
        }
        Progress {
            enabled,
            total: total.max(1),
            filled: 0,
        }
    }

    /// Advances the bar to reflect `current` out of `total` steps done.
    /// Values past `total` saturate.
    pub fn update(&mut self, current: usize) {
        if !self.enabled {
            return;
        }
        let target = (current.min(self.total) * BAR_WIDTH) / self.total;
        if target > self.filled {
            eprint!("{}", "=".repeat(target - self.filled));
            let _ = io::stderr().flush();
            self.filled = target;
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if self.enabled {
            eprintln!("{}]", "=".repeat(BAR_WIDTH.saturating_sub(self.filled)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_bar_tracks_nothing() {
        let mut bar = Progress::new(false, "Testing", 10);
        bar.update(5);
        bar.update(10);
        assert_eq!(bar.filled, 0);
    }

    #[test]
    fn updates_fill_monotonically_and_saturate() {
        let mut bar = Progress::new(true, "Testing", 4);
        bar.update(2);
        let halfway = bar.filled;
        assert!(halfway > 0 && halfway < BAR_WIDTH);
        bar.update(9);
        assert_eq!(bar.filled, BAR_WIDTH, "overshoot clamps to the bar width");
    }

    #[test]
    fn zero_total_is_treated_as_one() {
        let bar = Progress::new(false, "Testing", 0);
        assert_eq!(bar.total, 1);
    }
}
