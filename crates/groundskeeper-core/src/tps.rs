//! Self-measured tick-rate estimation.
//!
//! The estimator is fed one sample per second (every 20 ticks) and
//! keeps three fixed circular histories sharing a single write cursor:
//! 60 samples for the 1-minute average, 300 for 5 minutes, 900 for
//! 15 minutes. Averages only cover slots written so far, so a cold
//! estimator reports a healthy 20.0 instead of an alarming zero.
//!
//! Hosts that publish their own tick averages bypass the histories
//! entirely; [`TpsEstimator::current_tps`] prefers a native reading
//! when one is handed in.

/// Averaging window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpsWindow {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
}

impl TpsWindow {
    /// Parse a config window name. Unrecognized names fall back to the
    /// 1-minute window.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "5m" => Self::FiveMinutes,
            "15m" => Self::FifteenMinutes,
            _ => Self::OneMinute,
        }
    }

    /// Index into a native (1m, 5m, 15m) average triple.
    fn slot(self) -> usize {
        match self {
            Self::OneMinute => 0,
            Self::FiveMinutes => 1,
            Self::FifteenMinutes => 2,
        }
    }
}

const HISTORY_1M: usize = 60;
const HISTORY_5M: usize = 300;
const HISTORY_15M: usize = 900;

/// Expected gap between samples at a perfect 20 TPS, in milliseconds
/// per tick after dividing the one-second sample gap by 20.
const IDEAL_MS_PER_TICK: f64 = 50.0;

/// Fixed-size TPS histories with a shared cursor.
#[derive(Debug)]
pub struct TpsEstimator {
    history_1m: [f64; HISTORY_1M],
    history_5m: [f64; HISTORY_5M],
    history_15m: [f64; HISTORY_15M],
    /// Total samples written; each history indexes this modulo its length.
    cursor: u64,
    last_sample_ms: Option<u64>,
}

impl Default for TpsEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TpsEstimator {
    pub fn new() -> Self {
        Self {
            history_1m: [0.0; HISTORY_1M],
            history_5m: [0.0; HISTORY_5M],
            history_15m: [0.0; HISTORY_15M],
            cursor: 0,
            last_sample_ms: None,
        }
    }

    /// Record one sample. Call once per second of game time; the first
    /// call only anchors the clock and writes nothing.
    pub fn sample(&mut self, now_ms: u64) {
        let Some(last) = self.last_sample_ms.replace(now_ms) else {
            return;
        };
        let elapsed_ms = now_ms.saturating_sub(last);
        // A one-second gap spread over 20 ticks. Floor at the ideal per-tick
        // cost so an early or duplicate sample cannot report above 20.
        let per_tick = (elapsed_ms as f64 / 20.0).max(IDEAL_MS_PER_TICK);
        let tps = (1000.0 / per_tick).min(20.0);

        let idx = self.cursor;
        self.history_1m[(idx % HISTORY_1M as u64) as usize] = tps;
        self.history_5m[(idx % HISTORY_5M as u64) as usize] = tps;
        self.history_15m[(idx % HISTORY_15M as u64) as usize] = tps;
        self.cursor += 1;
    }

    /// Average over the selected window, preferring a native reading
    /// when the host supplies one. A native vector with fewer than
    /// three slots falls back to its first entry.
    pub fn current_tps(&self, window: TpsWindow, native: Option<&[f64]>) -> f64 {
        if let Some(values) = native {
            if let Some(&tps) = values.get(window.slot()).or_else(|| values.first()) {
                return tps.min(20.0);
            }
        }
        self.window_average(window)
    }

    /// Average of the self-measured history for one window. Empty
    /// history reports a healthy 20.0.
    pub fn window_average(&self, window: TpsWindow) -> f64 {
        match window {
            TpsWindow::OneMinute => average(&self.history_1m, self.cursor),
            TpsWindow::FiveMinutes => average(&self.history_5m, self.cursor),
            TpsWindow::FifteenMinutes => average(&self.history_15m, self.cursor),
        }
    }

    /// Samples recorded so far (not capped at history length).
    pub fn samples(&self) -> u64 {
        self.cursor
    }
}

fn average(history: &[f64], written: u64) -> f64 {
    let count = (written.min(history.len() as u64)) as usize;
    if count == 0 {
        return 20.0;
    }
    // Valid slots are the first `count` positions: the cursor fills the
    // array front-to-back before it ever wraps.
    let sum: f64 = history[..count].iter().sum();
    sum / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(estimator: &mut TpsEstimator, gap_ms: u64, samples: usize) {
        let mut now = 1_000_000;
        estimator.sample(now);
        for _ in 0..samples {
            now += gap_ms;
            estimator.sample(now);
        }
    }

    #[test]
    fn empty_history_reports_full_speed() {
        let estimator = TpsEstimator::new();
        assert_eq!(estimator.window_average(TpsWindow::OneMinute), 20.0);
        assert_eq!(estimator.window_average(TpsWindow::FifteenMinutes), 20.0);
    }

    #[test]
    fn on_time_samples_average_to_twenty() {
        let mut estimator = TpsEstimator::new();
        feed(&mut estimator, 1000, 30);
        let avg = estimator.window_average(TpsWindow::OneMinute);
        assert!((avg - 20.0).abs() < 1e-9);
    }

    #[test]
    fn slow_samples_lower_the_average() {
        let mut estimator = TpsEstimator::new();
        // 2s between one-second samples: ticks ran at half speed.
        feed(&mut estimator, 2000, 10);
        let avg = estimator.window_average(TpsWindow::OneMinute);
        assert!((avg - 10.0).abs() < 1e-9);
    }

    #[test]
    fn early_samples_cannot_exceed_twenty() {
        let mut estimator = TpsEstimator::new();
        feed(&mut estimator, 200, 5);
        assert!(estimator.window_average(TpsWindow::OneMinute) <= 20.0);
    }

    #[test]
    fn first_sample_only_anchors_the_clock() {
        let mut estimator = TpsEstimator::new();
        estimator.sample(5_000);
        assert_eq!(estimator.samples(), 0);
        estimator.sample(6_000);
        assert_eq!(estimator.samples(), 1);
    }

    #[test]
    fn windows_share_one_cursor() {
        let mut estimator = TpsEstimator::new();
        feed(&mut estimator, 2000, 70);
        // 1m history has wrapped (70 > 60) and holds only slow samples;
        // the 5m history still remembers all 70.
        assert!((estimator.window_average(TpsWindow::OneMinute) - 10.0).abs() < 1e-9);
        assert!((estimator.window_average(TpsWindow::FiveMinutes) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn native_reading_takes_precedence() {
        let mut estimator = TpsEstimator::new();
        feed(&mut estimator, 2000, 10);
        let native = vec![19.5, 18.2, 17.1];
        assert!(
            (estimator.current_tps(TpsWindow::FiveMinutes, Some(&native)) - 18.2).abs() < 1e-9
        );
    }

    #[test]
    fn short_native_vector_falls_back_to_first_slot() {
        let estimator = TpsEstimator::new();
        let native = vec![16.0];
        assert!(
            (estimator.current_tps(TpsWindow::FifteenMinutes, Some(&native)) - 16.0).abs() < 1e-9
        );
    }

    #[test]
    fn window_parse_defaults_to_one_minute() {
        assert_eq!(TpsWindow::parse("5m"), TpsWindow::FiveMinutes);
        assert_eq!(TpsWindow::parse("15m"), TpsWindow::FifteenMinutes);
        assert_eq!(TpsWindow::parse("2h"), TpsWindow::OneMinute);
    }
}
