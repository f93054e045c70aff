//! Health-scaled threshold policy.
//!
//! Maps a TPS reading into a severity band and a multiplier applied to
//! the smart-cleanup population thresholds. Bands are strict: a reading
//! exactly at a configured threshold counts as the healthier band. The
//! critical band is checked first, so when the two config thresholds
//! coincide the stronger reduction wins below them.

use serde::Serialize;

use crate::config::TpsConfig;

/// Severity band for a TPS reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TpsSeverity {
    Normal,
    Low,
    Critical,
}

impl TpsSeverity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Low => "Low",
            Self::Critical => "Critical",
        }
    }
}

/// Stateless policy over a TPS config.
#[derive(Debug, Clone)]
pub struct ThresholdAdvisor {
    config: TpsConfig,
}

impl ThresholdAdvisor {
    pub fn new(config: TpsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TpsConfig {
        &self.config
    }

    /// Severity band for a reading. Always Normal when adaptive mode
    /// is off.
    pub fn severity_for(&self, tps: f64) -> TpsSeverity {
        if !self.config.adaptive_enabled {
            return TpsSeverity::Normal;
        }
        if tps < self.config.critical_threshold {
            TpsSeverity::Critical
        } else if tps < self.config.low_threshold {
            TpsSeverity::Low
        } else {
            TpsSeverity::Normal
        }
    }

    /// Threshold multiplier in `[0.0, 1.0]` for a reading.
    pub fn multiplier_for(&self, tps: f64) -> f64 {
        let reduction = match self.severity_for(tps) {
            TpsSeverity::Critical => self.config.critical_reduction,
            TpsSeverity::Low => self.config.low_reduction,
            TpsSeverity::Normal => 0,
        };
        1.0 - f64::from(reduction.min(100)) / 100.0
    }

    /// Scale a population threshold for the current reading, rounding
    /// down so a reduction never raises the bar.
    pub fn apply_to(&self, threshold: u32, tps: f64) -> u32 {
        let scaled = f64::from(threshold) * self.multiplier_for(tps);
        scaled.floor() as u32
    }

    /// One-line status such as `19.87 (Normal)`.
    pub fn status_line(&self, tps: f64) -> String {
        format!("{:.2} ({})", tps, self.severity_for(tps).label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisor() -> ThresholdAdvisor {
        ThresholdAdvisor::new(TpsConfig::default())
    }

    #[test]
    fn a_reading_at_the_threshold_is_the_healthier_band() {
        let advisor = advisor();
        assert_eq!(advisor.severity_for(18.0), TpsSeverity::Normal);
        assert_eq!(advisor.severity_for(17.99), TpsSeverity::Low);
        assert_eq!(advisor.severity_for(15.0), TpsSeverity::Low);
        assert_eq!(advisor.severity_for(14.99), TpsSeverity::Critical);
    }

    #[test]
    fn critical_wins_when_thresholds_coincide() {
        let mut config = TpsConfig::default();
        config.low_threshold = 15.0;
        config.critical_threshold = 15.0;
        let advisor = ThresholdAdvisor::new(config);
        assert_eq!(advisor.severity_for(14.9), TpsSeverity::Critical);
        assert!((advisor.multiplier_for(14.9) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn multiplier_follows_configured_reductions() {
        let advisor = advisor();
        assert!((advisor.multiplier_for(19.9) - 1.0).abs() < 1e-9);
        assert!((advisor.multiplier_for(17.0) - 0.7).abs() < 1e-9);
        assert!((advisor.multiplier_for(12.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn apply_to_floors() {
        let advisor = advisor();
        // 30% off 1001 is 700.7, floored.
        assert_eq!(advisor.apply_to(1001, 17.0), 700);
        assert_eq!(advisor.apply_to(2000, 12.0), 1000);
        assert_eq!(advisor.apply_to(2000, 19.9), 2000);
    }

    #[test]
    fn disabled_adaptive_is_always_normal() {
        let mut config = TpsConfig::default();
        config.adaptive_enabled = false;
        let advisor = ThresholdAdvisor::new(config);
        assert_eq!(advisor.severity_for(3.0), TpsSeverity::Normal);
        assert_eq!(advisor.apply_to(2000, 3.0), 2000);
    }

    #[test]
    fn status_line_formats_two_decimals() {
        let advisor = advisor();
        assert_eq!(advisor.status_line(19.8765), "19.88 (Normal)");
        assert_eq!(advisor.status_line(14.0), "14.00 (Critical)");
    }
}
