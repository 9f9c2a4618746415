use crate::domain::errors::ConfigError;

/// Parameters of the Donchian breakout / volatility-targeting rule.
///
/// Built once at startup through [`StrategyConfig::validated`] and shared
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Donchian look-back windows, ascending and de-duplicated.
    pub look_back_windows: Vec<usize>,
    /// Annualized volatility the position size is scaled towards.
    pub target_volatility: f64,
    /// Upper bound on the absolute sized signal, in (0, 1].
    pub max_allocation: f64,
    /// Number of log returns used to estimate realized volatility.
    pub volatility_window: usize,
    /// Bars per year used to annualize returns and volatility.
    pub periods_per_year: u32,
    pub risk_free_rate: f64,
    /// Sized signals with a smaller magnitude map to HOLD.
    pub min_signal_strength: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            look_back_windows: vec![5, 10],
            target_volatility: 0.25,
            max_allocation: 1.0,
            volatility_window: 90,
            periods_per_year: 252,
            risk_free_rate: 0.0,
            min_signal_strength: 0.01,
        }
    }
}

impl StrategyConfig {
    /// Normalize the window set and check every bound.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.look_back_windows.is_empty() {
            return Err(ConfigError::EmptyLookBackWindows);
        }
        if let Some(&w) = self.look_back_windows.iter().find(|&&w| w == 0) {
            return Err(ConfigError::NonPositiveWindow(w));
        }
        self.look_back_windows.sort_unstable();
        self.look_back_windows.dedup();

        if !(self.target_volatility.is_finite() && self.target_volatility > 0.0) {
            return Err(ConfigError::InvalidTargetVolatility(self.target_volatility));
        }
        if !(self.max_allocation > 0.0 && self.max_allocation <= 1.0) {
            return Err(ConfigError::InvalidMaxAllocation(self.max_allocation));
        }
        if self.volatility_window == 0 {
            return Err(ConfigError::InvalidVolatilityWindow(self.volatility_window));
        }
        if self.periods_per_year == 0 {
            return Err(ConfigError::InvalidPeriodsPerYear(self.periods_per_year));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidRiskFreeRate(self.risk_free_rate));
        }
        if !(self.min_signal_strength.is_finite() && self.min_signal_strength >= 0.0) {
            return Err(ConfigError::InvalidMinSignalStrength(
                self.min_signal_strength,
            ));
        }
        Ok(self)
    }

    pub fn largest_window(&self) -> usize {
        self.look_back_windows.iter().copied().max().unwrap_or(1)
    }
}
