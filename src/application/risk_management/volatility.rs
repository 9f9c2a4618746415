use statrs::statistics::Statistics;

/// Log returns between consecutive prices.
///
/// Pairs where either price is non-positive are skipped.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|pair| pair[0] > 0.0 && pair[1] > 0.0)
        .map(|pair| (pair[1] / pair[0]).ln())
        .collect()
}

/// Annualized sample standard deviation of returns.
///
/// Returns annualized volatility (e.g., 0.15 = 15% annual volatility). At
/// least two returns are needed.
pub fn annualized_std(returns: &[f64], periods_per_year: f64) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }

    let std_dev = returns.std_dev();
    if !std_dev.is_finite() {
        return None;
    }

    // Annualize: vol_annual = vol_period * sqrt(periods_per_year)
    Some(std_dev * periods_per_year.sqrt())
}
