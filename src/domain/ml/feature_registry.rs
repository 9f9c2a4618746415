/// Ordered list of feature names produced by the feature engine.
/// This order MUST match the feature list stored in deployed model artifacts;
/// renaming or reordering an entry is a breaking change for those models.
///
/// `ema_20_ratio` is `close / EMA(close, span 20) - 1`. Earlier training
/// pipelines filled this column from a 50-span EMA; artifacts trained on that
/// data are not compatible and must be retrained on the 20-span column.
pub const FEATURE_NAMES: &[&str] = &[
    "rsi_14",
    "mom_10d",
    "mom_30d",
    "stochk_14_3_3",
    "stochd_14_3_3",
    "macd_hist",
    "adx_14",
    "plus_di_14",
    "minus_di_14",
    "sma_50_ratio",
    "ema_20_ratio",
    "atr_14_norm",
    "bbands_width_20_2",
    "volatility_30d",
    "volatility_90d",
    "obv_pct_change_10d",
    "donchian_width_rel_60",
];

/// One named, ordered feature vector labelled by the candle it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// `open_time` of the labelled candle.
    pub timestamp: i64,
    entries: Vec<(String, f64)>,
}

impl FeatureRow {
    pub fn new<S: Into<String>>(timestamp: i64, entries: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            timestamp,
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
