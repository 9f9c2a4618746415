pub mod volatility;
