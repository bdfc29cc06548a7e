//! OHLCV candle data and the immutable replay series.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV candle with a millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Open timestamp (Unix milliseconds).
    pub timestamp_ms: i64,
    /// Candle open price.
    pub open: Decimal,
    /// Candle high price.
    pub high: Decimal,
    /// Candle low price.
    pub low: Decimal,
    /// Candle close price.
    pub close: Decimal,
    /// Candle volume.
    pub volume: Decimal,
}

impl Candle {
    /// Create a new candle.
    #[must_use]
    pub const fn new(
        timestamp_ms: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp_ms,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check if price went below a level during this candle.
    #[must_use]
    pub fn traded_below(&self, price: Decimal) -> bool {
        self.low <= price
    }

    /// Check if price went above a level during this candle.
    #[must_use]
    pub fn traded_above(&self, price: Decimal) -> bool {
        self.high >= price
    }

    /// Open timestamp as an RFC 3339 string, empty if out of range.
    #[must_use]
    pub fn timestamp_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.timestamp_ms)
            .map_or_else(String::new, |dt| dt.to_rfc3339())
    }
}

/// Candle series validation errors.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// Series contains no candles.
    #[error("candle series is empty")]
    Empty,

    /// Timestamps are not strictly ascending.
    #[error("candle timestamps out of order at index {index}: {prev} >= {next}")]
    OutOfOrder {
        /// Index of the offending candle.
        index: usize,
        /// Timestamp of the preceding candle (ms).
        prev: i64,
        /// Timestamp of the offending candle (ms).
        next: i64,
    },

    /// The configured start index does not exist in the series.
    #[error("start index {start_index} out of range for {len} candles")]
    StartIndexOutOfRange {
        /// Configured first tradable index.
        start_index: usize,
        /// Series length.
        len: usize,
    },
}

/// Immutable, validated, ascending-ordered candle sequence.
///
/// Irregular spacing between candles is tolerated; indices are contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validate and wrap a candle sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::Empty`] for an empty input and
    /// [`SeriesError::OutOfOrder`] when timestamps are not strictly
    /// ascending.
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        if candles.is_empty() {
            return Err(SeriesError::Empty);
        }

        for (index, pair) in candles.windows(2).enumerate() {
            if pair[1].timestamp_ms <= pair[0].timestamp_ms {
                return Err(SeriesError::OutOfOrder {
                    index: index + 1,
                    prev: pair[0].timestamp_ms,
                    next: pair[1].timestamp_ms,
                });
            }
        }

        Ok(Self { candles })
    }

    /// Get the candle at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// Number of candles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Whether the series is empty (never true for a constructed series).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Index of the last candle.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.candles.len() - 1
    }

    /// All candles, in order.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn candle(ts: i64) -> Candle {
        Candle::new(
            ts,
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100.5),
            dec!(1000),
        )
    }

    #[test]
    fn test_series_rejects_empty() {
        let result = CandleSeries::new(Vec::new());
        assert!(matches!(result, Err(SeriesError::Empty)));
    }

    #[test]
    fn test_series_rejects_out_of_order() {
        let result = CandleSeries::new(vec![candle(2000), candle(1000)]);
        assert!(matches!(
            result,
            Err(SeriesError::OutOfOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_series_rejects_duplicate_timestamp() {
        let result = CandleSeries::new(vec![candle(1000), candle(1000)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_series_tolerates_irregular_spacing() {
        let series =
            CandleSeries::new(vec![candle(1000), candle(2000), candle(9000)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_index(), 2);
    }

    #[test]
    fn test_intrabar_extreme_checks() {
        let c = Candle::new(0, dec!(100), dec!(110), dec!(90), dec!(105), dec!(1));
        assert!(c.traded_below(dec!(90)));
        assert!(c.traded_below(dec!(95)));
        assert!(!c.traded_below(dec!(89.99)));
        assert!(c.traded_above(dec!(110)));
        assert!(c.traded_above(dec!(105)));
        assert!(!c.traded_above(dec!(110.01)));
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let c = candle(1_577_836_800_000); // 2020-01-01T00:00:00Z
        assert!(c.timestamp_rfc3339().starts_with("2020-01-01T00:00:00"));
    }
}
