use serde::Serialize;

/// Counts of unusable entries in a raw price column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvalidValueCounts {
    pub nan_count: usize,
    pub inf_count: usize,
}

impl InvalidValueCounts {
    pub fn needs_cleaning(&self) -> bool {
        self.nan_count > 0 || self.inf_count > 0
    }
}

/// A named sequence of closing prices, indexed by row position.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    values: Vec<f64>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            values,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Counts NaN and infinite entries.
    pub fn invalid_counts(&self) -> InvalidValueCounts {
        self.values
            .iter()
            .fold(InvalidValueCounts::default(), |mut counts, v| {
                if v.is_nan() {
                    counts.nan_count += 1;
                } else if v.is_infinite() {
                    counts.inf_count += 1;
                }
                counts
            })
    }

    /// Returns a copy with every NaN and ±inf row dropped.
    pub fn cleaned(&self) -> Self {
        Self {
            symbol: self.symbol.clone(),
            values: self.values.iter().copied().filter(|v| v.is_finite()).collect(),
        }
    }

    /// Applies `order` rounds of first differencing.
    ///
    /// Each round shortens the series by exactly one observation.
    pub fn differenced(&self, order: usize) -> Self {
        Self {
            symbol: self.symbol.clone(),
            values: difference(&self.values, order),
        }
    }

    /// Last `n` observations (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[f64] {
        let start = self.values.len().saturating_sub(n);
        &self.values[start..]
    }
}

/// `order`-th difference of `data`; empty when the input is too short.
pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..order {
        if result.len() < 2 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}
