use super::AnalysisError;

/// A run of values in period order.
pub struct TimeSeries {
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Mean of the `window` values immediately before the last one.
    pub fn trailing_mean(&self, window: usize) -> Result<f64, AnalysisError> {
        let needed = window.saturating_add(1);
        if window == 0 || self.values.len() < needed {
            return Err(AnalysisError::InsufficientBaseline {
                needed,
                have: self.values.len(),
            });
        }
        let end = self.values.len() - 1;
        let prior = &self.values[end - window..end];
        Ok(prior.iter().sum::<f64>() / window as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huge_window_is_insufficient_not_overflow() {
        let ts = TimeSeries::new(vec![1.0; 8]);
        assert!(matches!(
            ts.trailing_mean(usize::MAX),
            Err(AnalysisError::InsufficientBaseline { have: 8, .. })
        ));
    }

    #[test]
    fn test_mean() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ts.mean(), 3.0);
        assert_eq!(TimeSeries::new(vec![]).mean(), 0.0);
    }

    #[test]
    fn test_trailing_mean_skips_last_value() {
        let ts = TimeSeries::new(vec![99.0, 10.0, 20.0, 30.0, 40.0, 1000.0]);
        assert_eq!(ts.trailing_mean(4).unwrap(), 25.0);
    }

    #[test]
    fn test_trailing_mean_needs_window_plus_one() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0, 4.0]);
        match ts.trailing_mean(4) {
            Err(AnalysisError::InsufficientBaseline { needed, have }) => {
                assert_eq!(needed, 5);
                assert_eq!(have, 4);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
