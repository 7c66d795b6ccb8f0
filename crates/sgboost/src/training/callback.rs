//! Early stopping callback for training.
//!
//! Monitors a validation metric and stops training when no improvement is seen
//! for a specified number of rounds.

/// Outcome of feeding one round's metric to [`EarlyStopping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopAction {
    /// New best value.
    Improved,
    /// No improvement, still within patience.
    Continue,
    /// Patience exhausted.
    Stop,
}

/// Early stopping state.
///
/// # Example
///
/// ```
/// use sgboost::training::{EarlyStopAction, EarlyStopping};
///
/// // Lower is better (e.g. RMSE)
/// let mut early_stop = EarlyStopping::new(2, false);
/// assert_eq!(early_stop.update(0.5), EarlyStopAction::Improved);
/// assert_eq!(early_stop.update(0.6), EarlyStopAction::Continue);
/// assert_eq!(early_stop.update(0.7), EarlyStopAction::Stop);
/// assert_eq!(early_stop.best_round(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    /// Rounds without improvement tolerated before stopping.
    patience: usize,
    best_value: Option<f64>,
    best_round: usize,
    current_round: usize,
    higher_is_better: bool,
}

impl EarlyStopping {
    pub fn new(patience: usize, higher_is_better: bool) -> Self {
        Self {
            patience,
            best_value: None,
            best_round: 0,
            current_round: 0,
            higher_is_better,
        }
    }

    /// Record the metric for the current round.
    pub fn update(&mut self, value: f64) -> EarlyStopAction {
        let is_improvement = match self.best_value {
            None => true,
            Some(best) if self.higher_is_better => value > best,
            Some(best) => value < best,
        };

        let round = self.current_round;
        self.current_round += 1;

        if is_improvement {
            self.best_value = Some(value);
            self.best_round = round;
            EarlyStopAction::Improved
        } else if self.current_round - self.best_round > self.patience {
            EarlyStopAction::Stop
        } else {
            EarlyStopAction::Continue
        }
    }

    /// Convenience wrapper: `true` once patience is exhausted.
    pub fn should_stop(&mut self, value: f64) -> bool {
        self.update(value) == EarlyStopAction::Stop
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }

    /// Zero-based round of the best value.
    pub fn best_round(&self) -> usize {
        self.best_round
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }

    pub fn reset(&mut self) {
        self.best_value = None;
        self.best_round = 0;
        self.current_round = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stop_while_improving() {
        let mut early_stop = EarlyStopping::new(3, false);

        assert!(!early_stop.should_stop(1.0));
        assert!(!early_stop.should_stop(0.9));
        assert!(!early_stop.should_stop(0.8));
        assert!(!early_stop.should_stop(0.7));

        assert_eq!(early_stop.best_round(), 3);
        assert_eq!(early_stop.best_value(), Some(0.7));
    }

    #[test]
    fn stops_after_patience() {
        let mut early_stop = EarlyStopping::new(3, false);

        assert_eq!(early_stop.update(0.5), EarlyStopAction::Improved);
        assert_eq!(early_stop.update(0.6), EarlyStopAction::Continue);
        assert_eq!(early_stop.update(0.7), EarlyStopAction::Continue);
        assert_eq!(early_stop.update(0.8), EarlyStopAction::Stop);

        assert_eq!(early_stop.best_round(), 0);
    }

    #[test]
    fn resets_on_improvement() {
        let mut early_stop = EarlyStopping::new(2, false);

        early_stop.update(1.0);
        early_stop.update(1.1);
        assert_eq!(early_stop.update(0.9), EarlyStopAction::Improved);
        assert_eq!(early_stop.update(1.0), EarlyStopAction::Continue);
        assert_eq!(early_stop.update(1.0), EarlyStopAction::Stop);
        assert_eq!(early_stop.best_round(), 2);
    }

    #[test]
    fn higher_is_better() {
        let mut early_stop = EarlyStopping::new(2, true);
        assert_eq!(early_stop.update(0.5), EarlyStopAction::Improved);
        assert_eq!(early_stop.update(0.7), EarlyStopAction::Improved);
        assert_eq!(early_stop.update(0.6), EarlyStopAction::Continue);
        assert_eq!(early_stop.update(0.6), EarlyStopAction::Stop);
    }

    #[test]
    fn reset_clears_state() {
        let mut early_stop = EarlyStopping::new(1, false);
        early_stop.update(1.0);
        early_stop.reset();
        assert_eq!(early_stop.current_round(), 0);
        assert_eq!(early_stop.best_value(), None);
    }
}
