//! Split gain computation and split acceptance rules.

// =============================================================================
// Split Parameters
// =============================================================================

/// Parameters controlling which splits the tree learner may accept.
///
/// Static for the lifetime of training.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitParams {
    /// Maximum depth of a tree; the root has depth 0.
    pub max_depth: usize,
    /// Minimum in-sample rows in each child.
    pub min_split_size: usize,
    /// Minimum gain for a split to be accepted.
    pub min_information_gain: f64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_split_size: 1,
            min_information_gain: 1e-6,
        }
    }
}

impl SplitParams {
    /// Variance-reduction gain of splitting a node's residuals.
    ///
    /// ```text
    /// gain = S_L²/n_L + S_R²/n_R - S²/n
    /// ```
    ///
    /// Where `S` are residual sums and `n` are row counts of the left child,
    /// the right child and the parent.
    #[inline]
    pub fn compute_gain(
        &self,
        sum_left: f64,
        count_left: usize,
        sum_right: f64,
        count_right: usize,
    ) -> f64 {
        let sum = sum_left + sum_right;
        let count = count_left + count_right;
        sum_left * sum_left / count_left as f64 + sum_right * sum_right / count_right as f64
            - sum * sum / count as f64
    }

    /// Whether both children are large enough.
    #[inline]
    pub fn is_valid_split(&self, count_left: usize, count_right: usize) -> bool {
        count_left >= self.min_split_size && count_right >= self.min_split_size
    }

    /// Whether a node at `depth` with `count` rows may be split at all.
    #[inline]
    pub fn can_split(&self, depth: usize, count: usize) -> bool {
        depth < self.max_depth && count >= 2 * self.min_split_size
    }

    /// Whether the best candidate's gain is large enough.
    #[inline]
    pub fn accepts_gain(&self, gain: f64) -> bool {
        gain >= self.min_information_gain
    }
}

// =============================================================================
// Split Candidate
// =============================================================================

/// Threshold between two consecutive distinct feature values.
///
/// The midpoint, or the lower value when the midpoint rounds up to the upper
/// one. Rows with `value <= threshold` then go left exactly when
/// `value <= lower`.
#[inline]
pub fn split_threshold(lower: f64, upper: f64) -> f64 {
    let mid = lower * 0.5 + upper * 0.5;
    if mid >= upper || mid < lower {
        lower
    } else {
        mid
    }
}

/// Best split found for a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitCandidate {
    pub feature: u32,
    pub threshold: f64,
    pub gain: f64,
    pub count_left: usize,
    pub count_right: usize,
}

/// Replace `incumbent` only on strictly greater gain.
#[inline]
pub fn keep_best(incumbent: &mut Option<SplitCandidate>, candidate: SplitCandidate) {
    match incumbent {
        Some(best) if candidate.gain <= best.gain => {}
        _ => *incumbent = Some(candidate),
    }
}
