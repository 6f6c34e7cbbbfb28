//! Sequential Probability Ratio Test on pass/fail counters.
//!
//! Tests H0: p >= min_reliability against H1: p <= min_reliability - margin
//! with symmetric error rates alpha = beta = 1 - significance. The Wald
//! log-likelihood ratio lambda = log(L(H1)/L(H0)) is compared against
//! log((1-beta)/alpha) (reject H0) and log(beta/(1-alpha)) (accept H0).
//!
//! With min_reliability 0.99 and margin 0.10 the hypotheses are separated
//! enough that ~20-30 consecutive passes drive accept, while a genuinely
//! failing test is rejected within a handful of samples.

/// Floor keeping probabilities and error rates away from log(0).
const PROB_EPSILON: f64 = 1e-10;

/// Default indifference margin between H0 and H1.
pub const DEFAULT_MARGIN: f64 = 0.10;

/// Outcome of one SPRT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SprtDecision {
    /// H0 accepted: the test is reliable at the required level.
    Accept,
    /// H0 rejected: the test's reliability is below the margin.
    Reject,
    /// Not enough evidence either way; keep sampling.
    Continue,
}

/// Outcome of a reverse-chronological demotion evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemotionDecision {
    Demote,
    Retain,
    Inconclusive,
}

/// Statistical parameters threaded through every SPRT call.
#[derive(Debug, Clone, Copy)]
pub struct SprtParams {
    pub min_reliability: f64,
    pub significance: f64,
    pub margin: f64,
}

impl SprtParams {
    pub fn new(min_reliability: f64, significance: f64) -> Self {
        Self {
            min_reliability,
            significance,
            margin: DEFAULT_MARGIN,
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Symmetric error rate, clamped so significance = 1.0 stays finite.
    fn error_rate(&self) -> f64 {
        (1.0 - self.significance).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON)
    }

    /// (p0, p1) clamped away from 0 and 1.
    fn hypotheses(&self) -> (f64, f64) {
        let p0 = self
            .min_reliability
            .clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
        let p1 = (self.min_reliability - self.margin).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
        (p0, p1)
    }
}

/// Wald log-likelihood ratio log(L(H1)/L(H0)) for the given counters.
fn lambda(runs: u32, passes: u32, params: &SprtParams) -> f64 {
    let (p0, p1) = params.hypotheses();
    let fails = runs.saturating_sub(passes) as f64;
    let passes = passes as f64;
    passes * (p1 / p0).ln() + fails * ((1.0 - p1) / (1.0 - p0)).ln()
}

/// Evidence in favor of reliability: log(L(H0)/L(H1)).
///
/// Additive over batches; the verdict layer exponentiates sums of this to
/// obtain S-values (and their reciprocals as E-values).
pub fn support_log_ratio(runs: u32, passes: u32, params: &SprtParams) -> f64 {
    -lambda(runs, passes, params)
}

/// One SPRT step on accumulated counters.
pub fn evaluate(runs: u32, passes: u32, params: &SprtParams) -> SprtDecision {
    if runs == 0 {
        return SprtDecision::Continue;
    }
    let alpha = params.error_rate();
    let beta = alpha;
    let upper = ((1.0 - beta) / alpha).ln();
    let lower = (beta / (1.0 - alpha)).ln();
    let value = lambda(runs, passes, params);

    if value >= upper {
        SprtDecision::Reject
    } else if value <= lower {
        SprtDecision::Accept
    } else {
        SprtDecision::Continue
    }
}

/// Walk a newest-first history, streaming pass/fail into the SPRT until a
/// decision is reached or the history is exhausted.
///
/// Demote corresponds to reject (observed reliability below the
/// threshold); retain corresponds to accept. Exhaustion without a verdict
/// is inconclusive — the caller decides whether that means re-burn-in.
pub fn demotion_evaluate<I>(history_newest_first: I, params: &SprtParams) -> DemotionDecision
where
    I: IntoIterator<Item = bool>,
{
    let mut runs = 0u32;
    let mut passes = 0u32;
    for passed in history_newest_first {
        runs += 1;
        if passed {
            passes += 1;
        }
        match evaluate(runs, passes, params) {
            SprtDecision::Accept => return DemotionDecision::Retain,
            SprtDecision::Reject => return DemotionDecision::Demote,
            SprtDecision::Continue => {}
        }
    }
    DemotionDecision::Inconclusive
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SprtParams {
        SprtParams::new(0.99, 0.95)
    }

    #[test]
    fn zero_runs_continues() {
        assert_eq!(evaluate(0, 0, &params()), SprtDecision::Continue);
    }

    #[test]
    fn consecutive_passes_accept_within_forty_runs() {
        let p = params();
        let mut decided_at = None;
        for n in 1..=40 {
            if evaluate(n, n, &p) == SprtDecision::Accept {
                decided_at = Some(n);
                break;
            }
        }
        let at = decided_at.expect("all-pass history should accept");
        assert!(at <= 40, "accepted only at {at}");
    }

    #[test]
    fn consistent_failures_reject_quickly() {
        let p = params();
        let mut decided_at = None;
        for n in 1..=10 {
            if evaluate(n, 0, &p) == SprtDecision::Reject {
                decided_at = Some(n);
                break;
            }
        }
        assert!(decided_at.is_some(), "all-fail history should reject fast");
    }

    #[test]
    fn significance_one_stays_finite() {
        let p = SprtParams::new(0.99, 1.0);
        // Degenerate error rate is clamped; evaluation still terminates
        // with a finite statistic.
        let d = evaluate(100, 100, &p);
        assert!(matches!(d, SprtDecision::Accept | SprtDecision::Continue));
        assert!(lambda(100, 100, &p).is_finite());
    }

    #[test]
    fn monotonic_in_passes() {
        // Fixing n, more passes never moves the decision toward reject.
        let p = params();
        let rank = |d: SprtDecision| match d {
            SprtDecision::Reject => 0,
            SprtDecision::Continue => 1,
            SprtDecision::Accept => 2,
        };
        for n in 1..=60 {
            let mut prev = rank(evaluate(n, 0, &p));
            for k in 1..=n {
                let cur = rank(evaluate(n, k, &p));
                assert!(cur >= prev, "decision regressed at n={n}, k={k}");
                prev = cur;
            }
        }
    }

    #[test]
    fn demotion_streams_to_a_decision() {
        let p = params();
        // A long all-pass history retains.
        assert_eq!(
            demotion_evaluate(std::iter::repeat(true).take(60), &p),
            DemotionDecision::Retain
        );
        // Repeated failures demote.
        assert_eq!(
            demotion_evaluate(std::iter::repeat(false).take(10), &p),
            DemotionDecision::Demote
        );
        // A short mixed history is inconclusive.
        assert_eq!(
            demotion_evaluate([true, false, true], &p),
            DemotionDecision::Inconclusive
        );
    }

    #[test]
    fn support_log_ratio_is_additive_over_batches() {
        let p = params();
        let whole = support_log_ratio(30, 28, &p);
        let split = support_log_ratio(12, 11, &p) + support_log_ratio(18, 17, &p);
        assert!((whole - split).abs() < 1e-9);
    }
}
