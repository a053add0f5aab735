//! Bounded rejection sampling shared by the user and destination draws.

use rand::Rng;

/// Result of a bounded rejection loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample<T> {
    Accepted(T),
    /// Every trial was rejected
    Exhausted,
}

impl<T> Sample<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            Sample::Accepted(value) => Some(value),
            Sample::Exhausted => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Sample::Accepted(_))
    }
}

/// Propose a candidate, then draw a single acceptance value `r` and test up to
/// `trials` candidates against it. A candidate is accepted when
/// `r <= acceptance(candidate)`; each rejection proposes a fresh candidate while
/// `r` stays fixed.
///
/// Random draws happen in this order: first proposal, `r`, re-proposals.
pub fn rejection_sample<R, T, P, A>(trials: u32, rng: &mut R, mut propose: P, mut acceptance: A) -> Sample<T>
where
    R: Rng,
    P: FnMut(&mut R) -> T,
    A: FnMut(&T) -> f64,
{
    if trials == 0 {
        return Sample::Exhausted;
    }

    let mut candidate = propose(rng);
    let r: f64 = rng.gen();

    for trial in 0..trials {
        if r <= acceptance(&candidate) {
            return Sample::Accepted(candidate);
        }
        if trial + 1 < trials {
            candidate = propose(rng);
        }
    }

    Sample::Exhausted
}
