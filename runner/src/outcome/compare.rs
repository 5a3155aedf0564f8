//! Outcome ranking
//!
//! Every comparison returns an [`Ordering`] where `Less` means the left
//! outcome is the better one. Comparing outcomes of different problem classes
//! is a programming error and panics.

use super::{Outcome, ProblemClass};
use std::cmp::Ordering;

impl Outcome {
    /// Compare elapsed times. A run that finished beats one that timed out.
    pub fn compare_time(&self, other: &Outcome) -> Ordering {
        match (self.timed_out(), other.timed_out()) {
            (true, true) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, false) => self.time().cmp(&other.time()),
        }
    }

    /// Compare objectives in the direction of the problem class.
    ///
    /// Satisfaction problems have no objective and always compare equal. A
    /// missing objective is worse than any present one.
    pub fn compare_obj(&self, other: &Outcome) -> Ordering {
        assert_eq!(
            self.is_csp(),
            other.is_csp(),
            "compare_obj expects both outcomes to be of the same problem type"
        );
        if self.is_csp() {
            return Ordering::Equal;
        }
        match (self.objective(), other.objective()) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => {
                let cmp = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
                if self.class() == ProblemClass::Maximize {
                    cmp.reverse()
                } else {
                    cmp
                }
            }
        }
    }

    /// Compare two satisfaction outcomes: deciding the instance beats not
    /// deciding it, then the faster run wins.
    pub fn compare_csp(&self, other: &Outcome) -> Ordering {
        assert!(
            self.is_csp() && other.is_csp(),
            "compare_csp expects two satisfaction outcomes"
        );
        match (self.unknown(), other.unknown()) {
            (true, true) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, false) => self.compare_time(other),
        }
    }

    pub fn compare_cop(&self, other: &Outcome) -> Ordering {
        self.compare_obj(other)
    }

    /// Full comparison: errors lose, then class-specific rules apply.
    ///
    /// # Panics
    ///
    /// Panics if the outcomes belong to different problem classes.
    pub fn compare(&self, other: &Outcome) -> Ordering {
        assert_eq!(
            self.class(),
            other.class(),
            "compare expects both outcomes to have the same problem class"
        );
        match (self.error(), other.error()) {
            (true, true) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, false) if self.is_csp() => self.compare_csp(other),
            (false, false) => self.compare_cop(other),
        }
    }
}

/// Pick the best outcome of one instance.
///
/// Objective first, time as tie-break. The first outcome is the initial best
/// and is only replaced by a strictly better one, so ties keep the earliest.
pub fn best_outcome(outcomes: &[Outcome]) -> Option<&Outcome> {
    let (first, rest) = outcomes.split_first()?;
    Some(rest.iter().fold(first, |best, candidate| {
        match candidate.compare_obj(best) {
            Ordering::Less => candidate,
            Ordering::Equal if candidate.compare_time(best) == Ordering::Less => candidate,
            _ => best,
        }
    }))
}
