use serde::Serialize;

use crate::{FieldResult, Status};

/// Aggregate counts and percentages over a set of field results.
///
/// Percentages are rounded to two decimals. `total_accuracy` credits both
/// exact and partial matches. With no fields at all every percentage is
/// `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub exact_matches: usize,
    pub partial_matches: usize,
    pub mismatches: usize,
    pub missing_fields: usize,
    pub exact_match_percentage: f64,
    pub partial_match_percentage: f64,
    pub total_accuracy: f64,
}

impl SummaryMetrics {
    pub fn from_results(results: &[FieldResult]) -> Self {
        let mut counts = [0usize; 4];
        for result in results {
            counts[result.status as usize] += 1;
        }
        Self::from_counts(counts[0], counts[1], counts[2], counts[3])
    }

    pub fn from_counts(exact: usize, partial: usize, mismatches: usize, missing: usize) -> Self {
        let total = exact + partial + mismatches + missing;
        let pct = |n: usize| {
            if total == 0 {
                0.0
            } else {
                round2(n as f64 / total as f64 * 100.0)
            }
        };
        Self {
            exact_matches: exact,
            partial_matches: partial,
            mismatches,
            missing_fields: missing,
            exact_match_percentage: pct(exact),
            partial_match_percentage: pct(partial),
            total_accuracy: pct(exact + partial),
        }
    }

    /// Number of scored fields.
    pub fn total(&self) -> usize {
        self.exact_matches + self.partial_matches + self.mismatches + self.missing_fields
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::ExactMatch => self.exact_matches,
            Status::PartialMatch => self.partial_matches,
            Status::Mismatch => self.mismatches,
            Status::Missing => self.missing_fields,
        }
    }

    /// Pool the counts of two summaries and recompute the percentages.
    pub fn merge(&self, other: &SummaryMetrics) -> SummaryMetrics {
        Self::from_counts(
            self.exact_matches + other.exact_matches,
            self.partial_matches + other.partial_matches,
            self.mismatches + other.mismatches,
            self.missing_fields + other.missing_fields,
        )
    }
}

/// Round to two decimals.
///
/// Rounds the exact binary value of `value`, not its shortest decimal form,
/// and breaks exact ties to even. `3.125` is exactly representable and
/// becomes `3.12`; `0.285` is stored slightly below and becomes `0.28`.
fn round2(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    let bits = value.abs().to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    // |value| = mantissa * 2^exp
    let (mantissa, exp) = if exp_bits == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), exp_bits - 1075)
    };

    if exp >= 0 {
        // integral, nothing to round
        return value;
    }
    let shift = exp.unsigned_abs();
    let hundredths = if shift >= 128 {
        0
    } else {
        let scaled = mantissa as u128 * 100;
        let quotient = scaled >> shift;
        let remainder = scaled - (quotient << shift);
        let half = 1u128 << (shift - 1);
        if remainder > half || (remainder == half && quotient % 2 == 1) {
            quotient + 1
        } else {
            quotient
        }
    };

    (hundredths as f64 / 100.0).copysign(value)
}
