//! Matching-block similarity ratio.
//!
//! A from-scratch port of the greedy "longest matching block" algorithm:
//! find the longest common contiguous block, then recurse into the unmatched
//! regions to its left and right. The ratio is `2*M / T` where `M` is the total
//! size of all matched blocks and `T` the combined length of both sequences.
//!
//! Sequences are compared as Unicode scalar values, so `"é"` counts as one
//! element regardless of its UTF-8 width.

use std::collections::HashMap;

/// Minimum ratio for two unequal strings to count as a partial match.
pub const PARTIAL_MATCH_THRESHOLD: f64 = 0.8;

/// Sequences at least this long get the popular-element heuristic.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A matched block: `a[a..a+size] == b[b..b+size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

/// Block matcher over two char sequences.
///
/// `b` is indexed once at construction; elements of `b` that occur in more
/// than 1% (+1) of its positions are dropped from the index when `b` has at
/// least 200 elements. Such popular elements never start a match but can
/// still extend one.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let b2j = index_positions(&b);
        Self { a, b, b2j }
    }

    /// Find the longest matching block in `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Among blocks of maximal size, the one starting earliest in `a` wins,
    /// and among those the one starting earliest in `b`. A zero-size match
    /// at `(alo, blo)` is returned when nothing matches.
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);

        // j2len[j] = length of the longest block ending at a[i-1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Extend across elements the index skipped (popular chars).
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        Match {
            a: best_i,
            b: best_j,
            size: best_size,
        }
    }

    /// All matching blocks in ascending order, adjacent blocks merged, with a
    /// terminating `Match { a: len(a), b: len(b), size: 0 }`.
    pub fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.size < ahi && m.b + m.size < bhi {
                queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
            }
            blocks.push(m);
        }
        blocks.sort();

        let mut merged: Vec<Match> = Vec::with_capacity(blocks.len() + 1);
        for m in blocks {
            match merged.last_mut() {
                Some(last) if last.a + last.size == m.a && last.b + last.size == m.b => {
                    last.size += m.size;
                }
                _ => merged.push(m),
            }
        }
        merged.push(Match {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    /// Similarity in `[0, 1]`: `2*M / (len(a) + len(b))`, or `1.0` when both
    /// sequences are empty.
    pub fn ratio(&self) -> f64 {
        let matches: usize = self.matching_blocks().iter().map(|m| m.size).sum();
        let length = self.a.len() + self.b.len();
        if length == 0 {
            1.0
        } else {
            2.0 * matches as f64 / length as f64
        }
    }
}

fn index_positions(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }
    if b.len() >= AUTOJUNK_MIN_LEN {
        let popular_above = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= popular_above);
    }
    b2j
}

/// Similarity ratio of an extracted string against its ground truth.
///
/// The extracted value is the first sequence and the expected value the
/// second, the one that gets indexed. Swapping them can change the ratio
/// through tie-breaking and the popular-element heuristic.
pub fn similarity_ratio(actual: &str, expected: &str) -> f64 {
    SequenceMatcher::new(actual, expected).ratio()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_ratio_one() {
        assert_eq!(similarity_ratio("Smith", "Smith"), 1.0);
    }

    #[test]
    fn both_empty_ratio_one() {
        assert_eq!(similarity_ratio("", ""), 1.0);
    }

    #[test]
    fn one_empty_ratio_zero() {
        assert_eq!(similarity_ratio("", "Smith"), 0.0);
        assert_eq!(similarity_ratio("Smith", ""), 0.0);
    }

    #[test]
    fn padded_date_is_above_threshold() {
        // "1/1980" + "1/" matched: 2 * 8 / 18
        let r = similarity_ratio("01/01/1980", "1/1/1980");
        assert!((r - 16.0 / 18.0).abs() < 1e-12);
        assert!(r >= PARTIAL_MATCH_THRESHOLD);
    }

    #[test]
    fn matching_blocks_known_layout() {
        let sm = SequenceMatcher::new("abxcd", "abcd");
        assert_eq!(
            sm.matching_blocks(),
            vec![
                Match { a: 0, b: 0, size: 2 },
                Match { a: 3, b: 2, size: 2 },
                Match { a: 5, b: 4, size: 0 },
            ]
        );
    }

    #[test]
    fn longest_match_prefers_earliest_in_a() {
        let sm = SequenceMatcher::new(" abcd", "abcd abcd");
        assert_eq!(sm.find_longest_match(0, 5, 0, 9), Match { a: 0, b: 4, size: 5 });
    }

    #[test]
    fn swapped_pair_matches_one_char() {
        let sm = SequenceMatcher::new("ab", "ba");
        assert_eq!(sm.find_longest_match(0, 2, 0, 2), Match { a: 0, b: 1, size: 1 });
        assert_eq!(sm.ratio(), 0.5);
    }

    #[test]
    fn shifted_window_ratio() {
        assert_eq!(similarity_ratio("abcd", "bcde"), 0.75);
    }

    #[test]
    fn ratio_exactly_at_threshold() {
        assert_eq!(similarity_ratio("abcdf", "abcde"), 0.8);
    }

    #[test]
    fn unicode_counts_chars_not_bytes() {
        // one substitution out of four chars each side
        assert_eq!(similarity_ratio("José", "Jose"), 0.75);
    }

    #[test]
    fn popular_chars_do_not_seed_matches() {
        let expected = format!("x{}", "a".repeat(199));
        let actual = format!("{}x", "a".repeat(199));
        // 'a' is popular in the 200-char expected value, so only "x" matches.
        assert_eq!(similarity_ratio(&actual, &expected), 2.0 / 400.0);
    }

    #[test]
    fn popular_chars_still_extend_matches() {
        let s = "a".repeat(200);
        assert_eq!(similarity_ratio(&s, &s), 1.0);
    }

    #[test]
    fn short_sequences_keep_repeated_chars() {
        let expected = format!("x{}", "a".repeat(20));
        let actual = format!("{}x", "a".repeat(20));
        assert_eq!(similarity_ratio(&actual, &expected), 40.0 / 42.0);
    }
}
