//! Ratcliff/Obershelp string similarity in exact integer arithmetic.
//!
//! The ratio between two strings is `2·M / T`, where `T` is the combined
//! length in chars and `M` the number of chars covered by the matching
//! blocks: the longest common substring, then recursively the longest
//! common substrings to its left and to its right.
//!
//! Scores are kept as the `(M, T)` pair and compared by cross-multiplying,
//! so equal ratios compare equal and the 0.5 cutoff is exact.

/// Similarity score of two strings, as the fraction `2·matches / total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Similarity {
    matches: usize,
    total: usize,
}

/// A common substring: starts in both inputs and its length.
#[derive(Debug, Clone, Copy)]
struct Block {
    a: usize,
    b: usize,
    len: usize,
}

impl Similarity {
    /// Score `a` against `b`.
    pub fn between(a: &str, b: &str) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len().saturating_add(b.len());
        if total == 0 {
            // Two empty strings are identical.
            return Self {
                matches: 1,
                total: 2,
            };
        }
        Self {
            matches: matching_chars(&a, &b),
            total,
        }
    }

    /// Chars covered by matching blocks.
    pub const fn matches(self) -> usize {
        self.matches
    }

    /// Combined length of both inputs in chars.
    pub const fn total(self) -> usize {
        self.total
    }

    /// Whether the ratio is at least 0.5.
    pub const fn is_close(self) -> bool {
        self.matches.saturating_mul(4) >= self.total
    }

    /// Whether this score is strictly higher than `other`.
    pub const fn beats(self, other: Self) -> bool {
        self.matches.saturating_mul(other.total) > other.matches.saturating_mul(self.total)
    }
}

/// Sum of the matching block lengths between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0_usize;
    let mut pending = vec![(a, b)];
    while let Some((a, b)) = pending.pop() {
        let Some(block) = longest_match(a, b) else {
            continue;
        };
        total = total.saturating_add(block.len);

        if let (Some(a_left), Some(b_left)) = (a.get(..block.a), b.get(..block.b)) {
            pending.push((a_left, b_left));
        }
        let a_end = block.a.saturating_add(block.len);
        let b_end = block.b.saturating_add(block.len);
        if let (Some(a_right), Some(b_right)) = (a.get(a_end..), b.get(b_end..)) {
            pending.push((a_right, b_right));
        }
    }
    total
}

/// Longest common substring of `a` and `b`.
///
/// Among equally long candidates, the one starting earliest in `a` wins,
/// then the one starting earliest in `b`. `None` when nothing matches.
fn longest_match(a: &[char], b: &[char]) -> Option<Block> {
    let mut best: Option<Block> = None;
    // current[j + 1] is the length of the common suffix of a[..=i] and b[..=j].
    let mut previous = vec![0_usize; b.len().saturating_add(1)];
    let mut current = vec![0_usize; b.len().saturating_add(1)];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let run = if ca == cb {
                previous.get(j).copied().unwrap_or(0).saturating_add(1)
            } else {
                0
            };
            if let Some(slot) = current.get_mut(j.saturating_add(1)) {
                *slot = run;
            }
            if run > best.map_or(0, |block| block.len) {
                best = Some(Block {
                    a: i.saturating_add(1).saturating_sub(run),
                    b: j.saturating_add(1).saturating_sub(run),
                    len: run,
                });
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposed_letters_score_high() {
        let score = Similarity::between("catgril", "catgirl");
        assert_eq!(score.matches(), 6);
        assert_eq!(score.total(), 14);
        assert!(score.is_close());
    }

    #[test]
    fn unrelated_strings_score_zero() {
        let score = Similarity::between("zzz", "catgirl");
        assert_eq!(score.matches(), 0);
        assert!(!score.is_close());
    }

    #[test]
    fn identical_strings_match_fully() {
        let score = Similarity::between("fox", "fox");
        assert_eq!(score.matches(), 3);
        assert_eq!(score.total(), 6);
        assert!(Similarity::between("", "").is_close());
    }

    #[test]
    fn cutoff_is_inclusive() {
        // "ab" vs "ax": 2·1 / 4 == 0.5 exactly.
        assert!(Similarity::between("ab", "ax").is_close());
        // "abc" vs "axy": 2·1 / 6 < 0.5.
        assert!(!Similarity::between("abc", "axy").is_close());
    }

    #[test]
    fn equal_ratios_do_not_beat_each_other() {
        let short = Similarity::between("ab", "ax");
        let long = Similarity::between("abcd", "abxy");
        assert!(!short.beats(long));
        assert!(!long.beats(short));
        assert!(Similarity::between("abc", "abd").beats(short));
    }

    #[test]
    fn recursion_finds_blocks_on_both_sides() {
        // Longest block "cd", then "a" on the left and "f" on the right.
        let score = Similarity::between("abcdef", "axcdyf");
        assert_eq!(score.matches(), 4);
    }

    #[test]
    fn multibyte_chars_count_once() {
        let score = Similarity::between("ネコ耳", "ネコ");
        assert_eq!(score.matches(), 2);
        assert_eq!(score.total(), 5);
    }
}
