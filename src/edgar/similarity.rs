// src/edgar/similarity.rs
//! Ratcliff/Obershelp similarity, the measure used to accept fuzzy company
//! name matches.
//!
//! `ratio = 2 * M / T`, where `T` is the total length of both strings and `M`
//! the number of characters covered by matching blocks. Blocks are found by
//! taking the longest common substring, then recursing into the unmatched
//! left and right remainders. Ties are broken toward the block that ends
//! earliest in `a`, then earliest in `b`.

/// Similarity in `[0.0, 1.0]`. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Cheap upper bound on [`ratio`]; lets callers skip candidates that cannot
/// reach a threshold.
pub fn ratio_upper_bound(a_len: usize, b_len: usize) -> f64 {
    let total = a_len + b_len;
    if total == 0 {
        return 1.0;
    }
    2.0 * a_len.min(b_len) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
fn longest_match(a: &[char], b: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j - blo] = length of the common run ending at a[i - 1], b[j - 1]
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            if a[i] == b[j] {
                cur[k] = prev[k - 1] + 1;
                if cur[k] > best_size {
                    best_size = cur[k];
                    best_i = i + 1 - best_size;
                    best_j = j + 1 - best_size;
                }
            } else {
                cur[k] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_and_disjoint() {
        assert!(close(ratio("acme corp", "acme corp"), 1.0));
        assert!(close(ratio("abc", "xyz"), 0.0));
        assert!(close(ratio("", ""), 1.0));
        assert!(close(ratio("abc", ""), 0.0));
    }

    #[test]
    fn known_sequence_matcher_values() {
        // "abcd" vs "bcde": block "bcd" → 2*3/8
        assert!(close(ratio("abcd", "bcde"), 0.75));
        // blocks "ab" then "cd": 2*4/9
        assert!(close(ratio("abxcd", "abcd"), 8.0 / 9.0));
        // one-letter typo in a long name stays above 0.9
        let r = ratio("walt disney co", "walt disnay co");
        assert!(r > 0.9, "ratio was {r}");
    }

    #[test]
    fn blocks_left_of_the_longest_match_count() {
        // longest block " disney co", then "the" on the left
        let r = ratio("the walt disney co", "the disney co");
        assert!(close(r, 2.0 * 13.0 / 31.0), "ratio was {r}");
    }

    #[test]
    fn upper_bound_never_below_ratio() {
        for (a, b) in [("acme", "acme holdings"), ("x", "xyz"), ("pfizer inc", "pfizer")] {
            assert!(ratio_upper_bound(a.chars().count(), b.chars().count()) >= ratio(a, b));
        }
    }
}
