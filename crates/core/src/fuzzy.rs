//! Approximate string similarity on a 0-100 scale.
//!
//! `ratio` is the normalized indel similarity (`2 * lcs / (len_a + len_b)`),
//! `partial_ratio` the best `ratio` of the shorter string against every
//! equally long window of the longer one. Both round to whole points.

pub fn ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    char_ratio(&left, &right).round()
}

pub fn partial_ratio(left: &str, right: &str) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    let (short, long) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };

    if short.is_empty() {
        return 0.0;
    }

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        let score = char_ratio(&short, window);
        if score > best {
            best = score;
        }
        if best >= 99.5 {
            return 100.0;
        }
    }

    best.round()
}

fn char_ratio(left: &[char], right: &[char]) -> f64 {
    let total = left.len() + right.len();
    if total == 0 {
        return 100.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    200.0 * longest_common_subsequence(left, right) as f64 / total as f64
}

fn longest_common_subsequence(left: &[char], right: &[char]) -> usize {
    let mut previous = vec![0usize; right.len() + 1];
    let mut current = vec![0usize; right.len() + 1];

    for &lc in left {
        for (column, &rc) in right.iter().enumerate() {
            current[column + 1] = if lc == rc {
                previous[column] + 1
            } else {
                current[column].max(previous[column + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}

#[cfg(test)]
mod tests {
    use super::{partial_ratio, ratio};

    #[test]
    fn identical_strings_score_full() {
        assert_eq!(ratio("POLO TSI", "POLO TSI"), 100.0);
        assert_eq!(partial_ratio("POLO TSI", "POLO TSI"), 100.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(ratio("ABC", "XYZ"), 0.0);
        assert_eq!(partial_ratio("ABC", "XYZW"), 0.0);
    }

    #[test]
    fn ratio_counts_shared_characters() {
        // lcs("ABCD", "ABXD") = 3 -> 2 * 3 / 8
        assert_eq!(ratio("ABCD", "ABXD"), 75.0);
    }

    #[test]
    fn partial_ratio_finds_embedded_substring() {
        assert_eq!(partial_ratio("118I", "BMW 118I M SPORT"), 100.0);
        assert_eq!(partial_ratio("BMW 118I M SPORT", "118I"), 100.0);
        assert!(partial_ratio("118X", "BMW 118I M SPORT") >= 75.0);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(partial_ratio("", "anything"), 0.0);
        assert_eq!(ratio("", "anything"), 0.0);
    }
}
