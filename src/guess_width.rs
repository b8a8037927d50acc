//! Column position guessing for fixed-width output (`ps`, `df`, ...).
//!
//! Scans a sample of on-screen lines for columns that are blank on every
//! line; a blank run at least `min_run` wide is taken as a field separator,
//! and the position after it becomes a column start.

/// Guess column start positions from sample lines. `header` rows at the
/// top of the sample are skipped (they often carry ragged titles). Returns
/// an empty vector when no consistent boundaries exist.
pub fn positions(lines: &[String], header: usize, min_run: usize) -> Vec<usize> {
    let sample: Vec<Vec<char>> = lines
        .iter()
        .skip(header)
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.chars().collect())
        .collect();
    if sample.len() < 2 {
        return Vec::new();
    }

    let width = sample.iter().map(|r| r.len()).max().unwrap_or(0);
    if width == 0 {
        return Vec::new();
    }

    // A column is blank when every sampled line is a space there or ends
    // before it.
    let mut blank = vec![true; width];
    for row in &sample {
        for (c, &ch) in row.iter().enumerate() {
            if ch != ' ' {
                blank[c] = false;
            }
        }
    }

    let min_run = min_run.max(1);
    let mut result = Vec::new();
    let mut run_start: Option<usize> = None;
    for (c, &is_blank) in blank.iter().enumerate() {
        if is_blank {
            run_start.get_or_insert(c);
        } else if let Some(start) = run_start.take() {
            // Leading indentation is not a separator.
            if start > 0 && c - start >= min_run {
                result.push(c);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(rows: &[&str]) -> Vec<String> {
        rows.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_columns() {
        let sample = lines(&[
            "alpha    100",
            "beta     20",
            "gamma    3",
        ]);
        assert_eq!(positions(&sample, 0, 2), vec![9]);
    }

    #[test]
    fn test_three_columns_with_header_skip() {
        let sample = lines(&[
            "NAME  SIZE USED",
            "a     10   1",
            "bb    200  22",
            "ccc   3    333",
        ]);
        let widths = positions(&sample, 1, 2);
        assert_eq!(widths, vec![6, 11]);
    }

    #[test]
    fn test_no_boundaries_in_prose() {
        let sample = lines(&[
            "the quick brown fox",
            "jumps over a lazy dog",
        ]);
        assert!(positions(&sample, 0, 2).is_empty());
    }

    #[test]
    fn test_too_few_lines() {
        let sample = lines(&["only one"]);
        assert!(positions(&sample, 0, 2).is_empty());
    }

    #[test]
    fn test_leading_indent_not_a_separator() {
        let sample = lines(&[
            "   a  1",
            "   b  2",
        ]);
        assert_eq!(positions(&sample, 0, 2), vec![6]);
    }
}
