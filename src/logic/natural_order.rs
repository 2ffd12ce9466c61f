use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

/// Splits a string into maximal runs of ASCII digits and non-digits.
struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits { Run::Digits(run) } else { Run::Text(run) })
    }
}

fn runs(s: &str) -> Runs<'_> {
    Runs { rest: s }
}

/// Compares two digit runs by numeric value without parsing, so arbitrarily
/// long runs cannot overflow.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural ordering of resource identifiers: digit runs compare by value
/// ("2" < "10"), other runs lexically, digit runs sort before text runs, and
/// remaining ties fall back to plain string order so the result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Run::Digits(x)), Some(Run::Digits(y))) => compare_digits(x, y),
            (Some(Run::Text(x)), Some(Run::Text(y))) => x.cmp(y),
            (Some(Run::Digits(_)), Some(Run::Text(_))) => Ordering::Less,
            (Some(Run::Text(_)), Some(Run::Digits(_))) => Ordering::Greater,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.cmp(b)
}

/// Sorts in place by [`natural_cmp`] over the extracted key.
pub fn sort_naturally_by_key<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| natural_cmp(key(a), key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(input: &[&str]) -> Vec<String> {
        let mut items: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        sort_naturally_by_key(&mut items, |s| s.as_str());
        items
    }

    #[test]
    fn test_numeric_runs_compare_by_value() {
        assert_eq!(sorted(&["10", "2", "1"]), vec!["1", "2", "10"]);
        assert_eq!(
            sorted(&["cpu10", "cpu2", "cpu1", "cpu0"]),
            vec!["cpu0", "cpu1", "cpu2", "cpu10"]
        );
    }

    #[test]
    fn test_mixed_runs() {
        assert_eq!(
            sorted(&["dimm1_b10", "dimm1_b2", "dimm10_a1", "dimm2_a1"]),
            vec!["dimm1_b2", "dimm1_b10", "dimm2_a1", "dimm10_a1"]
        );
        assert_eq!(natural_cmp("core", "core0"), Ordering::Less);
        assert_eq!(natural_cmp("0a", "a0"), Ordering::Less);
    }

    #[test]
    fn test_leading_zeros_tie_break_on_raw_string() {
        assert_eq!(natural_cmp("cpu01", "cpu1"), Ordering::Less);
        assert_eq!(natural_cmp("cpu1", "cpu01"), Ordering::Greater);
        assert_eq!(natural_cmp("cpu1", "cpu1"), Ordering::Equal);
    }

    #[test]
    fn test_long_digit_runs_do_not_overflow() {
        let big = "drive123456789012345678901234567890";
        let bigger = "drive923456789012345678901234567890";
        assert_eq!(natural_cmp(big, bigger), Ordering::Less);
        assert_eq!(natural_cmp("drive99999999999999999999", "drive100000000000000000000"), Ordering::Less);
    }

    #[test]
    fn test_result_is_independent_of_input_order() {
        let expected = sorted(&["b2", "a10", "a2", "b10", "a", "10", "9"]);
        let reversed = sorted(&["9", "10", "a", "b10", "a2", "a10", "b2"]);
        let rotated = sorted(&["a2", "b10", "a", "10", "9", "b2", "a10"]);
        assert_eq!(expected, reversed);
        assert_eq!(expected, rotated);
        assert_eq!(expected, vec!["9", "10", "a", "a2", "a10", "b2", "b10"]);
    }
}
