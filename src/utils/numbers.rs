use crate::types::Number;
use regex::Regex;
use std::sync::OnceLock;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(-*\d+\.\d+|-*\d+)").expect("number pattern is valid"))
}

/// All numeric tokens in `text`, in order.
///
/// Tokens are typed together: integers when every token parses as one, floats when every
/// token parses as a float, nothing otherwise.
pub fn extract_numbers(text: &str) -> Vec<Number> {
    let tokens: Vec<&str> = number_pattern()
        .find_iter(text)
        .map(|m| m.as_str())
        .collect();

    let ints: Option<Vec<i64>> = tokens.iter().map(|t| t.parse::<i64>().ok()).collect();
    if let Some(ints) = ints {
        return ints.into_iter().map(Number::Int).collect();
    }
    let floats: Option<Vec<f64>> = tokens.iter().map(|t| t.parse::<f64>().ok()).collect();
    floats
        .map(|floats| floats.into_iter().map(Number::Float).collect())
        .unwrap_or_default()
}

/// The `index`-th numeric token of `text`. "1.2.3" yields 1.2.
pub fn extract_number(text: &str, index: usize) -> Option<Number> {
    extract_numbers(text).get(index).copied()
}

pub fn extract_int(text: &str, index: usize) -> Option<i64> {
    number_pattern()
        .find_iter(text)
        .nth(index)
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

pub fn extract_float(text: &str, index: usize) -> Option<f64> {
    number_pattern()
        .find_iter(text)
        .nth(index)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_token_wins() {
        assert_eq!(extract_number("Total: 42 items", 0), Some(Number::Int(42)));
        assert_eq!(extract_number("Price $3.50 (was 4)", 0), Some(Number::Float(3.5)));
        assert_eq!(extract_number("Price $3.50 (was 4)", 1), Some(Number::Float(4.0)));
        assert_eq!(extract_number("1.2.3", 0), Some(Number::Float(1.2)));
    }

    #[test]
    fn test_negative_and_missing() {
        assert_eq!(extract_number("delta -7", 0), Some(Number::Int(-7)));
        assert_eq!(extract_number("no digits here", 0), None);
        assert_eq!(extract_number("only 1", 3), None);
        assert!(extract_numbers("--5").is_empty());
    }

    #[test]
    fn test_int_and_float_helpers() {
        assert_eq!(extract_int("3 of 10", 1), Some(10));
        assert_eq!(extract_int("3.5", 0), None);
        assert_eq!(extract_float("3.5 and 2", 1), Some(2.0));
    }
}
