//! # Quantity Parser
//!
//! Parses the free-form quantity token of an ingredient row into a number.
//!
//! ## Features
//!
//! - Plain integers and decimals ("2", "0.5", "1.5")
//! - Slash fractions with any numerator/denominator ("1/2", "3/8")
//! - Vulgar fraction glyphs (½, ⅓, ⅔, ¼, ¾)
//! - Mixed numbers ("1 1/2", "2 ¾")
//! - Leading-number fallback for tokens that still carry a unit ("2 cups")
//!
//! Qualitative amounts ("to taste", "pinch", ...) and anything unreadable
//! parse to `None`. The parser never fails in any other way.
//!
//! ## Usage
//!
//! ```rust
//! use grocery_planner::quantity_parser::parse_quantity;
//!
//! assert_eq!(parse_quantity("1 1/2"), Some(1.5));
//! assert_eq!(parse_quantity("to taste"), None);
//! ```

use lazy_static::lazy_static;
use regex::Regex;

/// Quantity strings that carry no numeric amount
pub const QUALITATIVE_QUANTITIES: [&str; 8] = [
    "to taste", "pinch", "pinches", "some", "a little", "a bit", "dash", "optional",
];

/// Vulgar fraction glyphs and their values
const FRACTION_GLYPHS: [(char, f64); 5] = [
    ('½', 1.0 / 2.0),
    ('⅓', 1.0 / 3.0),
    ('⅔', 2.0 / 3.0),
    ('¼', 1.0 / 4.0),
    ('¾', 3.0 / 4.0),
];

/// Compiled regex patterns for quantity tokens
struct QuantityPatterns {
    /// Matches plain numbers: "2", "1.5", ".5", "2."
    decimal: Regex,
    /// Matches slash fractions: "1/2", "10/3"
    fraction: Regex,
    /// Matches the longest numeric-looking prefix
    numeric_prefix: Regex,
}

lazy_static! {
    static ref PATTERNS: QuantityPatterns = QuantityPatterns {
        decimal: Regex::new(r"^(?:\d+\.?\d*|\.\d+)$").expect("Decimal pattern should be valid"),
        fraction: Regex::new(r"^(\d+)/(\d+)$").expect("Fraction pattern should be valid"),
        numeric_prefix: Regex::new(r"^[\d./\s½⅓⅔¼¾]+")
            .expect("Prefix pattern should be valid"),
    };
}

/// Check whether a quantity string is one of the qualitative phrases
pub fn is_qualitative(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    QUALITATIVE_QUANTITIES.contains(&lowered.as_str())
}

/// Parse a quantity string into a number.
///
/// Returns `None` for blank input, qualitative phrases and unreadable text.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() || QUALITATIVE_QUANTITIES.contains(&s.as_str()) {
        return None;
    }

    if let Some(value) = parse_exact(&s) {
        return Some(value);
    }

    // "2 cups" and similar: retry on the leading numeric part only
    let prefix = PATTERNS.numeric_prefix.find(&s)?.as_str().trim();
    if prefix.is_empty() || prefix == s {
        return None;
    }
    parse_exact(prefix)
}

/// Parse one of the exact forms: mixed number, glyph, slash fraction or decimal
fn parse_exact(s: &str) -> Option<f64> {
    if let Some(value) = parse_mixed(s) {
        return Some(value);
    }

    if let Some(value) = parse_glyph(s) {
        return Some(value);
    }

    if let Some(captures) = PATTERNS.fraction.captures(s) {
        let numerator: f64 = captures[1].parse().ok()?;
        let denominator: f64 = captures[2].parse().ok()?;
        if denominator == 0.0 {
            return None;
        }
        return Some(numerator / denominator);
    }

    if PATTERNS.decimal.is_match(s) {
        return s.parse::<f64>().ok();
    }

    None
}

/// "<integer> <fraction>" where the fraction lies strictly between 0 and 1
fn parse_mixed(s: &str) -> Option<f64> {
    let mut parts = s.split_whitespace();
    let (whole, fraction) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: f64 = whole.parse().ok()?;
    let fraction = parse_glyph(fraction).or_else(|| {
        let captures = PATTERNS.fraction.captures(fraction)?;
        let numerator: f64 = captures[1].parse().ok()?;
        let denominator: f64 = captures[2].parse().ok()?;
        (denominator != 0.0).then(|| numerator / denominator)
    })?;

    (fraction > 0.0 && fraction < 1.0).then(|| whole + fraction)
}

fn parse_glyph(s: &str) -> Option<f64> {
    let mut chars = s.chars();
    let glyph = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    FRACTION_GLYPHS
        .iter()
        .find(|(g, _)| *g == glyph)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(value: Option<f64>, expected: f64) -> bool {
        value.is_some_and(|v| (v - expected).abs() < 1e-4)
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_quantity("2"), Some(2.0));
        assert_eq!(parse_quantity("0.5"), Some(0.5));
        assert_eq!(parse_quantity(" 1.5 "), Some(1.5));
        assert_eq!(parse_quantity(".25"), Some(0.25));
    }

    #[test]
    fn test_fractions() {
        assert_eq!(parse_quantity("1/2"), Some(0.5));
        assert!(approx(parse_quantity("2/3"), 0.6667));
        assert_eq!(parse_quantity("3/8"), Some(0.375));
        assert_eq!(parse_quantity("½"), Some(0.5));
        assert_eq!(parse_quantity("¾"), Some(0.75));
        assert!(approx(parse_quantity("⅓"), 0.3333));
    }

    #[test]
    fn test_zero_denominator_is_absent() {
        assert_eq!(parse_quantity("1/0"), None);
    }

    #[test]
    fn test_oversized_integers() {
        assert_eq!(parse_quantity("100000000000000000000/2"), Some(5e19));
        assert_eq!(parse_quantity("100000000000000000000 1/2"), Some(1e20 + 0.5));
    }

    #[test]
    fn test_mixed_numbers() {
        assert_eq!(parse_quantity("1 1/2"), Some(1.5));
        assert_eq!(parse_quantity("2 ¼"), Some(2.25));
        // Improper fractional part is not a mixed number
        assert_eq!(parse_quantity("1 3/2"), None);
    }

    #[test]
    fn test_qualitative() {
        assert_eq!(parse_quantity("to taste"), None);
        assert_eq!(parse_quantity("  Pinch "), None);
        assert_eq!(parse_quantity("A little"), None);
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("   "), None);
        assert!(is_qualitative("DASH"));
        assert!(!is_qualitative("2"));
    }

    #[test]
    fn test_prefix_fallback() {
        assert_eq!(parse_quantity("2 cups"), Some(2.0));
        assert_eq!(parse_quantity("1 1/2 cups"), Some(1.5));
        assert_eq!(parse_quantity("½ cup"), Some(0.5));
        assert_eq!(parse_quantity("a handful"), None);
        assert_eq!(parse_quantity("inf"), None);
    }
}
