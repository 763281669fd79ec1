//! Consistency checks for current-transformer ratios
//!
//! Infotécnica publishes every available ratio of a transformer as free text
//! (`"600-1200/5 A"`) next to the selected primary tap in kA. The selected
//! ratio is trusted only when the tap shows up inside that text; otherwise the
//! previous study's ratio is kept if it is still among the published ones.

use super::numeric::{all_numbers, first_number, parse_decimal};
use super::units::tap_ka_to_amps;

/// Outcome of checking the selected tap against the published ratios
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TapCheck {
    /// Selected primary tap in amperes
    pub tap_amps: Option<i64>,
    /// Whether the tap occurs inside the published ratio text
    pub consistent: bool,
    /// `"{tap}/{secondary}"` when consistent and a secondary current exists
    pub ratio: Option<String>,
}

/// Check the selected primary tap (kA, decimal comma allowed) against the
/// published ratio text.
pub fn check_tap(published: Option<&str>, tap_ka: Option<&str>) -> TapCheck {
    let tap_amps = tap_ka.and_then(parse_decimal).map(tap_ka_to_amps);
    let consistent = match (tap_amps, published) {
        (Some(tap), Some(text)) => text.contains(&tap.to_string()),
        _ => false,
    };
    let ratio = match (consistent, tap_amps, published.and_then(secondary_current)) {
        (true, Some(tap), Some(secondary)) => Some(format!("{}/{}", tap, secondary)),
        _ => None,
    };
    TapCheck {
        tap_amps,
        consistent,
        ratio,
    }
}

/// First number after the first `/` of the published ratio text
fn secondary_current(published: &str) -> Option<String> {
    let (_, rest) = published.split_once('/')?;
    first_number(&rest.replace(',', ".")).map(str::to_string)
}

/// Split a `"primary/secondary"` ratio into its two halves
pub fn ratio_halves(ratio: &str) -> (Option<&str>, Option<&str>) {
    let mut parts = ratio.split('/');
    (parts.next(), parts.next())
}

/// Whether both halves of a previous ratio are among the published numbers
pub fn previous_consistent(published: Option<&str>, previous: Option<&str>) -> bool {
    let (Some(published), Some(previous)) = (published, previous) else {
        return false;
    };
    let numbers = all_numbers(published);
    match ratio_halves(previous) {
        (Some(primary), Some(secondary)) => {
            numbers.contains(&primary.trim()) && numbers.contains(&secondary.trim())
        }
        _ => false,
    }
}

/// Pick the ratio to report.
///
/// 1. No published data: keep the previous study's ratio.
/// 2. Selected tap consistent: use the ratio built from the tap.
/// 3. Previous ratio still published: keep it.
/// 4. Otherwise leave it empty for manual review.
pub fn resolve_ratio(
    published: Option<&str>,
    tap: &TapCheck,
    previous: Option<&str>,
) -> Option<String> {
    if published.is_none() {
        return previous.map(str::to_string);
    }
    if tap.consistent {
        return tap.ratio.clone();
    }
    if previous_consistent(published, previous) {
        return previous.map(str::to_string);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tap_consistent() {
        let check = check_tap(Some("600-1200/5-5 A"), Some("0,6"));
        assert_eq!(check.tap_amps, Some(600));
        assert!(check.consistent);
        assert_eq!(check.ratio.as_deref(), Some("600/5"));
    }

    #[test]
    fn test_check_tap_inconsistent() {
        let check = check_tap(Some("600-1200/5 A"), Some("0,8"));
        assert_eq!(check.tap_amps, Some(800));
        assert!(!check.consistent);
        assert_eq!(check.ratio, None);
    }

    #[test]
    fn test_check_tap_missing_inputs() {
        assert!(!check_tap(None, Some("0,6")).consistent);
        let no_tap = check_tap(Some("600/5"), Some("s/i"));
        assert_eq!(no_tap.tap_amps, None);
        assert!(!no_tap.consistent);
    }

    #[test]
    fn test_check_tap_without_secondary() {
        let check = check_tap(Some("600 A"), Some("0.6"));
        assert!(check.consistent);
        assert_eq!(check.ratio, None);
    }

    #[test]
    fn test_previous_consistent_uses_number_tokens() {
        assert!(previous_consistent(Some("600-1200/5 A"), Some("1200/5")));
        assert!(!previous_consistent(Some("600-1200/5 A"), Some("2000/5")));
        // "20" is a substring of "200" but not one of its numbers
        assert!(!previous_consistent(Some("200/1 A"), Some("20/1")));
        assert!(!previous_consistent(Some("600/5"), Some("600")));
        assert!(!previous_consistent(None, Some("600/5")));
    }

    #[test]
    fn test_resolve_order() {
        let published = Some("600-1200/5 A");

        // no published data falls back to the previous study
        let none = check_tap(None, None);
        assert_eq!(resolve_ratio(None, &none, Some("800/5")).as_deref(), Some("800/5"));

        // consistent tap wins over the previous ratio
        let good = check_tap(published, Some("1,2"));
        assert_eq!(
            resolve_ratio(published, &good, Some("600/5")).as_deref(),
            Some("1200/5")
        );

        // inconsistent tap, previous ratio still published
        let bad = check_tap(published, Some("0,8"));
        assert_eq!(
            resolve_ratio(published, &bad, Some("600/5")).as_deref(),
            Some("600/5")
        );

        // neither: left for manual review
        assert_eq!(resolve_ratio(published, &bad, Some("2000/1")), None);
        assert_eq!(resolve_ratio(published, &bad, None), None);
    }
}
