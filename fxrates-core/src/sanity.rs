//! Import sanity checks: guard against a provider payload that parses fine
//! but is suspiciously sparse, which upstream outages tend to produce
//! (truncated responses, partial backfills).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::FxError;

/// Estimated per-observation JSON overhead (field names, braces, comma):
/// `{"date":"","value":""}`, excluding the digits of the date/value
/// themselves, which are added per observation.
const PER_OBSERVATION_OVERHEAD_BYTES: u64 = 24;

/// Estimate the wire size of a batch of observations without holding onto
/// the provider's raw response bytes: `ProviderAdapter` hands `ImportEngine`
/// a parsed `{date -> rate}` map, not bytes, so this reconstructs a
/// reasonable lower bound from the parsed values.
#[must_use]
pub fn estimate_payload_bytes(observations: &BTreeMap<NaiveDate, Decimal>) -> u64 {
    observations
        .iter()
        .map(|(date, rate)| {
            date.to_string().len() as u64
                + rate.to_string().len() as u64
                + PER_OBSERVATION_OVERHEAD_BYTES
        })
        .sum()
}

/// Reject an incremental import whose payload is implausibly large given how
/// far behind the series was: protects against a provider accidentally
/// returning full history on what was requested as an incremental fetch.
/// Two independent caps, either one tripping fails the import: an absolute
/// ceiling, and a ceiling proportional to the number of days actually
/// spanned since the series' last stored date.
///
/// # Errors
/// Returns [`FxError::ImportSanityFailed`] if `estimated_bytes` exceeds
/// either cap.
pub fn check_payload_size(
    estimated_bytes: u64,
    days_since_start: i64,
    absolute_cap_bytes: u64,
    expected_bytes_per_day: f64,
    tolerance: f64,
) -> Result<(), FxError> {
    if estimated_bytes > absolute_cap_bytes {
        return Err(FxError::ImportSanityFailed(format!(
            "payload estimated at {estimated_bytes} bytes exceeds the absolute cap of \
             {absolute_cap_bytes} bytes"
        )));
    }
    let proportional_cap =
        (expected_bytes_per_day * days_since_start.max(0) as f64 * tolerance).round() as u64;
    if estimated_bytes > proportional_cap {
        return Err(FxError::ImportSanityFailed(format!(
            "payload estimated at {estimated_bytes} bytes exceeds the proportional cap of \
             {proportional_cap} bytes over {days_since_start} day(s) since the last stored rate"
        )));
    }
    Ok(())
}

/// Number of weekdays (Mon-Fri) in `[start, end]`, inclusive.
#[must_use]
pub fn count_weekdays(start: NaiveDate, end: NaiveDate) -> i64 {
    if start > end {
        return 0;
    }
    let days = (end - start).num_days() + 1;
    let full_weeks = days / 7;
    let mut count = full_weeks * 5;
    let remainder = days % 7;
    let mut d = start + chrono::Duration::days(full_weeks * 7);
    for _ in 0..remainder {
        use chrono::Datelike;
        if !matches!(d.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            count += 1;
        }
        d = d.succ_opt().expect("NaiveDate::succ_opt overflow at chrono::NaiveDate::MAX");
    }
    count
}

/// Reject a batch of observations whose coverage falls far short of the
/// weekday count implied by its own date span. `min_coverage_ratio` is the
/// minimum fraction of expected weekdays that must be present (e.g. `0.5`).
///
/// # Errors
/// Returns [`FxError::ImportSanityFailed`] when coverage is below the
/// configured ratio. A span with zero expected weekdays always passes.
pub fn check_coverage(
    observed_count: usize,
    start: NaiveDate,
    end: NaiveDate,
    min_coverage_ratio: f64,
) -> Result<(), FxError> {
    let expected = count_weekdays(start, end);
    if expected <= 0 {
        return Ok(());
    }
    let ratio = observed_count as f64 / expected as f64;
    if ratio < min_coverage_ratio {
        return Err(FxError::ImportSanityFailed(format!(
            "observed {observed_count} rates over {expected} expected weekdays \
             between {start} and {end} ({ratio:.2} < {min_coverage_ratio:.2} minimum)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_weekdays_across_one_full_week() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(count_weekdays(start, end), 5);
    }

    #[test]
    fn rejects_sparse_coverage() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = check_coverage(3, start, end, 0.5).unwrap_err();
        assert!(matches!(err, FxError::ImportSanityFailed(_)));
    }

    #[test]
    fn accepts_full_coverage() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert!(check_coverage(5, start, end, 0.9).is_ok());
    }

    #[test]
    fn estimates_nonzero_bytes_per_observation() {
        use rust_decimal_macros::dec;
        let mut obs = BTreeMap::new();
        obs.insert(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), dec!(1.0850));
        let bytes = estimate_payload_bytes(&obs);
        assert!(bytes > PER_OBSERVATION_OVERHEAD_BYTES);
    }

    #[test]
    fn accepts_small_incremental_payload() {
        assert!(check_payload_size(120, 1, 300 * 1024, 20.0, 4.0).is_ok());
    }

    #[test]
    fn rejects_payload_over_absolute_cap() {
        let err = check_payload_size(400_000, 30, 300 * 1024, 20.0, 4.0).unwrap_err();
        assert!(matches!(err, FxError::ImportSanityFailed(_)));
    }

    #[test]
    fn rejects_payload_over_proportional_cap_for_short_gap() {
        // One day since start implies a ~80 byte proportional cap (20 * 1 * 4);
        // a payload far larger than that looks like a full-history dump.
        let err = check_payload_size(5_000, 1, 300 * 1024, 20.0, 4.0).unwrap_err();
        assert!(matches!(err, FxError::ImportSanityFailed(_)));
    }
}
