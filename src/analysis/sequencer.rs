//! Timeframe sequencing
//!
//! Callers supply charts in arbitrary order; the cascade needs them
//! coarsest-first so every step can lean on the context accumulated above
//! it. Intervals are semantic duration strings ("1D", "4h", "15m").

use crate::cascade::CascadeError;

use super::TimeframeInput;

/// Resolve a semantic interval string to a duration in minutes.
///
/// Grammar: optional numeric count followed by one unit character.
/// Units: m(inute), h(our), d(ay), w(eek) case-insensitive, and uppercase
/// `M` for month (lowercase `m` already means minute). A bare unit means
/// a count of 1.
pub fn interval_minutes(interval: &str) -> Result<u64, CascadeError> {
    let s = interval.trim();
    let invalid = || CascadeError::InvalidInterval {
        interval: interval.to_string(),
    };

    let (count_str, unit) = match s.char_indices().last() {
        Some((idx, c)) if c.is_alphabetic() => (&s[..idx], c),
        _ => return Err(invalid()),
    };

    let count: u64 = if count_str.is_empty() {
        1
    } else {
        count_str.parse().map_err(|_| invalid())?
    };
    if count == 0 {
        return Err(invalid());
    }

    let unit_minutes = match unit {
        'm' => 1,
        'h' | 'H' => 60,
        'd' | 'D' => 60 * 24,
        'w' | 'W' => 60 * 24 * 7,
        // month, approximated; only relative order matters here
        'M' => 60 * 24 * 30,
        _ => return Err(invalid()),
    };

    Ok(count * unit_minutes)
}

/// Sort timeframe inputs from coarsest to finest resolution.
///
/// Position 0 is the highest timeframe. Inputs resolving to the same
/// duration keep their original relative order. Fails before any network
/// work: fewer than two timeframes give the cascade no context to
/// propagate.
pub fn sequence_timeframes(
    inputs: Vec<TimeframeInput>,
) -> Result<Vec<TimeframeInput>, CascadeError> {
    if inputs.len() < 2 {
        return Err(CascadeError::InsufficientTimeframes {
            supplied: inputs.len(),
        });
    }

    let mut keyed: Vec<(u64, TimeframeInput)> = inputs
        .into_iter()
        .map(|input| Ok((interval_minutes(&input.interval)?, input)))
        .collect::<Result<_, CascadeError>>()?;

    // stable: equal durations preserve caller order
    keyed.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(keyed.into_iter().map(|(_, input)| input).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(interval: &str) -> TimeframeInput {
        TimeframeInput {
            chart_ref: format!("https://charts.test/{interval}.png"),
            interval: interval.to_string(),
            role: None,
        }
    }

    #[test]
    fn test_interval_minutes() {
        assert_eq!(interval_minutes("15m").expect("15m"), 15);
        assert_eq!(interval_minutes("4h").expect("4h"), 240);
        assert_eq!(interval_minutes("1D").expect("1D"), 1440);
        assert_eq!(interval_minutes("1d").expect("1d"), 1440);
        assert_eq!(interval_minutes("1w").expect("1w"), 10080);
        assert_eq!(interval_minutes("1M").expect("1M"), 43200);
        // bare unit defaults to a count of one
        assert_eq!(interval_minutes("h").expect("h"), 60);
    }

    #[test]
    fn test_month_is_not_minute() {
        assert!(interval_minutes("3M").expect("3M") > interval_minutes("3m").expect("3m"));
    }

    #[test]
    fn test_invalid_intervals() {
        for bad in ["", "15", "0m", "4x", "h4", "-1h", "4.5h"] {
            assert!(
                interval_minutes(bad).is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_sequence_coarsest_first() {
        let ordered = sequence_timeframes(vec![input("15m"), input("1D"), input("4h")])
            .expect("sequence");
        let intervals: Vec<&str> = ordered.iter().map(|i| i.interval.as_str()).collect();
        assert_eq!(intervals, vec!["1D", "4h", "15m"]);
    }

    #[test]
    fn test_sequence_is_stable_for_equal_durations() {
        let mut a = input("60m");
        a.role = Some("first".to_string());
        let mut b = input("1h");
        b.role = Some("second".to_string());

        let ordered = sequence_timeframes(vec![input("1D"), a, b]).expect("sequence");
        assert_eq!(ordered[1].role.as_deref(), Some("first"));
        assert_eq!(ordered[2].role.as_deref(), Some("second"));
    }

    #[test]
    fn test_too_few_timeframes_rejected() {
        let err = sequence_timeframes(vec![input("1D")]).expect_err("single timeframe");
        assert!(matches!(
            err,
            CascadeError::InsufficientTimeframes { supplied: 1 }
        ));

        let err = sequence_timeframes(vec![]).expect_err("empty");
        assert!(matches!(
            err,
            CascadeError::InsufficientTimeframes { supplied: 0 }
        ));
    }
}
