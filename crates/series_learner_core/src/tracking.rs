//! crates/series_learner_core/src/tracking.rs
//!
//! Minutes resolution for new watch logs and the per-title aggregate
//! recalculation. Both are pure; the lifecycle operations in `service` persist
//! their results.

use crate::domain::{UnitMinutesBounds, WatchLog};
use crate::ports::{PortError, PortResult};

/// Running totals stored on a title, derived from its complete log set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TitleAggregates {
    pub total_units: i64,
    pub total_minutes: i64,
    pub default_unit_minutes: Option<i64>,
}

/// Picks the minutes-per-unit for a new log entry.
///
/// An explicit value wins over the fallback (the title's last-used value).
/// Values arrive as raw numbers so that fractional input can be rejected here
/// rather than silently truncated.
pub fn resolve_unit_minutes(
    explicit: Option<f64>,
    fallback: Option<i64>,
    bounds: UnitMinutesBounds,
) -> PortResult<i64> {
    let minutes = match (explicit, fallback) {
        (Some(explicit), _) => explicit,
        (None, Some(fallback)) => fallback as f64,
        (None, None) => {
            return Err(PortError::Validation(
                "Unit minutes are required for the first entry.".to_string(),
            ))
        }
    };

    let minutes = whole_number(minutes)
        .ok_or_else(|| PortError::Validation("Unit minutes must be an integer.".to_string()))?;

    if !bounds.contains(minutes) {
        return Err(PortError::Validation(format!(
            "Unit minutes must be between {} and {}.",
            bounds.min, bounds.max
        )));
    }

    Ok(minutes)
}

/// Checks the units of a new log: a whole number of at least one.
pub fn validate_units(units: f64) -> PortResult<i64> {
    match whole_number(units) {
        Some(units) if units >= 1 => Ok(units),
        _ => Err(PortError::Validation(
            "Units must be an integer greater than 0.".to_string(),
        )),
    }
}

/// Recomputes a title's aggregates from every log that references it.
///
/// The default minutes come from the latest log by `logged_at`; when two logs
/// share a `logged_at`, the one inserted last wins. Totals that do not fit in
/// an `i64` are a validation error.
pub fn recalculate_title_aggregates(logs: &[WatchLog]) -> PortResult<TitleAggregates> {
    let total_units = checked_total(logs.iter().map(|log| log.units))?;
    let total_minutes = checked_total(logs.iter().map(|log| log.total_minutes))?;

    let latest = logs
        .iter()
        .max_by_key(|log| (log.logged_at, log.insertion_order));

    Ok(TitleAggregates {
        total_units,
        total_minutes,
        default_unit_minutes: latest.map(|log| log.unit_minutes),
    })
}

fn checked_total(mut values: impl Iterator<Item = i64>) -> PortResult<i64> {
    values
        .try_fold(0i64, i64::checked_add)
        .ok_or_else(|| PortError::Validation("Title totals are too large to record.".to_string()))
}

/// Converts a finite, integral `f64` into an `i64`.
pub(crate) fn whole_number(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OwnerKey;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn log(units: i64, unit_minutes: i64, logged_at: i64, insertion_order: i64) -> WatchLog {
        WatchLog {
            id: Uuid::new_v4(),
            owner_key: OwnerKey::default(),
            title_id: Uuid::nil(),
            units,
            unit_minutes,
            total_minutes: units * unit_minutes,
            logged_at: at(logged_at),
            created_at: at(logged_at),
            insertion_order,
        }
    }

    #[test]
    fn test_resolve_requires_minutes_on_first_log() {
        let err = resolve_unit_minutes(None, None, UnitMinutesBounds::default()).unwrap_err();
        assert!(matches!(err, PortError::Validation(ref m) if m.contains("required")));
    }

    #[test]
    fn test_resolve_uses_fallback_then_explicit() {
        let bounds = UnitMinutesBounds::default();
        assert_eq!(resolve_unit_minutes(None, Some(30), bounds), Ok(30));
        assert_eq!(resolve_unit_minutes(Some(45.0), Some(30), bounds), Ok(45));
        assert_eq!(resolve_unit_minutes(Some(45.0), None, bounds), Ok(45));
    }

    #[test]
    fn test_resolve_rejects_fractional_minutes() {
        let err = resolve_unit_minutes(Some(22.5), Some(30), UnitMinutesBounds::default())
            .unwrap_err();
        assert_eq!(
            err,
            PortError::Validation("Unit minutes must be an integer.".to_string())
        );
        assert!(resolve_unit_minutes(Some(f64::NAN), None, UnitMinutesBounds::default()).is_err());
    }

    #[test]
    fn test_resolve_enforces_bounds() {
        let bounds = UnitMinutesBounds::default();
        assert_eq!(resolve_unit_minutes(Some(1.0), None, bounds), Ok(1));
        assert_eq!(resolve_unit_minutes(Some(400.0), None, bounds), Ok(400));

        for minutes in [0.0, 401.0, -5.0] {
            let err = resolve_unit_minutes(Some(minutes), None, bounds).unwrap_err();
            assert_eq!(
                err,
                PortError::Validation("Unit minutes must be between 1 and 400.".to_string())
            );
        }
        // A stale fallback outside the bounds is rejected as well.
        assert!(resolve_unit_minutes(None, Some(0), bounds).is_err());
    }

    #[test]
    fn test_resolve_with_custom_bounds() {
        let bounds = UnitMinutesBounds { min: 5, max: 10 };
        assert_eq!(resolve_unit_minutes(Some(5.0), None, bounds), Ok(5));
        assert!(resolve_unit_minutes(Some(4.0), None, bounds).is_err());
        assert!(resolve_unit_minutes(Some(11.0), None, bounds).is_err());
    }

    #[test]
    fn test_validate_units() {
        assert_eq!(validate_units(3.0), Ok(3));
        assert!(validate_units(0.0).is_err());
        assert!(validate_units(-1.0).is_err());
        assert!(validate_units(1.5).is_err());
        assert!(validate_units(f64::INFINITY).is_err());
    }

    #[test]
    fn test_recalculate_empty_log_set() {
        assert_eq!(recalculate_title_aggregates(&[]), Ok(TitleAggregates::default()));
    }

    #[test]
    fn test_recalculate_sums_and_picks_latest_logged() {
        let logs = vec![log(2, 45, 100, 1), log(1, 24, 300, 2), log(3, 50, 200, 3)];

        let aggregates = recalculate_title_aggregates(&logs).unwrap();

        assert_eq!(aggregates.total_units, 6);
        assert_eq!(aggregates.total_minutes, 90 + 24 + 150);
        assert_eq!(aggregates.default_unit_minutes, Some(24));
    }

    #[test]
    fn test_recalculate_breaks_ties_by_insertion_order() {
        let logs = vec![log(1, 20, 100, 7), log(1, 35, 100, 9), log(1, 50, 100, 8)];

        assert_eq!(
            recalculate_title_aggregates(&logs).unwrap().default_unit_minutes,
            Some(35)
        );
    }

    #[test]
    fn test_recalculate_rejects_overflowing_totals() {
        let huge = i64::MAX / 2 + 1;
        let logs = vec![log(huge, 1, 100, 1), log(huge, 1, 200, 2)];

        let err = recalculate_title_aggregates(&logs).unwrap_err();
        assert!(matches!(err, PortError::Validation(ref m) if m.contains("too large")));
    }

    proptest! {
        #[test]
        fn prop_recalculation_is_idempotent(
            entries in prop::collection::vec((1i64..10, 1i64..400, 0i64..50), 0..20)
        ) {
            let logs: Vec<WatchLog> = entries
                .iter()
                .enumerate()
                .map(|(i, (units, minutes, logged_at))| log(*units, *minutes, *logged_at, i as i64))
                .collect();

            let first = recalculate_title_aggregates(&logs);
            let second = recalculate_title_aggregates(&logs);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_recalculation_ignores_log_order(
            entries in prop::collection::vec((1i64..10, 1i64..400, 0i64..50), 1..20)
        ) {
            let logs: Vec<WatchLog> = entries
                .iter()
                .enumerate()
                .map(|(i, (units, minutes, logged_at))| log(*units, *minutes, *logged_at, i as i64))
                .collect();
            let mut reversed = logs.clone();
            reversed.reverse();

            prop_assert_eq!(
                recalculate_title_aggregates(&logs),
                recalculate_title_aggregates(&reversed)
            );
        }

        #[test]
        fn prop_totals_match_surviving_logs(
            entries in prop::collection::vec((1i64..10, 1i64..400, 0i64..50, any::<bool>()), 0..20)
        ) {
            let surviving: Vec<WatchLog> = entries
                .iter()
                .enumerate()
                .filter(|(_, (_, _, _, removed))| !removed)
                .map(|(i, (units, minutes, logged_at, _))| log(*units, *minutes, *logged_at, i as i64))
                .collect();

            let aggregates = recalculate_title_aggregates(&surviving).unwrap();
            let expected: i64 = surviving.iter().map(|l| l.units * l.unit_minutes).sum();
            prop_assert_eq!(aggregates.total_minutes, expected);
            prop_assert_eq!(aggregates.default_unit_minutes.is_none(), surviving.is_empty());
        }
    }
}
