//! Streak detection over an hourly forecast
//!
//! [`scan`] is a single forward pass over the hourly records of one city.
//! Records before `now` are ignored and the pass stops once it moves past
//! `now + max_day_forward` days. Within that horizon it tracks the longest
//! run of consecutive qualifying hours and the first qualifying hour whose
//! date has not been notified yet.
//!
//! Timestamps are local wall-clock times of the forecast's timezone, so
//! `now` must be expressed in that same timezone.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{debug, instrument};

use super::StreakPolicy;
use crate::error::WindRadarError;
use crate::models::{Alert, HourlyForecast, HourlyRecord};
use crate::store::AlertedDaysLedger;

/// Outcome of evaluating one alert against a forecast
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AlertResult {
    pub should_alert: bool,
    /// Local time of the first not-yet-notified qualifying hour
    pub trigger_time: Option<NaiveDateTime>,
    /// Gust at the trigger when the gust threshold was met, else the wind
    pub measured_value: Option<f64>,
    /// Longest run of consecutive qualifying hours inside the horizon
    pub hours_above_threshold: u32,
}

enum Verdict {
    OutsideWindow,
    Below,
    Qualifies { measured: f64 },
}

fn judge(alert: &Alert, time: NaiveDateTime, record: &HourlyRecord) -> Verdict {
    if !alert.hours.contains(time.hour()) {
        return Verdict::OutsideWindow;
    }
    if let Some(window) = &alert.direction {
        match record.wind_direction {
            Some(degrees) if window.contains(degrees) => {}
            _ => return Verdict::OutsideWindow,
        }
    }

    let gust_hit = record.wind_gust.filter(|g| alert.gust_matches(*g));
    let wind_hit = record.wind_speed.filter(|w| alert.wind_matches(*w));
    match (gust_hit, wind_hit) {
        (Some(gust), _) => Verdict::Qualifies { measured: gust },
        (None, Some(wind)) => Verdict::Qualifies { measured: wind },
        (None, None) => Verdict::Below,
    }
}

/// Evaluate `alert` against `records` without touching any state
pub fn scan<I>(
    records: I,
    alert: &Alert,
    now: NaiveDateTime,
    max_day_forward: u32,
    alerted_days: &BTreeSet<NaiveDate>,
    policy: StreakPolicy,
) -> AlertResult
where
    I: IntoIterator<Item = HourlyRecord>,
{
    let cutoff = now + Duration::days(i64::from(max_day_forward));
    let mut result = AlertResult::default();
    let mut streak = 0_u32;

    for record in records {
        let Some(time) = record.time else {
            streak = 0;
            continue;
        };
        if time < now {
            streak = 0;
            continue;
        }
        if time > cutoff {
            break;
        }

        match judge(alert, time, &record) {
            Verdict::Qualifies { measured } => {
                streak += 1;
                result.hours_above_threshold = result.hours_above_threshold.max(streak);

                if result.trigger_time.is_none() && !alerted_days.contains(&time.date()) {
                    result.should_alert = true;
                    result.trigger_time = Some(time);
                    result.measured_value = Some(measured);
                }
            }
            Verdict::OutsideWindow if policy == StreakPolicy::SkipOutsideWindow => {}
            Verdict::OutsideWindow | Verdict::Below => streak = 0,
        }
    }

    result
}

/// Evaluates alerts and records the day each one fires
pub struct AlertEvaluator {
    ledger: Arc<AlertedDaysLedger>,
    max_day_forward: u32,
    policy: StreakPolicy,
}

impl AlertEvaluator {
    #[must_use]
    pub fn new(ledger: Arc<AlertedDaysLedger>, max_day_forward: u32, policy: StreakPolicy) -> Self {
        Self {
            ledger,
            max_day_forward,
            policy,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<AlertedDaysLedger> {
        &self.ledger
    }

    /// Evaluate `alert`, skipping days it was already notified for
    #[instrument(name = "evaluate_alert", skip_all, fields(alert_id = %alert.id))]
    pub async fn evaluate(
        &self,
        alert: &Alert,
        forecast: &HourlyForecast,
        now: NaiveDateTime,
    ) -> Result<AlertResult, WindRadarError> {
        let alerted_days = self.ledger.alerted_days(&alert.id).await;
        let result = scan(
            forecast.records(),
            alert,
            now,
            self.max_day_forward,
            &alerted_days,
            self.policy,
        );
        debug!(
            should_alert = result.should_alert,
            hours = result.hours_above_threshold,
            "Alert evaluated"
        );
        Ok(result)
    }

    /// Mark the trigger date of `result` as notified for `alert`
    pub async fn mark_alerted(&self, alert: &Alert, result: &AlertResult) -> Result<(), WindRadarError> {
        if let Some(trigger) = result.trigger_time {
            self.ledger.record(&alert.id, trigger.date()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertDraft, DirectionWindow, HourWindow, HourlyUnits, parse_local_time};
    use crate::store::Store;
    use chrono::Utc;
    use rstest::rstest;
    use tempfile::TempDir;

    fn at(raw: &str) -> NaiveDateTime {
        parse_local_time(raw).unwrap()
    }

    fn alert(wind_min: f64, gust_min: f64, start_hour: u32, end_hour: u32) -> Alert {
        AlertDraft {
            name: "test".to_string(),
            wind_min,
            gust_min,
            dir_start: None,
            dir_end: None,
            start_hour,
            end_hour,
            city: None,
        }
        .into_alert(Utc::now())
        .unwrap()
    }

    fn record(time: &str, wind: Option<f64>, gust: Option<f64>, dir: Option<f64>) -> HourlyRecord {
        HourlyRecord {
            time: parse_local_time(time),
            wind_speed: wind,
            wind_gust: gust,
            wind_direction: dir,
        }
    }

    /// Hourly records starting at `start`, one per wind value, no gusts
    fn winds(start: &str, values: &[f64]) -> Vec<HourlyRecord> {
        let start = at(start);
        values
            .iter()
            .enumerate()
            .map(|(i, w)| HourlyRecord {
                time: Some(start + Duration::hours(i as i64)),
                wind_speed: Some(*w),
                wind_gust: None,
                wind_direction: Some(200.0),
            })
            .collect()
    }

    fn run(records: Vec<HourlyRecord>, alert: &Alert, now: &str) -> AlertResult {
        scan(
            records,
            alert,
            at(now),
            1,
            &BTreeSet::new(),
            StreakPolicy::ResetOnWindowExit,
        )
    }

    #[rstest]
    #[case(25.0, true)]
    #[case(30.0, true)]
    #[case(24.9, false)]
    fn test_threshold_is_inclusive(#[case] wind: f64, #[case] expected: bool) {
        let alert = alert(25.0, 0.0, 0, 23);
        let records = vec![record("2025-10-02T12:00", Some(wind), None, None)];
        let result = run(records, &alert, "2025-10-02T10:00");
        assert_eq!(result.should_alert, expected);
        assert_eq!(result.hours_above_threshold, u32::from(expected));
    }

    #[test]
    fn test_gust_is_reported_when_gust_threshold_met() {
        let alert = alert(25.0, 40.0, 0, 23);
        let records = vec![
            record("2025-10-02T12:00", Some(30.0), Some(35.0), None),
            record("2025-10-02T13:00", Some(20.0), Some(45.0), None),
        ];
        let result = run(records.clone(), &alert, "2025-10-02T10:00");
        assert_eq!(result.trigger_time, Some(at("2025-10-02T12:00")));
        assert_eq!(result.measured_value, Some(30.0));

        let result = run(records[1..].to_vec(), &alert, "2025-10-02T10:00");
        assert_eq!(result.measured_value, Some(45.0));
    }

    #[rstest]
    #[case("2025-10-02T23:00", true)]
    #[case("2025-10-03T02:00", true)]
    #[case("2025-10-03T12:00", false)]
    fn test_wrapping_hour_window(#[case] time: &str, #[case] expected: bool) {
        let alert = alert(20.0, 0.0, 22, 6);
        let records = vec![record(time, Some(30.0), None, None)];
        assert_eq!(run(records, &alert, "2025-10-02T20:00").should_alert, expected);
    }

    #[rstest]
    #[case(Some(350.0), true)]
    #[case(Some(180.0), false)]
    #[case(None, false)]
    fn test_wrapping_direction_window(#[case] dir: Option<f64>, #[case] expected: bool) {
        let mut alert = alert(20.0, 0.0, 0, 23);
        alert.direction = Some(DirectionWindow::new(300.0, 60.0));
        let records = vec![record("2025-10-02T12:00", Some(30.0), None, dir)];
        assert_eq!(run(records, &alert, "2025-10-02T10:00").should_alert, expected);
    }

    #[test]
    fn test_already_alerted_date_moves_trigger_to_next_day() {
        let alert = alert(20.0, 0.0, 0, 23);
        let records = vec![
            record("2025-10-02T22:00", Some(30.0), None, None),
            record("2025-10-03T01:00", Some(31.0), None, None),
        ];
        let alerted = BTreeSet::from([at("2025-10-02T00:00").date()]);

        let result = scan(
            records,
            &alert,
            at("2025-10-02T21:00"),
            1,
            &alerted,
            StreakPolicy::ResetOnWindowExit,
        );
        assert!(result.should_alert);
        assert_eq!(result.trigger_time, Some(at("2025-10-03T01:00")));
        assert_eq!(result.hours_above_threshold, 2);
    }

    #[test]
    fn test_already_alerted_date_without_other_days() {
        let alert = alert(20.0, 0.0, 0, 23);
        let records = winds("2025-10-02T12:00", &[30.0, 30.0]);
        let alerted = BTreeSet::from([at("2025-10-02T00:00").date()]);

        let result = scan(
            records,
            &alert,
            at("2025-10-02T11:00"),
            1,
            &alerted,
            StreakPolicy::ResetOnWindowExit,
        );
        assert!(!result.should_alert);
        assert!(result.trigger_time.is_none());
        assert_eq!(result.hours_above_threshold, 2);
    }

    #[test]
    fn test_series_entirely_in_the_past() {
        let alert = alert(20.0, 0.0, 0, 23);
        let records = winds("2025-10-01T00:00", &[50.0; 24]);
        let result = run(records, &alert, "2025-10-02T10:00");
        assert_eq!(result, AlertResult::default());
    }

    #[test]
    fn test_records_beyond_horizon_are_ignored() {
        let alert = alert(20.0, 0.0, 0, 23);
        let mut values = vec![0.0; 30];
        values[26] = 40.0;
        let records = winds("2025-10-02T10:00", &values);
        let result = run(records, &alert, "2025-10-02T10:00");
        assert!(!result.should_alert);
        assert_eq!(result.hours_above_threshold, 0);
    }

    #[test]
    fn test_longest_run_is_reported() {
        let alert = alert(20.0, 0.0, 0, 23);
        let records = winds(
            "2025-10-02T10:00",
            &[25.0, 25.0, 10.0, 25.0, 25.0, 25.0, 10.0, 25.0],
        );
        let result = run(records, &alert, "2025-10-02T10:00");
        assert_eq!(result.trigger_time, Some(at("2025-10-02T10:00")));
        assert_eq!(result.hours_above_threshold, 3);
    }

    #[test]
    fn test_unreadable_rows_break_the_run() {
        let alert = alert(20.0, 0.0, 0, 23);
        let records = vec![
            record("2025-10-02T12:00", Some(30.0), None, None),
            record("not a time", Some(30.0), None, None),
            record("2025-10-02T13:00", Some(30.0), None, None),
            record("2025-10-02T14:00", None, None, None),
            record("2025-10-02T15:00", Some(30.0), None, None),
        ];
        let result = run(records, &alert, "2025-10-02T10:00");
        assert!(result.should_alert);
        assert_eq!(result.hours_above_threshold, 1);
    }

    #[rstest]
    #[case(StreakPolicy::ResetOnWindowExit, 2)]
    #[case(StreakPolicy::SkipOutsideWindow, 4)]
    fn test_streak_policy_across_direction_gap(#[case] policy: StreakPolicy, #[case] expected: u32) {
        let mut alert = alert(20.0, 0.0, 0, 23);
        alert.direction = Some(DirectionWindow::new(180.0, 240.0));
        let records = vec![
            record("2025-10-02T12:00", Some(30.0), None, Some(200.0)),
            record("2025-10-02T13:00", Some(30.0), None, Some(200.0)),
            record("2025-10-02T14:00", Some(30.0), None, Some(90.0)),
            record("2025-10-02T15:00", Some(30.0), None, Some(200.0)),
            record("2025-10-02T16:00", Some(30.0), None, Some(200.0)),
        ];

        let result = scan(records, &alert, at("2025-10-02T10:00"), 1, &BTreeSet::new(), policy);
        assert_eq!(result.hours_above_threshold, expected);
    }

    #[test]
    fn test_skip_policy_still_resets_below_threshold() {
        let mut alert = alert(20.0, 0.0, 0, 23);
        alert.hours = HourWindow::new(12, 14);
        let records = winds("2025-10-02T12:00", &[30.0, 10.0, 30.0]);
        let result = scan(
            records,
            &alert,
            at("2025-10-02T10:00"),
            1,
            &BTreeSet::new(),
            StreakPolicy::SkipOutsideWindow,
        );
        assert_eq!(result.hours_above_threshold, 1);
    }

    fn forecast(start: &str, values: &[f64]) -> HourlyForecast {
        let start = at(start);
        HourlyForecast {
            time: (0..values.len())
                .map(|i| {
                    (start + Duration::hours(i as i64))
                        .format(crate::models::HOURLY_TIME_FORMAT)
                        .to_string()
                })
                .collect(),
            wind_speed: values.iter().copied().map(Some).collect(),
            units: HourlyUnits::default(),
            ..HourlyForecast::default()
        }
    }

    #[tokio::test]
    async fn test_evaluator_notifies_once_per_day() {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(
            AlertedDaysLedger::open(Store::open(dir.path()).unwrap())
                .await
                .unwrap(),
        );
        let evaluator = AlertEvaluator::new(ledger.clone(), 1, StreakPolicy::default());
        let alert = alert(20.0, 0.0, 0, 23);
        let forecast = forecast("2025-10-02T12:00", &[30.0, 30.0, 30.0]);
        let now = at("2025-10-02T11:00");

        let first = evaluator.evaluate(&alert, &forecast, now).await.unwrap();
        assert!(first.should_alert);
        assert_eq!(first.hours_above_threshold, 3);
        assert!(ledger.alerted_days(&alert.id).await.is_empty());

        let unmarked = evaluator.evaluate(&alert, &forecast, now).await.unwrap();
        assert_eq!(unmarked, first);

        evaluator.mark_alerted(&alert, &first).await.unwrap();
        assert!(ledger.alerted_days(&alert.id).await.contains(&now.date()));

        let second = evaluator.evaluate(&alert, &forecast, now).await.unwrap();
        assert!(!second.should_alert);
        assert_eq!(second.hours_above_threshold, 3);
    }
}
