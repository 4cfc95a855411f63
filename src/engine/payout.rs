//! Payout-period reconciliation engine.
//!
//! Pure functions only: deriving candidate periods from a payment basis and
//! aggregating attendance rows into per-period totals. Persistence of payout
//! rows lives in the API layer; recomputing a preview never writes.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::Attendance;
use crate::model::employee::PaymentBasis;
use crate::model::settings::SystemSettings;

/// Weeks start on Monday for weekly and biweekly alignment.
const WEEK_START: Weekday = Weekday::Mon;

/// A contiguous date range over which attendance is aggregated into one
/// payable amount. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PayPeriod {
    #[schema(example = "Week of Jan 13 - Jan 19, 2025")]
    pub label: String,

    #[schema(example = "2025-01-13", value_type = String, format = "date")]
    pub start: NaiveDate,

    #[schema(example = "2025-01-19", value_type = String, format = "date")]
    pub end: NaiveDate,
}

/// Aggregated attendance for one period.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeriodTotals {
    #[schema(example = 20)]
    pub days_worked: u32,

    #[schema(example = 23)]
    pub working_days_in_period: u32,

    #[schema(example = 161.5)]
    pub total_hours_worked: f64,

    #[schema(example = 184.0)]
    pub expected_hours: f64,

    #[schema(example = 7000.0)]
    pub payout_amount: f64,
}

/// Candidate payment periods for an employee, most recent first: the 4 most
/// recent weeks or fortnights, or the 3 most recent calendar months.
pub fn payment_periods(basis: PaymentBasis, today: NaiveDate) -> Vec<PayPeriod> {
    match basis {
        PaymentBasis::Weekly => (0..4)
            .map(|i| {
                let start = (today - Duration::weeks(i)).week(WEEK_START).first_day();
                let end = start + Duration::days(6);
                PayPeriod {
                    label: format!(
                        "Week of {} - {}",
                        start.format("%b %-d"),
                        end.format("%b %-d, %Y")
                    ),
                    start,
                    end,
                }
            })
            .collect(),
        PaymentBasis::Biweekly => (0..4)
            .map(|i| {
                let start = (today - Duration::weeks(i * 2)).week(WEEK_START).first_day();
                let end = start + Duration::days(13);
                PayPeriod {
                    label: format!("{} - {}", start.format("%b %-d"), end.format("%b %-d, %Y")),
                    start,
                    end,
                }
            })
            .collect(),
        PaymentBasis::Monthly => (0..3)
            .map(|i| {
                let start = today.with_day(1).unwrap() - Months::new(i);
                let end = (start + Months::new(1)).pred_opt().unwrap();
                PayPeriod {
                    label: start.format("%B %Y").to_string(),
                    start,
                    end,
                }
            })
            .collect(),
    }
}

/// Calendar days in `[start, end]` flagged as working days in the settings.
pub fn working_days_in_period(start: NaiveDate, end: NaiveDate, settings: &SystemSettings) -> u32 {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| settings.is_working_day(day.weekday()))
        .count() as u32
}

/// Aggregates an employee's attendance into one period's totals. The payout
/// amount is days worked times the daily rate; hours never affect it.
pub fn calculate_period_payout(
    records: &[Attendance],
    daily_rate: f64,
    period: &PayPeriod,
    settings: &SystemSettings,
) -> PeriodTotals {
    let in_period: Vec<&Attendance> = records
        .iter()
        .filter(|r| r.date >= period.start && r.date <= period.end)
        .collect();

    let days_worked = in_period.len() as u32;
    let total_hours_worked: f64 = in_period.iter().filter_map(|r| r.hours_worked).sum();

    let working_days = working_days_in_period(period.start, period.end, settings);
    let expected_hours = working_days as f64 * settings.working_hours_per_day;

    PeriodTotals {
        days_worked,
        working_days_in_period: working_days,
        total_hours_worked,
        expected_hours,
        payout_amount: days_worked as f64 * daily_rate,
    }
}

/// The `payment_date` an operator save leaves on a payout row. Flipping
/// unpaid to paid stamps `now`; marking unpaid clears the date; staying paid
/// keeps the original stamp.
pub fn paid_transition_date(
    currently_paid: bool,
    current_payment_date: Option<NaiveDateTime>,
    requested_paid: bool,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if requested_paid && !currently_paid {
        Some(now)
    } else if !requested_paid {
        None
    } else {
        current_payment_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn record(id: u64, date: NaiveDate, hours: Option<f64>) -> Attendance {
        let check_in = NaiveDateTime::parse_from_str(
            &format!("{date} 09:00:00"),
            "%Y-%m-%d %H:%M:%S",
        )
        .unwrap();
        Attendance {
            id,
            employee_id: 1,
            date,
            check_in,
            check_out: hours.map(|h| check_in + Duration::minutes((h * 60.0) as i64)),
            hours_worked: hours,
        }
    }

    #[test]
    fn monthly_periods_are_three_calendar_months_most_recent_first() {
        let periods = payment_periods(PaymentBasis::Monthly, ymd(2025, 3, 15));

        assert_eq!(periods.len(), 3);
        assert_eq!(periods[0].start, ymd(2025, 3, 1));
        assert_eq!(periods[0].end, ymd(2025, 3, 31));
        assert_eq!(periods[1].start, ymd(2025, 2, 1));
        assert_eq!(periods[1].end, ymd(2025, 2, 28));
        assert_eq!(periods[2].start, ymd(2025, 1, 1));
        assert_eq!(periods[2].end, ymd(2025, 1, 31));
        assert_eq!(periods[2].label, "January 2025");
    }

    #[test]
    fn monthly_periods_cross_year_boundary() {
        let periods = payment_periods(PaymentBasis::Monthly, ymd(2025, 1, 5));

        assert_eq!(periods[1].start, ymd(2024, 12, 1));
        assert_eq!(periods[1].end, ymd(2024, 12, 31));
        assert_eq!(periods[2].start, ymd(2024, 11, 1));
    }

    #[test]
    fn weekly_periods_align_to_monday() {
        // 2025-01-15 is a Wednesday; its week starts Monday the 13th.
        let periods = payment_periods(PaymentBasis::Weekly, ymd(2025, 1, 15));

        assert_eq!(periods.len(), 4);
        assert_eq!(periods[0].start, ymd(2025, 1, 13));
        assert_eq!(periods[0].end, ymd(2025, 1, 19));
        assert_eq!(periods[3].start, ymd(2024, 12, 23));
        assert_eq!(periods[3].end, ymd(2024, 12, 29));
        for p in &periods {
            assert_eq!(p.start.weekday(), Weekday::Mon);
            assert_eq!((p.end - p.start).num_days(), 6);
        }
    }

    #[test]
    fn biweekly_periods_span_fourteen_days_from_a_week_start() {
        let periods = payment_periods(PaymentBasis::Biweekly, ymd(2025, 1, 15));

        assert_eq!(periods.len(), 4);
        for p in &periods {
            assert_eq!(p.start.weekday(), Weekday::Mon);
            assert_eq!((p.end - p.start).num_days(), 13);
        }
        // Consecutive periods step back two weeks.
        assert_eq!((periods[0].start - periods[1].start).num_days(), 14);
    }

    #[test]
    fn payout_amount_ignores_hours_worked() {
        let period = PayPeriod {
            label: "January 2025".into(),
            start: ymd(2025, 1, 1),
            end: ymd(2025, 1, 31),
        };
        let records = vec![
            record(1, ymd(2025, 1, 6), Some(2.0)),
            record(2, ymd(2025, 1, 7), Some(11.5)),
            record(3, ymd(2025, 1, 8), None),
        ];

        let totals =
            calculate_period_payout(&records, 100.0, &period, &SystemSettings::default());

        assert_eq!(totals.days_worked, 3);
        assert_eq!(totals.payout_amount, 300.0);
        assert_eq!(totals.total_hours_worked, 13.5); // missing checkout counts as 0
    }

    #[test]
    fn records_outside_the_period_are_excluded() {
        let period = PayPeriod {
            label: "February 2025".into(),
            start: ymd(2025, 2, 1),
            end: ymd(2025, 2, 28),
        };
        let records = vec![
            record(1, ymd(2025, 1, 31), Some(8.0)),
            record(2, ymd(2025, 2, 1), Some(8.0)), // inclusive lower bound
            record(3, ymd(2025, 2, 28), Some(8.0)), // inclusive upper bound
            record(4, ymd(2025, 3, 1), Some(8.0)),
        ];

        let totals =
            calculate_period_payout(&records, 50.0, &period, &SystemSettings::default());

        assert_eq!(totals.days_worked, 2);
        assert_eq!(totals.payout_amount, 100.0);
    }

    #[test]
    fn expected_hours_come_from_settings() {
        // One Monday-to-Sunday week: 5 default working days.
        let period = PayPeriod {
            label: "Week of Jan 13 - Jan 19, 2025".into(),
            start: ymd(2025, 1, 13),
            end: ymd(2025, 1, 19),
        };

        let defaults = SystemSettings::default();
        let totals = calculate_period_payout(&[], 100.0, &period, &defaults);
        assert_eq!(totals.working_days_in_period, 5);
        assert_eq!(totals.expected_hours, 40.0);

        // A six-day, seven-hour schedule changes both figures.
        let six_day = SystemSettings {
            work_day_saturday: true,
            working_hours_per_day: 7.0,
            ..SystemSettings::default()
        };
        let totals = calculate_period_payout(&[], 100.0, &period, &six_day);
        assert_eq!(totals.working_days_in_period, 6);
        assert_eq!(totals.expected_hours, 42.0);
    }

    #[test]
    fn marking_paid_stamps_the_payment_date() {
        let now = ts("2025-02-01 12:00:00");
        assert_eq!(paid_transition_date(false, None, true, now), Some(now));
    }

    #[test]
    fn marking_unpaid_clears_the_payment_date() {
        let stamped = ts("2025-02-01 12:00:00");
        let now = ts("2025-02-03 09:30:00");
        assert_eq!(paid_transition_date(true, Some(stamped), false, now), None);
    }

    #[test]
    fn staying_paid_keeps_the_original_stamp() {
        let stamped = ts("2025-02-01 12:00:00");
        let now = ts("2025-02-03 09:30:00");
        // Re-saving a paid payout (e.g. editing the comment) must not move
        // the recorded payment date.
        assert_eq!(
            paid_transition_date(true, Some(stamped), true, now),
            Some(stamped)
        );
    }

    #[test]
    fn staying_unpaid_leaves_no_payment_date() {
        let now = ts("2025-02-03 09:30:00");
        assert_eq!(paid_transition_date(false, None, false, now), None);
    }

    #[test]
    fn empty_period_yields_zero_amount() {
        let period = PayPeriod {
            label: "March 2025".into(),
            start: ymd(2025, 3, 1),
            end: ymd(2025, 3, 31),
        };
        let totals =
            calculate_period_payout(&[], 250.0, &period, &SystemSettings::default());

        assert_eq!(totals.days_worked, 0);
        assert_eq!(totals.payout_amount, 0.0);
        assert_eq!(totals.total_hours_worked, 0.0);
    }
}
