//! Attendance-log ingestion engine.
//!
//! Parsing is a pure fold over the raw text: lines become `(employee, date,
//! timestamp)` triples, triples are grouped per employee per day, and each
//! group collapses to a single attendance window (earliest timestamp in,
//! latest out). Persistence is a separate pass that upserts each window on the
//! `(employee_id, date)` unique key, so re-uploading the same or a corrected
//! log is idempotent per day.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::MySqlPool;
use std::collections::BTreeMap;
use tracing::{debug, error, info};
use utoipa::ToSchema;

use crate::utils::employee_cache;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single employee/day window derived from the log.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceWindow {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: NaiveDateTime,
    pub check_out: Option<NaiveDateTime>,
}

impl AttendanceWindow {
    /// Fractional hours between check-in and check-out. None without a
    /// check-out; never negative because the parse phase orders timestamps.
    pub fn hours_worked(&self) -> Option<f64> {
        self.check_out
            .map(|out| (out - self.check_in).num_milliseconds() as f64 / 3_600_000.0)
    }
}

/// Per-reason skip counters, returned to the caller so "0 processed" is
/// distinguishable from "everything was invalid".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SkipStats {
    /// Lines with fewer than two tokens or a non-integer employee id.
    #[schema(example = 0)]
    pub malformed_lines: u64,
    /// Lines whose second and third tokens do not form a valid timestamp.
    #[schema(example = 0)]
    pub bad_timestamps: u64,
    /// Whole windows dropped because the referenced employee does not exist.
    #[schema(example = 0)]
    pub unknown_employees: u64,
    /// Windows whose upsert failed at the storage layer.
    #[schema(example = 0)]
    pub storage_errors: u64,
}

impl SkipStats {
    pub fn total(&self) -> u64 {
        self.malformed_lines + self.bad_timestamps + self.unknown_employees + self.storage_errors
    }
}

#[derive(Debug, Default)]
pub struct ParsedLog {
    pub windows: Vec<AttendanceWindow>,
    pub skipped: SkipStats,
}

/// Outcome of a full ingestion run.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestSummary {
    /// Attendance rows created or overwritten.
    #[schema(example = 42)]
    pub processed: u64,
    pub skipped: SkipStats,
}

/// Parses a raw device log into attendance windows. Best-effort: invalid
/// lines are counted and skipped, never fatal.
///
/// Line shape: `<employeeId> <YYYY-MM-DD> <HH:MM:SS> [device flags...]`.
/// The date a timestamp belongs to is its own calendar date; timestamps are
/// naive wall-clock values and no timezone conversion is applied.
pub fn parse_log(text: &str) -> ParsedLog {
    let mut skipped = SkipStats::default();
    let mut groups: BTreeMap<(u64, NaiveDate), Vec<NaiveDateTime>> = BTreeMap::new();

    for line in text.lines() {
        let mut tokens = line.split_whitespace();

        let id_token = match tokens.next() {
            Some(t) => t,
            None => continue, // blank line
        };

        let employee_id: u64 = match id_token.parse() {
            Ok(id) => id,
            Err(_) => {
                skipped.malformed_lines += 1;
                continue;
            }
        };

        let (date_token, time_token) = match (tokens.next(), tokens.next()) {
            (Some(d), Some(t)) => (d, t),
            (Some(_), None) => {
                skipped.bad_timestamps += 1;
                continue;
            }
            _ => {
                skipped.malformed_lines += 1;
                continue;
            }
        };

        let raw = format!("{} {}", date_token, time_token);
        let timestamp = match NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT) {
            Ok(ts) => ts,
            Err(_) => {
                skipped.bad_timestamps += 1;
                continue;
            }
        };

        // Remaining tokens are device-specific flags; ignored.
        groups
            .entry((employee_id, timestamp.date()))
            .or_default()
            .push(timestamp);
    }

    let windows = groups
        .into_iter()
        .map(|((employee_id, date), mut stamps)| {
            stamps.sort();
            let check_in = stamps[0];
            let check_out = if stamps.len() > 1 {
                Some(stamps[stamps.len() - 1])
            } else {
                None
            };
            AttendanceWindow {
                employee_id,
                date,
                check_in,
                check_out,
            }
        })
        .collect();

    ParsedLog { windows, skipped }
}

/// Persists parsed windows. Each window is an independent atomic upsert on
/// the `(employee_id, date)` unique key; a failure affects only that window.
pub async fn persist_windows(pool: &MySqlPool, parsed: ParsedLog) -> IngestSummary {
    let mut skipped = parsed.skipped;
    let mut processed = 0u64;

    for window in parsed.windows {
        if !employee_cache::is_known(pool, window.employee_id).await {
            debug!(
                employee_id = window.employee_id,
                date = %window.date,
                "Dropping window for unknown employee"
            );
            skipped.unknown_employees += 1;
            continue;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, check_in, check_out, hours_worked)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                check_in = VALUES(check_in),
                check_out = VALUES(check_out),
                hours_worked = VALUES(hours_worked)
            "#,
        )
        .bind(window.employee_id)
        .bind(window.date)
        .bind(window.check_in)
        .bind(window.check_out)
        .bind(window.hours_worked())
        .execute(pool)
        .await;

        match result {
            Ok(_) => processed += 1,
            Err(e) => {
                error!(
                    error = %e,
                    employee_id = window.employee_id,
                    date = %window.date,
                    "Failed to upsert attendance window"
                );
                skipped.storage_errors += 1;
            }
        }
    }

    info!(processed, skipped = skipped.total(), "Attendance ingestion finished");

    IngestSummary { processed, skipped }
}

/// Parse + persist in one call; the handler-facing entry point.
pub async fn ingest_log(pool: &MySqlPool, text: &str) -> IngestSummary {
    persist_windows(pool, parse_log(text)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn single_day_two_stamps_yields_one_window() {
        let parsed = parse_log("5 2025-02-01 09:00:00\n5 2025-02-01 18:00:00");

        assert_eq!(parsed.skipped, SkipStats::default());
        assert_eq!(parsed.windows.len(), 1);

        let w = &parsed.windows[0];
        assert_eq!(w.employee_id, 5);
        assert_eq!(w.date, ymd(2025, 2, 1));
        assert_eq!(w.check_in, ts("2025-02-01", "09:00:00"));
        assert_eq!(w.check_out, Some(ts("2025-02-01", "18:00:00")));
        assert_eq!(w.hours_worked(), Some(9.0));
    }

    #[test]
    fn trailing_device_flags_are_ignored() {
        let log = "1 2025-01-14 10:55:36 2 0 1 0\n1 2025-01-14 17:45:27 2 0 1 0";
        let parsed = parse_log(log);

        assert_eq!(parsed.windows.len(), 1);
        let hours = parsed.windows[0].hours_worked().unwrap();
        assert!((hours - 6.83).abs() < 0.01, "got {hours}");
    }

    #[test]
    fn single_stamp_has_no_check_out() {
        let parsed = parse_log("2 2025-01-14 08:30:15 2 0 1 0");

        assert_eq!(parsed.windows.len(), 1);
        let w = &parsed.windows[0];
        assert_eq!(w.check_in, ts("2025-01-14", "08:30:15"));
        assert_eq!(w.check_out, None);
        assert_eq!(w.hours_worked(), None);
    }

    #[test]
    fn out_of_order_stamps_still_order_the_window() {
        // Device flushed its buffer in reverse; earliest must win as check-in.
        let log = "7 2025-03-10 17:00:00\n7 2025-03-10 12:15:00\n7 2025-03-10 08:45:00";
        let parsed = parse_log(log);

        assert_eq!(parsed.windows.len(), 1);
        let w = &parsed.windows[0];
        assert_eq!(w.check_in, ts("2025-03-10", "08:45:00"));
        assert_eq!(w.check_out, Some(ts("2025-03-10", "17:00:00")));
        assert!(w.hours_worked().unwrap() > 0.0);
    }

    #[test]
    fn lines_group_per_employee_per_day() {
        let log = "\
            1 2025-01-14 10:55:36\n\
            1 2025-01-14 17:45:27\n\
            2 2025-01-14 08:30:15\n\
            1 2025-01-15 09:01:00\n";
        let parsed = parse_log(log);

        assert_eq!(parsed.windows.len(), 3);
        let keys: Vec<_> = parsed
            .windows
            .iter()
            .map(|w| (w.employee_id, w.date))
            .collect();
        assert_eq!(
            keys,
            vec![
                (1, ymd(2025, 1, 14)),
                (1, ymd(2025, 1, 15)),
                (2, ymd(2025, 1, 14)),
            ]
        );
    }

    #[test]
    fn near_midnight_stamps_belong_to_their_own_date() {
        let log = "3 2025-01-14 23:58:00\n3 2025-01-15 00:05:00";
        let parsed = parse_log(log);

        // No timezone shifting: the two stamps land on different days.
        assert_eq!(parsed.windows.len(), 2);
        assert_eq!(parsed.windows[0].date, ymd(2025, 1, 14));
        assert_eq!(parsed.windows[1].date, ymd(2025, 1, 15));
        assert!(parsed.windows.iter().all(|w| w.check_out.is_none()));
    }

    #[test]
    fn invalid_lines_are_counted_not_fatal() {
        let log = "\
            abc 2025-01-14 10:00:00\n\
            1\n\
            1 2025-01-14\n\
            1 2025-99-14 10:00:00\n\
            1 2025-01-14 99:00:00\n\
            \n\
            4 2025-01-14 10:00:00\n";
        let parsed = parse_log(log);

        assert_eq!(parsed.windows.len(), 1);
        assert_eq!(parsed.windows[0].employee_id, 4);
        assert_eq!(parsed.skipped.malformed_lines, 2);
        assert_eq!(parsed.skipped.bad_timestamps, 3);
        assert_eq!(parsed.skipped.total(), 5);
    }

    #[test]
    fn parse_is_deterministic_across_reruns() {
        let log = "9 2025-04-01 09:00:00 1\n9 2025-04-01 17:30:00 1\n8 2025-04-01 10:00:00";
        let first = parse_log(log);
        let second = parse_log(log);
        assert_eq!(first.windows, second.windows);
        assert_eq!(first.skipped, second.skipped);
    }

    #[test]
    fn duplicate_stamps_in_file_collapse() {
        let log = "6 2025-05-02 09:00:00\n6 2025-05-02 09:00:00\n6 2025-05-02 17:00:00";
        let parsed = parse_log(log);

        assert_eq!(parsed.windows.len(), 1);
        let w = &parsed.windows[0];
        assert_eq!(w.check_in, ts("2025-05-02", "09:00:00"));
        assert_eq!(w.check_out, Some(ts("2025-05-02", "17:00:00")));
        assert_eq!(w.hours_worked(), Some(8.0));
    }
}
