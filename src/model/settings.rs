use chrono::Weekday;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global scheduling parameters. Exactly one row exists; it is created with
/// these defaults the first time anything reads it. The reconciliation engine
/// treats this as the source of truth for working days and expected hours.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SystemSettings {
    pub id: u64,

    #[schema(example = 15)]
    pub late_allowance_minutes: i32,

    pub work_day_sunday: bool,
    pub work_day_monday: bool,
    pub work_day_tuesday: bool,
    pub work_day_wednesday: bool,
    pub work_day_thursday: bool,
    pub work_day_friday: bool,
    pub work_day_saturday: bool,

    #[schema(example = 8.0)]
    pub working_hours_per_day: f64,

    #[schema(example = "09:00")]
    pub working_hours_start: String,

    #[schema(example = "17:00")]
    pub working_hours_end: String,

    #[schema(example = 1.5)]
    pub overtime_multiplier: f64,

    #[schema(example = 2.0)]
    pub weekend_overtime_multiplier: f64,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            id: 1,
            late_allowance_minutes: 15,
            work_day_sunday: false,
            work_day_monday: true,
            work_day_tuesday: true,
            work_day_wednesday: true,
            work_day_thursday: true,
            work_day_friday: true,
            work_day_saturday: false,
            working_hours_per_day: 8.0,
            working_hours_start: "09:00".to_string(),
            working_hours_end: "17:00".to_string(),
            overtime_multiplier: 1.5,
            weekend_overtime_multiplier: 2.0,
        }
    }
}

impl SystemSettings {
    pub fn is_working_day(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Sun => self.work_day_sunday,
            Weekday::Mon => self.work_day_monday,
            Weekday::Tue => self.work_day_tuesday,
            Weekday::Wed => self.work_day_wednesday,
            Weekday::Thu => self.work_day_thursday,
            Weekday::Fri => self.work_day_friday,
            Weekday::Sat => self.work_day_saturday,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_monday_to_friday_eight_hours() {
        let settings = SystemSettings::default();
        assert!(settings.is_working_day(Weekday::Mon));
        assert!(settings.is_working_day(Weekday::Fri));
        assert!(!settings.is_working_day(Weekday::Sat));
        assert!(!settings.is_working_day(Weekday::Sun));
        assert_eq!(settings.working_hours_per_day, 8.0);
    }
}
