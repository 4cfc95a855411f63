use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Cadence used to derive payout periods for an employee.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum PaymentBasis {
    Weekly,
    Biweekly,
    Monthly,
}

impl Default for PaymentBasis {
    fn default() -> Self {
        PaymentBasis::Monthly
    }
}

impl PaymentBasis {
    /// Parses the value stored in the `employees.payment_basis` column.
    /// Unknown values fall back to Monthly rather than failing the request.
    pub fn from_column(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "John Doe",
        "email": "john.doe@company.com",
        "position": "Technician",
        "daily_rate": 350.0,
        "payment_basis": "Monthly",
        "phone": "+201001234567",
        "created_at": "2025-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "Technician")]
    pub position: String,

    /// Amount owed per day worked, in the payroll currency.
    #[schema(example = 350.0)]
    pub daily_rate: f64,

    #[schema(example = "Monthly")]
    pub payment_basis: String,

    #[schema(example = "+201001234567", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "2025-01-01T00:00:00Z", value_type = String, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn basis(&self) -> PaymentBasis {
        PaymentBasis::from_column(&self.payment_basis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_basis_round_trips_through_column_text() {
        assert_eq!(PaymentBasis::from_column("Weekly"), PaymentBasis::Weekly);
        assert_eq!(PaymentBasis::from_column("Biweekly"), PaymentBasis::Biweekly);
        assert_eq!(PaymentBasis::from_column("Monthly"), PaymentBasis::Monthly);
        assert_eq!(PaymentBasis::Weekly.to_string(), "Weekly");
    }

    #[test]
    fn unknown_basis_defaults_to_monthly() {
        assert_eq!(PaymentBasis::from_column("fortnightly"), PaymentBasis::Monthly);
        assert_eq!(PaymentBasis::from_column(""), PaymentBasis::Monthly);
    }
}
