pub mod attendance;
pub mod employee;
pub mod payout;
pub mod settings;
