pub mod ingest;
pub mod payout;
