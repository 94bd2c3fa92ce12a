//! Back-office reporting for an education and migration agency: attendance
//! compliance, visa and COE expiry, lead funnels, class revenue and the
//! monthly ledger, with workbook, document and email delivery.

pub mod config;
pub mod error;
pub mod tabular;
pub mod telemetry;
pub mod workflows;
