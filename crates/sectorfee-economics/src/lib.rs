//! # sectorfee Economics
//!
//! The sector economics aggregation engine: per-sector financial formulas,
//! date-bucket aggregation and report building.
//!
//! ## Pipeline
//!
//! ```text
//! state adapter ──► per-sector calculators ──► aggregator ──► report builder
//!                   (formula selected by          (date-keyed,     (records
//!                    protocol version at           commutative)     or CSV)
//!                    the evaluation epoch)
//! ```
//!
//! ## Formula families
//!
//! | Family | Versions | Output |
//! |--------|----------|--------|
//! | Termination penalty | expected-reward, pledge-percentage | per sector |
//! | Continued-fault fee | single (projection window varies)  | per sector / nominal |
//! | Protocol daily fee  | single                             | per QAP size |
//!
//! All arithmetic is exact (`BigInt`/`BigRational`); only report rendering
//! produces fixed-precision decimal strings.

pub mod aggregate;
pub mod dailyfee;
pub mod faultfee;
pub mod penalty;
pub mod report;
pub mod vesting;

pub use aggregate::{Aggregator, DateBucket};
pub use dailyfee::{daily_proof_fee, reference_fees, sp_fee_summary, DailyFeeQuote, SpFeeSummary};
pub use faultfee::{continued_fault_fee, nominal_fault_fee};
pub use penalty::termination_penalty;
pub use report::{PenaltyReport, PenaltyRow, VestingRow};
pub use vesting::{decumulate, VestingStep};
