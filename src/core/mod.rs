pub mod acquisition_following_disposal;
pub mod aggregate;
pub mod bed_and_breakfast;
pub mod engine;
pub mod error;
pub mod lot;
pub mod money;
pub mod record;
pub mod same_day;
pub mod section104;
pub mod state;
pub mod uk;

// Flat public surface for domain types and functions.
pub use engine::{match_records, MatchReport, Totals};
pub use error::MatchError;
pub use lot::{Direction, Lot};
pub use money::{format_gbp, format_price};
pub use record::RawRecord;
pub use section104::{PoolHistoryEntry, Section104Holding};
pub use state::{MatchEvent, MatchingRule};
pub use uk::TaxYear;
