//! # Statement-Mapping Pipeline
//!
//! Leaf-first: [`resolver`] turns an item reference into a claim-value
//! handle, [`claims`] submits one claim, and [`statements`] drives both
//! over an entity's statement list, collecting one outcome per statement.

pub mod claims;
pub mod resolver;
pub mod statements;

pub use claims::{build_claim, CreatedClaim, CLAIM_REPOSITORY};
pub use resolver::resolve_reference;
pub use statements::{
    process_statement, run_statements, StatementError, StatementReport, StatementResult,
};
