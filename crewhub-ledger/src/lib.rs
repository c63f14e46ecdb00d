//! SQLite entitlement ledger for CrewHub.
//!
//! The ledger is the single durable home of license applications, active
//! licenses, and migration requests. It is the only component that touches
//! the database: services read copies through its queries and route every
//! mutation back through its operations.
//!
//! # Atomicity
//!
//! Multi-record transitions (trial creation, migration approval) are exposed
//! as composite operations that run in one SQLite transaction. A crash or
//! forced exit mid-operation rolls the whole transition back, so the ledger
//! can never hold two active bindings for one key hash or a migration marked
//! approved without its replacement license.

mod error;
mod store;

pub use error::{LedgerError, LedgerResult};
pub use store::EntitlementStore;
