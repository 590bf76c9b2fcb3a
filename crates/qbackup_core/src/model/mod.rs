//! Record contract and the record kinds persisted by qbackup.
//!
//! # Responsibility
//! - Define how any entity turns into an ordered field map and back.
//! - Provide the backup record kinds (`Group`, `Period`, `Qube`).
//!
//! # Invariants
//! - Every record kind declares its fields at compile time.
//! - Exactly one declared field identifies a record within its kind.

pub mod backup;
pub mod record;
