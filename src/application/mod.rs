//! Application layer containing the reconciliation orchestration.
//!
//! This module defines the `ReconciliationEngine`, the entry point for
//! applying payments to invoices, and the best-effort `SideEffects` it fires
//! once a payment has been committed.

pub mod engine;
pub mod side_effects;
