//! The sync engine: key index, store gateway, per-candidate reconciliation,
//! and the run supervisor that ties them to one transaction.
pub mod gateway;
pub mod key_index;
pub mod reconciler;
pub mod run;
