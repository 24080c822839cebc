//! Ledger rules applied while building transactions

pub mod transaction;
