//! Adversarial and end-to-end test suite for the CyberHerd.
//!
//! The tests in this crate drive the engine the way the outside world does:
//! redelivered receipts, concurrent submitters, competing headbutts, and
//! payouts racing with admissions. Herd invariants are checked after every
//! step.

pub mod helpers;
