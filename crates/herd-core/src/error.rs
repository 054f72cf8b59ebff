//! Error types for the herd.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("not a member: {0}")] NotAMember(String),
    #[error("already a member: {0}")] AlreadyMember(String),
    #[error("cumulative amount overflow")] AmountOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("invalid reset time {hour:02}:{minute:02} UTC")] InvalidResetTime { hour: u32, minute: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("load: {0}")] Load(String),
    #[error("invalid: {0}")] Invalid(String),
}

#[derive(Error, Debug)]
pub enum HerdError {
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Cycle(#[from] CycleError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error("rpc: {0}")] Rpc(String),
}
