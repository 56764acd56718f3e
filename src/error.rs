use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("out of money")]
    OutOfFunds,
    #[error("bet amount exceeds available money")]
    BetExceedsBalance,
    #[error("balance has reached the table limit")]
    TableLimit,
    #[error("table is already running")]
    AlreadyRunning,
    #[error("no table numbered {0}")]
    UnknownTable(usize),
}

/// Parses a whole number the way the entry fields accept it (surrounding blanks allowed).
pub fn parse_amount(input: &str) -> Result<i64, TableError> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| TableError::InvalidInput(format!("'{}' is not a whole number", input.trim())))
}
