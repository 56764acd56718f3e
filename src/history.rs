use crate::roulette::{Color, Spin};
use std::fmt;

/// One line of a table's history, rendered exactly as the table shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    Round { bet: i64, choice: Color, spin: Spin },
    OutOfFunds,
    BetExceedsBalance,
    TableLimit,
    UnparsableInput,
    OutOfRangeInput,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEntry::Round { bet, choice, spin } => {
                write!(f, "Bet: ${}, Choice: {}, Result: {}", bet, choice, spin)
            }
            HistoryEntry::OutOfFunds => f.write_str("Game Over: You're out of money."),
            HistoryEntry::BetExceedsBalance => {
                f.write_str("Error: Bet amount exceeds available money.")
            }
            HistoryEntry::TableLimit => {
                f.write_str("Error: Balance has reached the table limit.")
            }
            HistoryEntry::UnparsableInput => {
                f.write_str("Error: Invalid number of rounds or bet amount.")
            }
            HistoryEntry::OutOfRangeInput => f.write_str(
                "Error: Number of rounds cannot be negative and bet amount must be positive.",
            ),
        }
    }
}
