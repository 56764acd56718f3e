use crate::error::{parse_amount, TableError};
use crate::history::HistoryEntry;
use crate::roulette::{Color, SpinSource};
use crate::scheduler::Policy;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every table bets on black.
pub const CHOICE: Color = Color::Black;

/// Where the bet comes from after a winning round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReload {
    /// Whatever amount was most recently entered for the table, including batch updates.
    #[default]
    LastEntered,
    /// The amount the current run was started with.
    ConfiguredBase,
}

#[derive(Debug, Clone)]
pub struct TableSettings {
    pub starting_balance: i64,
    pub initial_bet: i64,
    /// Round count a table holds before anyone enters one.
    pub initial_rounds: Option<i64>,
    pub spin_delay: Duration,
    pub win_reload: WinReload,
}

impl Default for TableSettings {
    fn default() -> Self {
        TableSettings {
            starting_balance: 10_000,
            initial_bet: 5,
            initial_rounds: None,
            spin_delay: Duration::from_millis(100),
            win_reload: WinReload::LastEntered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Round count 0: spins on a timer until stopped.
    Infinite,
    /// Positive round count: spins back to back until exhausted.
    Finite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Configured,
    Running,
    Stopped,
    Exhausted,
    OutOfFunds,
    BetExceedsBalance,
    /// A win would carry the balance past what the table can hold.
    TableLimit,
}

impl Status {
    /// The error behind a run that ended on a guard.
    pub fn failure(self) -> Option<TableError> {
        match self {
            Status::OutOfFunds => Some(TableError::OutOfFunds),
            Status::BetExceedsBalance => Some(TableError::BetExceedsBalance),
            Status::TableLimit => Some(TableError::TableLimit),
            _ => None,
        }
    }
}

/// What the scheduler should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Again(Policy),
    Halted(Status),
    /// The table was no longer running when the step came due.
    Skipped,
}

pub struct Table {
    number: usize,
    balance: i64,
    current_bet: i64,
    base_bet: i64,
    rounds_remaining: i64,
    running: bool,
    mode: Mode,
    status: Status,
    history: Vec<HistoryEntry>,
    bet_input: Option<i64>,
    rounds_input: Option<i64>,
    generation: u64,
    spin_delay: Duration,
    win_reload: WinReload,
}

impl Table {
    pub fn new(number: usize, settings: &TableSettings) -> Self {
        Table {
            number,
            balance: settings.starting_balance,
            current_bet: settings.initial_bet,
            base_bet: settings.initial_bet,
            rounds_remaining: 0,
            running: false,
            mode: Mode::Infinite,
            status: Status::Idle,
            history: Vec::new(),
            bet_input: Some(settings.initial_bet),
            rounds_input: settings.initial_rounds,
            generation: 0,
            spin_delay: settings.spin_delay,
            win_reload: settings.win_reload,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn current_bet(&self) -> i64 {
        self.current_bet
    }

    pub fn rounds_remaining(&self) -> i64 {
        self.rounds_remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bet_input(&self) -> Option<i64> {
        self.bet_input
    }

    pub fn rounds_input(&self) -> Option<i64> {
        self.rounds_input
    }

    /// Stopping is only offered while an infinite run is active.
    pub fn can_stop(&self) -> bool {
        self.running && self.mode == Mode::Infinite
    }

    pub fn headline(&self) -> String {
        format!("Table {} - Money: ${}", self.number, self.balance)
    }

    /// Parses both entry fields and configures the table from them.
    pub fn configure_input(&mut self, bet: &str, rounds: &str) -> Result<(), TableError> {
        let bet = parse_amount(bet)?;
        let rounds = parse_amount(rounds)?;
        self.configure(bet, rounds)
    }

    /// Leaves the table untouched on error.
    pub fn configure(&mut self, bet: i64, rounds: i64) -> Result<(), TableError> {
        if self.running {
            return Err(TableError::AlreadyRunning);
        }
        validate(bet, rounds)?;
        self.apply(bet, rounds);
        self.bet_input = Some(bet);
        self.rounds_input = Some(rounds);
        self.status = Status::Configured;
        Ok(())
    }

    /// Starts a run from the held bet and round inputs. The first step is always due immediately.
    pub fn start(&mut self) -> Result<Policy, TableError> {
        if self.running {
            return Err(TableError::AlreadyRunning);
        }
        let (bet, rounds) = match (self.bet_input, self.rounds_input) {
            (Some(bet), Some(rounds)) => (bet, rounds),
            _ => {
                self.history.push(HistoryEntry::UnparsableInput);
                return Err(TableError::InvalidInput(format!(
                    "table {} has no bet amount or round count",
                    self.number
                )));
            }
        };
        if let Err(err) = validate(bet, rounds) {
            self.history.push(HistoryEntry::OutOfRangeInput);
            return Err(err);
        }

        self.apply(bet, rounds);
        self.running = true;
        self.status = Status::Running;
        self.generation += 1;
        info!(
            "table {} started: bet {}, {}",
            self.number,
            bet,
            match self.mode {
                Mode::Infinite => "until stopped".to_string(),
                Mode::Finite => format!("{} rounds", rounds),
            }
        );
        Ok(Policy::Immediate)
    }

    /// Returns whether the run was actually stopped. Finite runs ignore this.
    pub fn stop(&mut self) -> bool {
        if !self.can_stop() {
            return false;
        }
        self.running = false;
        self.status = Status::Stopped;
        info!("table {} stopped at ${}", self.number, self.balance);
        true
    }

    /// Batch bet update: overrides the live bet and the held input, mid-run included.
    pub fn set_bet_input(&mut self, amount: i64) {
        self.current_bet = amount;
        self.bet_input = Some(amount);
    }

    /// Batch round update. No range check happens here; a non-positive count ends a finite run.
    pub fn set_rounds_input(&mut self, count: i64) {
        self.rounds_remaining = count;
        self.rounds_input = Some(count);
    }

    pub fn step(&mut self, wheel: &mut dyn SpinSource) -> Step {
        if !self.running {
            return Step::Skipped;
        }
        if self.mode == Mode::Finite && self.rounds_remaining <= 0 {
            return Step::Halted(self.halt(Status::Exhausted, None));
        }
        if self.balance <= 0 {
            warn!("table {} is out of money", self.number);
            return Step::Halted(self.halt(Status::OutOfFunds, Some(HistoryEntry::OutOfFunds)));
        }
        if self.current_bet > self.balance {
            warn!(
                "table {} cannot cover bet ${} with ${}",
                self.number, self.current_bet, self.balance
            );
            return Step::Halted(
                self.halt(Status::BetExceedsBalance, Some(HistoryEntry::BetExceedsBalance)),
            );
        }
        if self.balance.checked_add(self.current_bet).is_none() {
            warn!("table {} is at the table limit with ${}", self.number, self.balance);
            return Step::Halted(self.halt(Status::TableLimit, Some(HistoryEntry::TableLimit)));
        }

        let bet = self.current_bet;
        let spin = wheel.spin();
        self.history.push(HistoryEntry::Round {
            bet,
            choice: CHOICE,
            spin,
        });
        if spin.color == CHOICE {
            self.balance += bet;
            self.current_bet = match self.win_reload {
                WinReload::LastEntered => self.bet_input.unwrap_or(self.base_bet),
                WinReload::ConfiguredBase => self.base_bet,
            };
        } else {
            self.balance -= bet;
            self.current_bet = bet.saturating_mul(2);
        }
        debug!(
            "table {}: bet ${} on {}, landed {}, balance ${}",
            self.number, bet, CHOICE, spin, self.balance
        );

        match self.mode {
            Mode::Infinite => Step::Again(Policy::Delayed(self.spin_delay)),
            Mode::Finite => {
                self.rounds_remaining -= 1;
                if self.rounds_remaining > 0 {
                    Step::Again(Policy::Immediate)
                } else {
                    Step::Halted(self.halt(Status::Exhausted, None))
                }
            }
        }
    }

    fn apply(&mut self, bet: i64, rounds: i64) {
        self.current_bet = bet;
        self.base_bet = bet;
        self.rounds_remaining = rounds;
        self.mode = if rounds == 0 {
            Mode::Infinite
        } else {
            Mode::Finite
        };
    }

    fn halt(&mut self, status: Status, entry: Option<HistoryEntry>) -> Status {
        if let Some(entry) = entry {
            self.history.push(entry);
        }
        self.running = false;
        self.status = status;
        info!(
            "table {} finished ({:?}) with ${}",
            self.number, status, self.balance
        );
        status
    }
}

fn validate(bet: i64, rounds: i64) -> Result<(), TableError> {
    if rounds < 0 || bet <= 0 {
        return Err(TableError::InvalidInput(
            "round count cannot be negative and bet amount must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roulette::tests::Scripted;
    use proptest::prelude::*;

    fn table_with(balance: i64) -> Table {
        let settings = TableSettings {
            starting_balance: balance,
            ..TableSettings::default()
        };
        Table::new(1, &settings)
    }

    #[test]
    fn configure_does_not_start() {
        let mut table = table_with(10_000);
        table.configure(25, 3).unwrap();
        assert!(!table.is_running());
        assert_eq!(table.status(), Status::Configured);
        assert_eq!(table.mode(), Mode::Finite);
        assert_eq!(table.current_bet(), 25);
        assert_eq!(table.rounds_remaining(), 3);

        table.configure(10, 0).unwrap();
        assert_eq!(table.mode(), Mode::Infinite);
    }

    #[test]
    fn rejects_bad_configuration_without_changes() {
        let mut table = table_with(10_000);
        for (bet, rounds) in [("5", "-1"), ("0", "3"), ("-5", "0"), ("abc", "1"), ("5", "1.5")] {
            let err = table.configure_input(bet, rounds).unwrap_err();
            assert!(matches!(err, TableError::InvalidInput(_)), "{bet}/{rounds}");
        }
        assert_eq!(table.status(), Status::Idle);
        assert_eq!(table.current_bet(), 5);
        assert_eq!(table.rounds_input(), None);
        assert!(table.history().is_empty());
    }

    #[test]
    fn single_winning_round_exhausts() {
        let mut table = table_with(10_000);
        table.configure(5, 1).unwrap();
        assert_eq!(table.start(), Ok(Policy::Immediate));
        let mut wheel = Scripted::new(&[2]);
        assert_eq!(table.step(&mut wheel), Step::Halted(Status::Exhausted));
        assert_eq!(table.balance(), 10_005);
        assert_eq!(table.history().len(), 1);
        assert_eq!(
            table.history()[0].to_string(),
            "Bet: $5, Choice: black, Result: 2 black"
        );
        assert!(!table.is_running());
    }

    #[test]
    fn losses_double_the_bet() {
        let mut table = table_with(10_000);
        table.configure(5, 4).unwrap();
        table.start().unwrap();
        let mut wheel = Scripted::new(&[0, 7, 11]);
        for expected in [(9_995, 10), (9_985, 20), (9_965, 40)] {
            assert_eq!(table.step(&mut wheel), Step::Again(Policy::Immediate));
            assert_eq!((table.balance(), table.current_bet()), expected);
        }
        assert_eq!(table.rounds_remaining(), 1);
    }

    #[test]
    fn win_reloads_last_entered_bet() {
        let mut table = table_with(10_000);
        table.configure(5, 5).unwrap();
        table.start().unwrap();
        let mut wheel = Scripted::new(&[1, 4]);
        table.step(&mut wheel);
        assert_eq!(table.current_bet(), 10);
        table.set_bet_input(50);
        assert_eq!(table.current_bet(), 50);
        table.step(&mut wheel);
        assert_eq!(table.balance(), 10_045);
        assert_eq!(table.current_bet(), 50);
    }

    #[test]
    fn win_can_reset_to_configured_base() {
        let settings = TableSettings {
            win_reload: WinReload::ConfiguredBase,
            ..TableSettings::default()
        };
        let mut table = Table::new(3, &settings);
        table.configure(5, 5).unwrap();
        table.start().unwrap();
        table.set_bet_input(50);
        let mut wheel = Scripted::new(&[3, 8]);
        table.step(&mut wheel);
        assert_eq!(table.current_bet(), 100);
        table.step(&mut wheel);
        assert_eq!(table.current_bet(), 5);
    }

    #[test]
    fn unaffordable_bet_halts_before_spinning() {
        let mut table = table_with(5);
        table.configure(10, 1).unwrap();
        table.start().unwrap();
        let mut wheel = Scripted::new(&[2]);
        assert_eq!(table.step(&mut wheel), Step::Halted(Status::BetExceedsBalance));
        assert_eq!(table.balance(), 5);
        assert_eq!(
            table.history().last().map(ToString::to_string).as_deref(),
            Some("Error: Bet amount exceeds available money.")
        );
    }

    #[test]
    fn empty_bankroll_is_game_over() {
        let mut table = table_with(15);
        table.configure(5, 0).unwrap();
        table.start().unwrap();
        let mut wheel = Scripted::new(&[1, 3]);
        assert_eq!(
            table.step(&mut wheel),
            Step::Again(Policy::Delayed(Duration::from_millis(100)))
        );
        assert_eq!(
            table.step(&mut wheel),
            Step::Again(Policy::Delayed(Duration::from_millis(100)))
        );
        assert_eq!(table.balance(), 0);
        assert_eq!(table.step(&mut wheel), Step::Halted(Status::OutOfFunds));
        assert_eq!(table.history().last(), Some(&HistoryEntry::OutOfFunds));
        // a fresh start goes straight back to the guard
        table.start().unwrap();
        assert_eq!(table.step(&mut wheel), Step::Halted(Status::OutOfFunds));
    }

    #[test]
    fn stop_only_interrupts_infinite_runs() {
        let mut table = table_with(10_000);
        table.configure(5, 3).unwrap();
        table.start().unwrap();
        assert!(!table.can_stop());
        assert!(!table.stop());
        assert!(table.is_running());

        let mut wheel = Scripted::new(&[2]);
        while let Step::Again(_) = table.step(&mut wheel) {}
        assert_eq!(table.history().len(), 3);

        table.configure(5, 0).unwrap();
        table.start().unwrap();
        assert!(table.can_stop());
        assert!(table.stop());
        assert_eq!(table.status(), Status::Stopped);
        assert_eq!(table.step(&mut wheel), Step::Skipped);
    }

    #[test]
    fn start_requires_round_input() {
        let mut table = table_with(10_000);
        assert!(matches!(table.start(), Err(TableError::InvalidInput(_))));
        assert_eq!(table.history(), &[HistoryEntry::UnparsableInput]);
        assert!(!table.is_running());
    }

    #[test]
    fn negative_batch_rounds_end_a_finite_run_and_block_restart() {
        let mut table = table_with(10_000);
        table.configure(5, 10).unwrap();
        table.start().unwrap();
        let mut wheel = Scripted::new(&[2]);
        table.step(&mut wheel);
        table.set_rounds_input(-3);
        assert_eq!(table.rounds_remaining(), -3);
        assert_eq!(table.step(&mut wheel), Step::Halted(Status::Exhausted));
        assert_eq!(table.history().len(), 1);

        assert!(matches!(table.start(), Err(TableError::InvalidInput(_))));
        assert_eq!(table.history().last(), Some(&HistoryEntry::OutOfRangeInput));
    }

    #[test]
    fn restart_bumps_generation() {
        let mut table = table_with(10_000);
        table.configure(5, 0).unwrap();
        table.start().unwrap();
        assert_eq!(table.start(), Err(TableError::AlreadyRunning));
        table.stop();
        table.start().unwrap();
        assert_eq!(table.generation(), 2);
    }

    #[test]
    fn win_past_the_table_limit_halts_instead_of_overflowing() {
        let mut table = table_with(i64::MAX - 1);
        table.configure(1_000, 1).unwrap();
        table.start().unwrap();
        let mut wheel = Scripted::new(&[2]);
        assert_eq!(table.step(&mut wheel), Step::Halted(Status::TableLimit));
        assert_eq!(table.balance(), i64::MAX - 1);
        assert_eq!(table.history(), &[HistoryEntry::TableLimit]);
        assert_eq!(table.status().failure(), Some(TableError::TableLimit));
    }

    #[test]
    fn guard_statuses_map_to_errors() {
        assert_eq!(Status::OutOfFunds.failure(), Some(TableError::OutOfFunds));
        assert_eq!(
            Status::BetExceedsBalance.failure(),
            Some(TableError::BetExceedsBalance)
        );
        assert_eq!(Status::Exhausted.failure(), None);
        assert_eq!(Status::Stopped.failure(), None);
    }

    fn invalid_config() -> impl Strategy<Value = (i64, i64)> {
        prop_oneof![
            (i64::MIN..=0, any::<i64>()),
            (1i64.., i64::MIN..0),
        ]
    }

    proptest! {
        #[test]
        fn valid_configs_are_accepted_but_not_started(bet in 1i64.., rounds in 0i64..) {
            let mut table = table_with(10_000);
            prop_assert!(table.configure(bet, rounds).is_ok());
            prop_assert!(!table.is_running());
            prop_assert_eq!(table.status(), Status::Configured);
            prop_assert_eq!(table.current_bet(), bet);
            prop_assert_eq!(table.rounds_remaining(), rounds);
            let mode = if rounds == 0 { Mode::Infinite } else { Mode::Finite };
            prop_assert_eq!(table.mode(), mode);
        }

        #[test]
        fn invalid_configs_leave_the_table_alone((bet, rounds) in invalid_config()) {
            let mut table = table_with(10_000);
            let err = table.configure(bet, rounds).unwrap_err();
            prop_assert!(matches!(err, TableError::InvalidInput(_)));
            prop_assert_eq!(table.status(), Status::Idle);
            prop_assert_eq!(table.current_bet(), 5);
            prop_assert_eq!(table.bet_input(), Some(5));
            prop_assert_eq!(table.rounds_input(), None);
            prop_assert!(table.history().is_empty());
        }

        #[test]
        fn unparsable_inputs_are_rejected(bet in "[a-z]{1,6}", rounds in "-?[0-9]{1,4}") {
            let mut table = table_with(10_000);
            let err = table.configure_input(&bet, &rounds).unwrap_err();
            prop_assert!(matches!(err, TableError::InvalidInput(_)));
            prop_assert_eq!(table.status(), Status::Idle);
        }

        #[test]
        fn one_round_moves_balance_by_the_bet(
            (balance, bet) in (1i64..1_000_000_000_000).prop_flat_map(|b| (Just(b), 1..=b)),
            pocket in 0u8..=36,
        ) {
            let mut table = table_with(balance);
            table.configure(bet, 1).unwrap();
            table.start().unwrap();
            let mut wheel = Scripted::new(&[pocket]);
            prop_assert_eq!(table.step(&mut wheel), Step::Halted(Status::Exhausted));
            if pocket != 0 && pocket % 2 == 0 {
                prop_assert_eq!(table.balance(), balance + bet);
                prop_assert_eq!(table.current_bet(), bet);
            } else {
                prop_assert_eq!(table.balance(), balance - bet);
                prop_assert_eq!(table.current_bet(), 2 * bet);
            }
        }
    }
}
