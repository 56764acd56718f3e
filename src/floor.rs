use crate::error::{parse_amount, TableError};
use crate::history::HistoryEntry;
use crate::roulette::SpinSource;
use crate::scheduler::Scheduler;
use crate::table::{Status, Step, Table, TableSettings};
use log::{error, info, warn};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

const EVENT_BACKLOG: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloorEvent {
    Entry {
        table: usize,
        balance: i64,
        entry: HistoryEntry,
    },
    Status {
        table: usize,
        status: Status,
    },
}

/// Read-only copy of a table for display.
#[derive(Debug, Clone)]
pub struct TableView {
    pub number: usize,
    pub headline: String,
    pub status: Status,
    pub can_stop: bool,
    pub bet_input: Option<i64>,
    pub rounds_input: Option<i64>,
    pub history: Vec<String>,
}

impl From<&Table> for TableView {
    fn from(table: &Table) -> Self {
        TableView {
            number: table.number(),
            headline: table.headline(),
            status: table.status(),
            can_stop: table.can_stop(),
            bet_input: table.bet_input(),
            rounds_input: table.rounds_input(),
            history: table.history().iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug)]
pub enum Command {
    Configure {
        table: usize,
        bet: String,
        rounds: String,
    },
    Start(usize),
    Stop(usize),
    SetBetForAll(String),
    SetRoundsForAll(String),
    StartAll,
    StopAll,
    Snapshot(oneshot::Sender<Vec<TableView>>),
}

/// All tables on one cooperative scheduler. Steps never interleave.
pub struct Floor {
    tables: Vec<Table>,
    scheduler: Scheduler,
    wheel: Box<dyn SpinSource + Send>,
    events: broadcast::Sender<FloorEvent>,
}

impl Floor {
    /// Tables are numbered from 1.
    pub fn new(count: usize, settings: &TableSettings, wheel: Box<dyn SpinSource + Send>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BACKLOG);
        Floor {
            tables: (1..=count).map(|n| Table::new(n, settings)).collect(),
            scheduler: Scheduler::new(),
            wheel,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FloorEvent> {
        self.events.subscribe()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, number: usize) -> Result<&Table, TableError> {
        number
            .checked_sub(1)
            .and_then(|idx| self.tables.get(idx))
            .ok_or(TableError::UnknownTable(number))
    }

    pub fn snapshot(&self) -> Vec<TableView> {
        self.tables.iter().map(TableView::from).collect()
    }

    pub fn configure(&mut self, number: usize, bet: &str, rounds: &str) -> Result<(), TableError> {
        let idx = self.index(number)?;
        self.tables[idx].configure_input(bet, rounds)?;
        self.publish_status(idx);
        Ok(())
    }

    pub fn start(&mut self, number: usize, now: Instant) -> Result<(), TableError> {
        let idx = self.index(number)?;
        let seen = self.tables[idx].history().len();
        let started = self.tables[idx].start();
        self.publish_entries(idx, seen);
        let policy = started?;
        let generation = self.tables[idx].generation();
        self.scheduler.schedule(idx, generation, policy, now);
        self.publish_status(idx);
        Ok(())
    }

    pub fn stop(&mut self, number: usize) -> Result<bool, TableError> {
        let idx = self.index(number)?;
        let stopped = self.tables[idx].stop();
        if stopped {
            self.publish_status(idx);
        }
        Ok(stopped)
    }

    /// Bad input is logged and ignored.
    pub fn set_bet_for_all(&mut self, input: &str) {
        let amount = match parse_amount(input) {
            Ok(amount) if amount > 0 => amount,
            _ => {
                error!("invalid bet amount for all tables: '{}'", input.trim());
                return;
            }
        };
        for table in &mut self.tables {
            table.set_bet_input(amount);
        }
        info!("bet set to ${} on {} tables", amount, self.tables.len());
    }

    /// Negative counts pass through; see `Table::set_rounds_input`.
    pub fn set_rounds_for_all(&mut self, input: &str) {
        let count = match parse_amount(input) {
            Ok(count) => count,
            Err(_) => {
                error!("invalid rounds amount for all tables: '{}'", input.trim());
                return;
            }
        };
        for table in &mut self.tables {
            table.set_rounds_input(count);
        }
        info!("rounds set to {} on {} tables", count, self.tables.len());
    }

    pub fn start_all(&mut self, now: Instant) {
        for number in 1..=self.tables.len() {
            if let Err(err) = self.start(number, now) {
                warn!("table {} did not start: {}", number, err);
            }
        }
    }

    pub fn stop_all(&mut self) {
        for idx in 0..self.tables.len() {
            if self.tables[idx].stop() {
                self.publish_status(idx);
            }
        }
    }

    pub fn next_wakeup(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_empty()
    }

    /// Runs every step due at `now`. Follow-up steps are queued after the pass,
    /// so an immediate requeue waits for the next tick.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut requeue = Vec::new();
        let mut steps = 0;
        while let Some((idx, generation)) = self.scheduler.pop_due(now) {
            let Some(table) = self.tables.get_mut(idx) else {
                continue;
            };
            if table.generation() != generation {
                continue;
            }
            let seen = table.history().len();
            let step = table.step(self.wheel.as_mut());
            steps += 1;
            self.publish_entries(idx, seen);
            match step {
                Step::Again(policy) => requeue.push((idx, generation, policy)),
                Step::Halted(status) => {
                    if let Some(err) = status.failure() {
                        warn!("table {} halted: {}", idx + 1, err);
                    }
                    self.publish_status(idx);
                }
                Step::Skipped => {}
            }
        }
        for (idx, generation, policy) in requeue {
            self.scheduler.schedule(idx, generation, policy, now);
        }
        steps
    }

    /// Ticks until nothing is queued, advancing a virtual clock to each due time.
    /// Only terminates once every infinite run has been stopped or gone broke.
    pub fn drain(&mut self, mut now: Instant) -> Instant {
        while let Some(due) = self.next_wakeup() {
            now = now.max(due);
            self.tick(now);
        }
        now
    }

    pub fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::Configure { table, bet, rounds } => {
                if let Err(err) = self.configure(table, &bet, &rounds) {
                    warn!("table {} not configured: {}", table, err);
                }
            }
            Command::Start(table) => {
                if let Err(err) = self.start(table, now) {
                    warn!("table {} did not start: {}", table, err);
                }
            }
            Command::Stop(table) => match self.stop(table) {
                Ok(false) => info!("table {} has no stoppable run", table),
                Ok(true) => {}
                Err(err) => warn!("{}", err),
            },
            Command::SetBetForAll(input) => self.set_bet_for_all(&input),
            Command::SetRoundsForAll(input) => self.set_rounds_for_all(&input),
            Command::StartAll => self.start_all(now),
            Command::StopAll => self.stop_all(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn index(&self, number: usize) -> Result<usize, TableError> {
        self.table(number).map(|_| number - 1)
    }

    fn publish_entries(&self, idx: usize, seen: usize) {
        let table = &self.tables[idx];
        for entry in &table.history()[seen..] {
            let _ = self.events.send(FloorEvent::Entry {
                table: table.number(),
                balance: table.balance(),
                entry: entry.clone(),
            });
        }
    }

    fn publish_status(&self, idx: usize) {
        let table = &self.tables[idx];
        let _ = self.events.send(FloorEvent::Status {
            table: table.number(),
            status: table.status(),
        });
    }
}

/// Drives the floor until the command channel closes.
pub async fn run(mut floor: Floor, mut commands: mpsc::Receiver<Command>) {
    loop {
        floor.tick(Instant::now());
        let wakeup = floor.next_wakeup();
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => floor.handle(command, Instant::now()),
                None => break,
            },
            _ = wait_for(wakeup) => {}
        }
    }
    info!("floor closed");
}

async fn wait_for(wakeup: Option<Instant>) {
    match wakeup {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
