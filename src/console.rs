use anyhow::{anyhow, bail, Result};
use log::{error, info};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::ConfigData;
use crate::floor::{Command, FloorEvent, TableView};
use crate::history::HistoryEntry;

pub const HELP: &str = "\
commands:
  configure <table> <bet> <rounds>   set one table's bet and rounds (0 rounds = until stopped)
  start <table> | stop <table>
  bet-all <amount>                   set the bet on every table
  rounds-all <count>                 set the round count on every table
  start-all | stop-all
  show [table]                       balances and recent history
  save-config                        write the current settings file
  help | quit";

#[derive(Debug)]
pub enum Input {
    Floor(Command),
    Show(Option<usize>),
    SaveConfig,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let input = match (verb, args.as_slice()) {
        ("configure", [table, bet, rounds]) => Input::Floor(Command::Configure {
            table: table_number(table)?,
            bet: bet.to_string(),
            rounds: rounds.to_string(),
        }),
        ("start", [table]) => Input::Floor(Command::Start(table_number(table)?)),
        ("stop", [table]) => Input::Floor(Command::Stop(table_number(table)?)),
        ("bet-all", [amount]) => Input::Floor(Command::SetBetForAll(amount.to_string())),
        ("rounds-all", [count]) => Input::Floor(Command::SetRoundsForAll(count.to_string())),
        ("start-all", []) => Input::Floor(Command::StartAll),
        ("stop-all", []) => Input::Floor(Command::StopAll),
        ("show", []) => Input::Show(None),
        ("show", [table]) => Input::Show(Some(table_number(table)?)),
        ("save-config", []) => Input::SaveConfig,
        ("help", []) => Input::Help,
        ("quit" | "exit", []) => Input::Quit,
        _ => bail!("unrecognised command '{}', try 'help'", line.trim()),
    };
    Ok(Some(input))
}

fn table_number(word: &str) -> Result<usize> {
    word.parse()
        .map_err(|_| anyhow!("'{}' is not a table number", word))
}

/// One block per table: headline, status, then the last `window` history lines.
pub fn render(views: &[TableView], window: usize) -> String {
    let mut out = String::new();
    for view in views {
        out.push_str(&format!(
            "{} [{:?}{}] bet input: {} rounds input: {}\n",
            view.headline,
            view.status,
            if view.can_stop { ", stoppable" } else { "" },
            show_input(view.bet_input),
            show_input(view.rounds_input),
        ));
        let skip = view.history.len().saturating_sub(window);
        for line in &view.history[skip..] {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

fn show_input(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Prints status changes and anything that ended a run. Round lines are left to `show`.
pub async fn print_events(mut events: broadcast::Receiver<FloorEvent>) {
    loop {
        match events.recv().await {
            Ok(FloorEvent::Status { table, status }) => println!("Table {}: {:?}", table, status),
            Ok(FloorEvent::Entry {
                table,
                balance,
                entry,
            }) if !matches!(entry, HistoryEntry::Round { .. }) => {
                println!("Table {} - Money: ${}: {}", table, balance, entry)
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                info!("display skipped {} events", missed)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub async fn run(
    commands: mpsc::Sender<Command>,
    mut config: ConfigData,
    config_path: &Path,
) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(err) => {
                println!("{}", err);
                continue;
            }
        };
        match input {
            Input::Floor(command) => {
                config.remember(&command);
                commands.send(command).await?
            }
            Input::Show(table) => {
                let (reply, views) = oneshot::channel();
                commands.send(Command::Snapshot(reply)).await?;
                let views = views.await?;
                let views: Vec<TableView> = match table {
                    Some(number) => views.into_iter().filter(|v| v.number == number).collect(),
                    None => views,
                };
                if views.is_empty() {
                    println!("no such table");
                } else {
                    print!("{}", render(&views, config.history_window));
                }
            }
            Input::SaveConfig => match config.save(config_path).await {
                Ok(()) => println!("saved {}", config_path.display()),
                Err(err) => error!("could not save {}: {:#}", config_path.display(), err),
            },
            Input::Help => println!("{}", HELP),
            Input::Quit => break,
        }
    }
    Ok(())
}
