use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::parse_amount;
use crate::floor::Command;
use crate::table::{TableSettings, WinReload};

pub const CONFIG_ENV: &str = "ROULETTE_CONFIG";
const CONFIG_FILE: &str = "roulette_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigData {
    pub table_count: usize,
    pub starting_balance: i64,
    pub initial_bet: i64,
    pub initial_rounds: Option<i64>,
    pub spin_delay_ms: u64,
    pub win_reload: WinReload,
    pub seed: Option<u64>,
    pub history_window: usize,
}

impl Default for ConfigData {
    fn default() -> Self {
        ConfigData {
            table_count: 12,
            starting_balance: 10_000,
            initial_bet: 5,
            initial_rounds: None,
            spin_delay_ms: 100,
            win_reload: WinReload::LastEntered,
            seed: None,
            history_window: 6,
        }
    }
}

impl ConfigData {
    /// `ROULETTE_CONFIG` if set, otherwise the file next to the working directory.
    pub fn path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE))
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path).await?;
            serde_json::from_str(&content)?
        } else {
            ConfigData::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.table_count > 0, "table_count must be at least 1");
        ensure!(self.initial_bet > 0, "initial_bet must be positive");
        ensure!(self.starting_balance > 0, "starting_balance must be positive");
        ensure!(
            self.initial_rounds.map_or(true, |rounds| rounds >= 0),
            "initial_rounds cannot be negative"
        );
        Ok(())
    }

    /// Folds accepted batch settings in, so `save` keeps them for the next session.
    /// Values a fresh table could not start with are left out.
    pub fn remember(&mut self, command: &Command) {
        match command {
            Command::SetBetForAll(input) => match parse_amount(input) {
                Ok(amount) if amount > 0 => self.initial_bet = amount,
                _ => {}
            },
            Command::SetRoundsForAll(input) => match parse_amount(input) {
                Ok(count) if count >= 0 => self.initial_rounds = Some(count),
                _ => {}
            },
            _ => {}
        }
    }

    pub fn table_settings(&self) -> TableSettings {
        TableSettings {
            starting_balance: self.starting_balance,
            initial_bet: self.initial_bet,
            initial_rounds: self.initial_rounds,
            spin_delay: Duration::from_millis(self.spin_delay_ms),
            win_reload: self.win_reload,
        }
    }
}
