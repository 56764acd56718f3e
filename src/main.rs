use anyhow::Result;
use dotenv::dotenv;
use log::info;
use tokio::sync::mpsc;

use roulette_floor::config::ConfigData;
use roulette_floor::floor::run as run_floor;
use roulette_floor::{console, Floor, Wheel};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = ConfigData::path();
    let config = ConfigData::load(&path).await?;
    info!(
        "opening {} tables with ${} each (settings from {})",
        config.table_count,
        config.starting_balance,
        path.display()
    );

    let floor = Floor::new(
        config.table_count,
        &config.table_settings(),
        Box::new(Wheel::seeded(config.seed)),
    );
    let events = floor.subscribe();
    let (commands, inbox) = mpsc::channel(64);

    let floor_task = tokio::spawn(run_floor(floor, inbox));
    tokio::spawn(console::print_events(events));

    console::run(commands, config, &path).await?;
    floor_task.await?;
    Ok(())
}
