pub mod config;
pub mod console;
pub mod error;
pub mod floor;
pub mod history;
pub mod roulette;
pub mod scheduler;
pub mod table;

pub use error::TableError;
pub use floor::{Command, Floor, FloorEvent};
pub use roulette::{Color, Spin, SpinSource, Wheel};
pub use table::{Mode, Status, Table, TableSettings, WinReload};
