pub mod logger;

pub use logger::{AttemptLog, TurnLog, TurnLogger};
