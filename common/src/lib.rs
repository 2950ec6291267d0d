pub mod command;
pub mod config;
pub mod decode;
pub mod error;
pub mod schedule;
pub mod types;

pub use config::RuntimeConfig;
pub use error::Error;
pub use schedule::{DayOfWeek, DesiredSchedule, ScheduleTime};
pub use types::{InputSource, PowerState};

pub type Result<T> = std::result::Result<T, Error>;
