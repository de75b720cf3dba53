//! Configuration loading for the exeat engine.
//!
//! Policy data (term calendar, closed periods, roster) is loaded from YAML
//! files by [`ConfigLoader`]; runtime settings come from the environment via
//! [`Settings`].
//!
//! # Example
//!
//! ```no_run
//! use exeat_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/michaelhouse").unwrap();
//! println!("{} terms configured", config.calendar().terms.len());
//! ```

mod loader;
mod settings;
mod types;

pub use loader::ConfigLoader;
pub use settings::{
    AppEnvironment, DEFAULT_CONFIG_DIR, ServerSettings, Settings, TelemetryConfig,
};
pub use types::{
    AdministratorRecord, CalendarConfig, ClosedPeriod, DateValidity, GuardianRecord,
    RestrictionRecord, RosterConfig, StudentRecord, Term,
};
