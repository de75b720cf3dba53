//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading leave policy
//! data from YAML files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{CalendarConfig, RosterConfig, StudentRecord};

/// Loads and provides access to leave policy data.
///
/// # Directory Structure
///
/// ```text
/// config/michaelhouse/
/// ├── calendar.yaml   # Terms and cohort closed periods
/// └── roster.yaml     # Guardians, administrators, students, restrictions
/// ```
///
/// # Example
///
/// ```no_run
/// use exeat_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/michaelhouse")?;
/// println!("{} students loaded", loader.roster().students.len());
/// # Ok::<(), exeat_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    calendar: CalendarConfig,
    roster: RosterConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Fails if either file is missing, contains invalid YAML, or the roster
    /// references students or date ranges that do not make sense.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let calendar_path = path.join("calendar.yaml");
        let calendar = Self::load_yaml::<CalendarConfig>(&calendar_path)?;

        let roster_path = path.join("roster.yaml");
        let roster = Self::load_yaml::<RosterConfig>(&roster_path)?;

        Self::validate(
            &calendar_path.display().to_string(),
            &roster_path.display().to_string(),
            &calendar,
            &roster,
        )?;

        Ok(Self { calendar, roster })
    }

    /// Builds a loader from already-parsed parts, applying the same checks.
    pub fn from_parts(calendar: CalendarConfig, roster: RosterConfig) -> EngineResult<Self> {
        Self::validate("<calendar>", "<roster>", &calendar, &roster)?;
        Ok(Self { calendar, roster })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    fn validate(
        calendar_path: &str,
        roster_path: &str,
        calendar: &CalendarConfig,
        roster: &RosterConfig,
    ) -> EngineResult<()> {
        let calendar_error = |message: String| EngineError::ConfigParseError {
            path: calendar_path.to_string(),
            message,
        };
        let roster_error = |message: String| EngineError::ConfigParseError {
            path: roster_path.to_string(),
            message,
        };

        if let Some(term) = calendar.terms.iter().find(|term| term.start > term.end) {
            return Err(calendar_error(format!("term '{}' ends before it starts", term.name)));
        }
        if let Some(period) = calendar.closed_periods.iter().find(|period| period.start > period.end) {
            return Err(calendar_error(format!(
                "closed period '{}' ends before it starts",
                period.reason
            )));
        }

        let mut known = HashSet::new();
        for student in &roster.students {
            if !known.insert(student.admin_number.as_str()) {
                return Err(roster_error(format!(
                    "duplicate student {}",
                    student.admin_number
                )));
            }
        }
        for guardian in &roster.guardians {
            if let Some(missing) = guardian.students.iter().find(|n| !known.contains(n.as_str())) {
                return Err(roster_error(format!(
                    "guardian {} is linked to unknown student {missing}",
                    guardian.auth_id
                )));
            }
        }
        for restriction in &roster.restrictions {
            if !known.contains(restriction.admin_number.as_str()) {
                return Err(roster_error(format!(
                    "restriction references unknown student {}",
                    restriction.admin_number
                )));
            }
            if restriction.start > restriction.end {
                return Err(roster_error(format!(
                    "restriction for {} ends before it starts",
                    restriction.admin_number
                )));
            }
        }
        Ok(())
    }

    /// Returns the calendar.
    pub fn calendar(&self) -> &CalendarConfig {
        &self.calendar
    }

    /// Returns the roster.
    pub fn roster(&self) -> &RosterConfig {
        &self.roster
    }

    /// Looks up a student record by admin number.
    pub fn find_student(&self, admin_number: &str) -> Option<&StudentRecord> {
        self.roster
            .students
            .iter()
            .find(|student| student.admin_number == admin_number)
    }

    /// Consumes the loader.
    pub fn into_parts(self) -> (CalendarConfig, RosterConfig) {
        (self.calendar, self.roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{GuardianRecord, Term};
    use crate::models::Cohort;
    use chrono::NaiveDate;

    fn config_path() -> &'static str {
        "./config/michaelhouse"
    }

    #[test]
    fn test_load_valid_config() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
    }

    #[test]
    fn test_roster_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let james = loader.find_student("12345").unwrap();
        assert_eq!(james.first_name, "James");
        assert_eq!(james.cohort, Cohort::C);
        assert_eq!(james.balances.overnight, 3);

        let michael = loader.find_student("67890").unwrap();
        assert_eq!(michael.cohort, Cohort::E);
        assert_eq!(michael.balances.overnight, 2);

        assert!(loader.find_student("99999").is_none());
    }

    #[test]
    fn test_calendar_loaded_correctly() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        assert!(!loader.calendar().terms.is_empty());
        assert!(
            loader
                .calendar()
                .closed_periods
                .iter()
                .any(|period| period.reason == "First weekend of term")
        );
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("calendar.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_guardian_linked_to_unknown_student_is_rejected() {
        let roster = RosterConfig {
            guardians: vec![GuardianRecord {
                auth_id: "PARENT_009".to_string(),
                name: "Nobody".to_string(),
                phone: Some("27000000000".to_string()),
                email: None,
                students: vec!["11111".to_string()],
            }],
            ..RosterConfig::default()
        };

        match ConfigLoader::from_parts(CalendarConfig::default(), roster) {
            Err(EngineError::ConfigParseError { message, .. }) => {
                assert!(message.contains("11111"));
            }
            other => panic!("Expected ConfigParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_term_is_rejected() {
        let calendar = CalendarConfig {
            terms: vec![Term {
                name: "Backwards".to_string(),
                start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            }],
            closed_periods: vec![],
        };
        assert!(ConfigLoader::from_parts(calendar, RosterConfig::default()).is_err());
    }
}
