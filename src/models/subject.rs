//! Subject (student) model and related types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::LeaveCategory;

/// Grade/cohort code, ordered from youngest (`A`) to oldest (`E`).
///
/// Cohorts select cohort-specific closed calendar periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Cohort {
    /// A block.
    A,
    /// B block.
    B,
    /// C block.
    C,
    /// D block.
    D,
    /// E block.
    E,
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Cohort::A => "A",
            Cohort::B => "B",
            Cohort::C => "C",
            Cohort::D => "D",
            Cohort::E => "E",
        };
        f.write_str(code)
    }
}

impl FromStr for Cohort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "A" | "a" => Ok(Cohort::A),
            "B" | "b" => Ok(Cohort::B),
            "C" | "c" => Ok(Cohort::C),
            "D" | "d" => Ok(Cohort::D),
            "E" | "e" => Ok(Cohort::E),
            other => Err(format!("unknown cohort '{other}'")),
        }
    }
}

/// Remaining leave allowances for a subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Overnight leaves remaining.
    pub overnight: u32,
    /// Friday supper leaves remaining.
    pub friday_supper: u32,
}

impl Balances {
    /// The balance charged for `category`, or `None` for unlimited categories.
    pub fn for_category(&self, category: LeaveCategory) -> Option<u32> {
        match category {
            LeaveCategory::Overnight => Some(self.overnight),
            LeaveCategory::FridaySupper => Some(self.friday_supper),
            LeaveCategory::DayLeave | LeaveCategory::Special => None,
        }
    }
}

/// The student a leave request is for.
///
/// Sourced fresh from the policy store for every request.
///
/// # Example
///
/// ```
/// use exeat_engine::models::{Balances, Cohort, IdentifierMatch, Subject};
///
/// let subject = Subject {
///     admin_number: "12345".to_string(),
///     first_name: "James".to_string(),
///     last_name: "Smith".to_string(),
///     house: "Finningley".to_string(),
///     cohort: Cohort::C,
///     balances: Balances { overnight: 3, friday_supper: 3 },
/// };
/// assert_eq!(subject.full_name(), "James Smith");
/// assert_eq!(subject.identifier_match("james"), IdentifierMatch::OneName);
/// assert_eq!(subject.identifier_match("James Smith"), IdentifierMatch::FullName);
/// assert_eq!(subject.identifier_match("Jameson"), IdentifierMatch::Unrelated);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Unique five-digit admin number.
    pub admin_number: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// House/unit affiliation.
    pub house: String,
    /// Grade/cohort code.
    pub cohort: Cohort,
    /// Current balances.
    pub balances: Balances,
}

impl Subject {
    /// Display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// How strongly a free-text identifier refers to this subject.
    ///
    /// Names are compared as whole words, case-insensitively. An admin number
    /// only counts when it is the entire identifier.
    pub fn identifier_match(&self, identifier: &str) -> IdentifierMatch {
        let identifier = identifier.trim();
        if identifier == self.admin_number {
            return IdentifierMatch::AdminNumber;
        }
        let words = name_words(identifier);
        match (
            name_appears(&self.first_name, &words),
            name_appears(&self.last_name, &words),
        ) {
            (true, true) => IdentifierMatch::FullName,
            (true, false) | (false, true) => IdentifierMatch::OneName,
            (false, false) => IdentifierMatch::Unrelated,
        }
    }

    /// The compact view carried on decisions.
    pub fn summary(&self) -> SubjectSummary {
        SubjectSummary {
            admin_number: self.admin_number.clone(),
            name: self.full_name(),
            house: self.house.clone(),
            cohort: self.cohort,
        }
    }
}

/// Strength of the link between an identifier and a subject, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentifierMatch {
    /// Nothing in the identifier names the subject.
    Unrelated,
    /// Only the first or only the last name appears.
    OneName,
    /// Both first and last name appear.
    FullName,
    /// The identifier is the admin number.
    AdminNumber,
}

/// Picks the subject an identifier refers to from a guardian's students.
///
/// The strongest match wins. When several students share the strongest
/// match (siblings named only by surname, say) nothing is linked.
pub fn select_by_identifier<I>(candidates: I, identifier: &str) -> Option<Subject>
where
    I: IntoIterator<Item = Subject>,
{
    let mut best: Option<(IdentifierMatch, Subject)> = None;
    let mut ambiguous = false;

    for subject in candidates {
        let strength = subject.identifier_match(identifier);
        if strength == IdentifierMatch::Unrelated {
            continue;
        }
        match best.as_ref().map(|(current, _)| *current) {
            Some(current) if strength < current => {}
            Some(current) if strength == current => ambiguous = true,
            _ => {
                best = Some((strength, subject));
                ambiguous = false;
            }
        }
    }

    if ambiguous { None } else { best.map(|(_, subject)| subject) }
}

fn name_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True if every word of `name` appears, in order, as consecutive words.
fn name_appears(name: &str, words: &[String]) -> bool {
    let parts = name_words(name);
    !parts.is_empty() && words.windows(parts.len()).any(|window| window == parts.as_slice())
}

/// The subject fields a response layer needs to phrase a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSummary {
    /// Admin number.
    pub admin_number: String,
    /// Display name.
    pub name: String,
    /// House/unit.
    pub house: String,
    /// Cohort.
    pub cohort: Cohort,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_subject() -> Subject {
        Subject {
            admin_number: "67890".to_string(),
            first_name: "Michael".to_string(),
            last_name: "Doe".to_string(),
            house: "Shepstone".to_string(),
            cohort: Cohort::E,
            balances: Balances {
                overnight: 2,
                friday_supper: 3,
            },
        }
    }

    #[test]
    fn test_cohorts_are_ordered() {
        assert!(Cohort::A < Cohort::B);
        assert!(Cohort::D < Cohort::E);
    }

    #[test]
    fn test_cohort_parses_either_case() {
        assert_eq!("e".parse::<Cohort>().unwrap(), Cohort::E);
        assert_eq!("C".parse::<Cohort>().unwrap(), Cohort::C);
        assert!("F".parse::<Cohort>().is_err());
    }

    fn create_sibling(admin_number: &str, first_name: &str) -> Subject {
        Subject {
            admin_number: admin_number.to_string(),
            first_name: first_name.to_string(),
            last_name: "Smith".to_string(),
            house: "Finningley".to_string(),
            cohort: Cohort::C,
            balances: Balances::default(),
        }
    }

    fn siblings() -> Vec<Subject> {
        vec![create_sibling("12345", "James"), create_sibling("23456", "Peter")]
    }

    fn selected(identifier: &str) -> Option<String> {
        select_by_identifier(siblings(), identifier).map(|subject| subject.admin_number)
    }

    #[test]
    fn test_matches_admin_number_exactly() {
        let subject = create_test_subject();
        assert_eq!(subject.identifier_match("67890"), IdentifierMatch::AdminNumber);
        assert_eq!(subject.identifier_match("6789"), IdentifierMatch::Unrelated);
        assert_eq!(subject.identifier_match("167890"), IdentifierMatch::Unrelated);
    }

    #[test]
    fn test_matches_full_name_or_either_part() {
        let subject = create_test_subject();
        assert_eq!(subject.identifier_match("Michael Doe"), IdentifierMatch::FullName);
        assert_eq!(subject.identifier_match("michael"), IdentifierMatch::OneName);
        assert_eq!(subject.identifier_match("Doe"), IdentifierMatch::OneName);
        assert_eq!(subject.identifier_match("James Smith"), IdentifierMatch::Unrelated);
    }

    #[test]
    fn test_names_match_whole_words_only() {
        let ian = Subject {
            first_name: "Ian".to_string(),
            ..create_test_subject()
        };
        assert_eq!(ian.identifier_match("Brian"), IdentifierMatch::Unrelated);
        assert_eq!(ian.identifier_match("Doella"), IdentifierMatch::Unrelated);
        assert_eq!(ian.identifier_match("ian, please"), IdentifierMatch::OneName);
        assert_eq!(ian.identifier_match("Ian Doe's"), IdentifierMatch::FullName);
    }

    #[test]
    fn test_multi_word_surname_matches_in_sequence() {
        let subject = Subject {
            last_name: "van der Merwe".to_string(),
            ..create_test_subject()
        };
        assert_eq!(subject.identifier_match("Michael van der Merwe"), IdentifierMatch::FullName);
        assert_eq!(subject.identifier_match("Michael der van"), IdentifierMatch::OneName);
    }

    // ==========================================================================
    // Siblings sharing a surname
    // ==========================================================================
    #[test]
    fn test_full_name_picks_the_named_sibling() {
        assert_eq!(selected("Peter Smith").as_deref(), Some("23456"));
        assert_eq!(selected("james smith").as_deref(), Some("12345"));
    }

    #[test]
    fn test_first_name_alone_picks_one_sibling() {
        assert_eq!(selected("Peter").as_deref(), Some("23456"));
        assert_eq!(selected("23456").as_deref(), Some("23456"));
    }

    #[test]
    fn test_shared_surname_alone_links_nobody() {
        assert_eq!(selected("Smith"), None);
        assert_eq!(selected("Anna Smith"), None);
        assert_eq!(selected("Petersen"), None);
    }

    #[test]
    fn test_balance_for_category() {
        let subject = create_test_subject();
        assert_eq!(subject.balances.for_category(LeaveCategory::Overnight), Some(2));
        assert_eq!(subject.balances.for_category(LeaveCategory::FridaySupper), Some(3));
        assert_eq!(subject.balances.for_category(LeaveCategory::DayLeave), None);
        assert_eq!(subject.balances.for_category(LeaveCategory::Special), None);
    }

    #[test]
    fn test_summary_carries_display_name() {
        let summary = create_test_subject().summary();
        assert_eq!(summary.name, "Michael Doe");
        assert_eq!(summary.cohort, Cohort::E);
    }
}
