//! The personal-information draft collected by the first step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Draft personal information as typed by the user.
///
/// All fields are raw strings; the personal-info validator decides whether
/// they are acceptable. Contents are wiped from memory on drop and redacted
/// from `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PersonalInfoRecord {
    pub full_name: String,
    pub national_id: String,
    /// ISO-8601 calendar date, `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub nationality: String,
    pub gender: String,
}

impl PersonalInfoRecord {
    pub fn new(
        full_name: impl Into<String>,
        national_id: impl Into<String>,
        date_of_birth: impl Into<String>,
        nationality: impl Into<String>,
        gender: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            national_id: national_id.into(),
            date_of_birth: date_of_birth.into(),
            nationality: nationality.into(),
            gender: gender.into(),
        }
    }
}

impl fmt::Debug for PersonalInfoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |s: &str| if s.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_struct("PersonalInfoRecord")
            .field("full_name", &mask(&self.full_name))
            .field("national_id", &mask(&self.national_id))
            .field("date_of_birth", &mask(&self.date_of_birth))
            .field("nationality", &mask(&self.nationality))
            .field("gender", &mask(&self.gender))
            .finish()
    }
}

/// The enumerated gender values accepted by the verification service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_values() {
        let record = PersonalInfoRecord::new("Jane Doe", "1234567890", "1990-01-01", "SA", "");
        let printed = format!("{record:?}");
        assert!(!printed.contains("1234567890"));
        assert!(!printed.contains("Jane"));
        assert!(printed.contains("<empty>"));
    }

    #[test]
    fn gender_is_case_insensitive() {
        assert_eq!("Female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(" male ".parse::<Gender>(), Ok(Gender::Male));
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn serde_uses_camel_case_and_rejects_unknown() {
        let record = PersonalInfoRecord::new("A", "1", "2000-01-01", "SA", "male");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"fullName\""));
        assert!(json.contains("\"dateOfBirth\""));
        let bad = r#"{"fullName":"","nationalId":"","dateOfBirth":"","nationality":"","gender":"","extra":1}"#;
        assert!(serde_json::from_str::<PersonalInfoRecord>(bad).is_err());
    }
}
