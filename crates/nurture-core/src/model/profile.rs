// ── Profile types ──

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Role;

/// Canonical profile shape every backend adapter normalizes to.
///
/// Accounts provisioned through different paths store these facts in
/// differently shaped records; the resolver only ever sees this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// `None` when the record carries no role; resolved as `User`.
    pub role: Option<Role>,
    pub display_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// The child the family profile is built around.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDetails {
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

impl ChildDetails {
    /// Age in whole months at `today`, if the birth date is known.
    pub fn age_in_months(&self, today: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        today.years_since(dob).map(|years| {
            let mut months = years * 12;
            let anniversary = dob
                .checked_add_months(chrono::Months::new(months))
                .unwrap_or(dob);
            let mut cursor = anniversary;
            while let Some(next) = cursor.checked_add_months(chrono::Months::new(1)) {
                if next > today {
                    break;
                }
                months += 1;
                cursor = next;
            }
            months
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpouseDetails {
    pub name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

/// Everything the first-run wizard collects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyProfile {
    pub full_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub spouse: Option<SpouseDetails>,
    #[serde(default)]
    pub address: Address,
    pub child: ChildDetails,
    #[serde(default = "default_language")]
    pub preferred_language: String,
}

fn default_language() -> String {
    "English".into()
}

impl FamilyProfile {
    /// Check the fields the wizard treats as mandatory.
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().chars().count() < 2 {
            return Err("full name must be at least 2 characters".into());
        }
        if self.child.name.trim().is_empty() {
            return Err("child's name is required".into());
        }
        if let Some(phone) = &self.phone {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            if !phone.trim().is_empty() && digits < 7 {
                return Err("phone number looks incomplete".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn child(dob: &str) -> ChildDetails {
        ChildDetails {
            name: "Mira".into(),
            gender: None,
            date_of_birth: Some(dob.parse().unwrap()),
        }
    }

    #[test]
    fn child_age_in_months() {
        let today: NaiveDate = "2026-10-16".parse().unwrap();
        assert_eq!(child("2026-10-16").age_in_months(today), Some(0));
        assert_eq!(child("2026-09-16").age_in_months(today), Some(1));
        assert_eq!(child("2026-09-17").age_in_months(today), Some(0));
        assert_eq!(child("2024-10-15").age_in_months(today), Some(24));
        assert_eq!(ChildDetails::default().age_in_months(today), None);
    }

    #[test]
    fn validation_requires_names() {
        let mut p = FamilyProfile {
            full_name: "Asha Rao".into(),
            child: ChildDetails {
                name: "Mira".into(),
                ..ChildDetails::default()
            },
            ..FamilyProfile::default()
        };
        assert!(p.validate().is_ok());

        p.child.name = "  ".into();
        assert!(p.validate().is_err());

        p.child.name = "Mira".into();
        p.full_name = "A".into();
        assert!(p.validate().is_err());
    }
}
