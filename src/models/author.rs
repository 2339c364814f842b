//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::Book;

/// Field labels and limits for authors
pub mod fields {
    pub const FIRST_NAME_LABEL: &str = "first name";
    pub const LAST_NAME_LABEL: &str = "last name";
    pub const DATE_OF_BIRTH_LABEL: &str = "date of birth";
    pub const DATE_OF_DEATH_LABEL: &str = "Died";
    pub const NAME_MAX_LENGTH: u64 = 100;
}

/// Author record. Listings are ordered by last name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.last_name, self.first_name)
    }
}

/// Author with the books attributed to them
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetails {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<Book>,
}

/// Create author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

/// Update author request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,
    /// `null` clears the date
    #[serde(default, deserialize_with = "super::nullable::deserialize")]
    #[schema(value_type = Option<NaiveDate>)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    /// `null` clears the date
    #[serde(default, deserialize_with = "super::nullable::deserialize")]
    #[schema(value_type = Option<NaiveDate>)]
    pub date_of_death: Option<Option<NaiveDate>>,
}

impl UpdateAuthor {
    /// Apply this patch to an existing author
    pub fn apply(&self, author: &mut Author) {
        if let Some(ref first_name) = self.first_name {
            author.first_name = first_name.clone();
        }
        if let Some(ref last_name) = self.last_name {
            author.last_name = last_name.clone();
        }
        if let Some(date_of_birth) = self.date_of_birth {
            author.date_of_birth = date_of_birth;
        }
        if let Some(date_of_death) = self.date_of_death {
            author.date_of_death = date_of_death;
        }
    }
}

/// Checks that a death date does not precede the birth date
pub fn validate_lifespan(
    date_of_birth: Option<NaiveDate>,
    date_of_death: Option<NaiveDate>,
) -> Result<(), String> {
    match (date_of_birth, date_of_death) {
        (Some(born), Some(died)) if died < born => {
            Err("Date of death cannot precede date of birth".to_string())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_bob() -> Author {
        Author {
            id: 1,
            first_name: "Big".to_string(),
            last_name: "Bob".to_string(),
            date_of_birth: None,
            date_of_death: None,
        }
    }

    #[test]
    fn test_display_is_last_name_comma_first_name() {
        assert_eq!(big_bob().to_string(), "Bob, Big");
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(fields::FIRST_NAME_LABEL, "first name");
        assert_eq!(fields::LAST_NAME_LABEL, "last name");
        assert_eq!(fields::DATE_OF_BIRTH_LABEL, "date of birth");
        assert_eq!(fields::DATE_OF_DEATH_LABEL, "Died");
        assert_eq!(fields::NAME_MAX_LENGTH, 100);
    }

    #[test]
    fn test_first_name_max_length_enforced() {
        let create = CreateAuthor {
            first_name: "x".repeat(101),
            last_name: "Bob".to_string(),
            date_of_birth: None,
            date_of_death: None,
        };
        assert!(create.validate().is_err());
    }

    #[test]
    fn test_patch_clears_dates_only_when_explicit() {
        let mut author = big_bob();
        author.date_of_birth = NaiveDate::from_ymd_opt(1950, 1, 1);

        UpdateAuthor {
            last_name: Some("Robert".to_string()),
            ..Default::default()
        }
        .apply(&mut author);
        assert_eq!(author.last_name, "Robert");
        assert!(author.date_of_birth.is_some());

        UpdateAuthor {
            date_of_birth: Some(None),
            ..Default::default()
        }
        .apply(&mut author);
        assert!(author.date_of_birth.is_none());
    }

    #[test]
    fn test_lifespan_validation() {
        let born = NaiveDate::from_ymd_opt(1900, 5, 1);
        let died = NaiveDate::from_ymd_opt(1899, 5, 1);
        assert!(validate_lifespan(born, died).is_err());
        assert!(validate_lifespan(died, born).is_ok());
        assert!(validate_lifespan(None, died).is_ok());
    }
}
