//! Book instance (physical copy) model and loan status

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::today;

pub const IMPRINT_MAX_LENGTH: u64 = 200;

/// Loan status of a copy. Transitions are not constrained: any status may
/// be written over any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Maintenance,
        LoanStatus::OnLoan,
        LoanStatus::Available,
        LoanStatus::Reserved,
    ];

    /// Single character code used in storage
    pub fn code(&self) -> char {
        match self {
            LoanStatus::Maintenance => 'm',
            LoanStatus::OnLoan => 'o',
            LoanStatus::Available => 'a',
            LoanStatus::Reserved => 'r',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'm' => Some(LoanStatus::Maintenance),
            'o' => Some(LoanStatus::OnLoan),
            'a' => Some(LoanStatus::Available),
            'r' => Some(LoanStatus::Reserved),
            _ => None,
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On Loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    /// Accepts the storage code (`o`) or the snake_case name (`on_loan`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(status) = LoanStatus::from_code(c) {
                return Ok(status);
            }
        }
        match s.to_lowercase().as_str() {
            "maintenance" => Ok(LoanStatus::Maintenance),
            "on_loan" => Ok(LoanStatus::OnLoan),
            "available" => Ok(LoanStatus::Available),
            "reserved" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus (stored as its one-letter code)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.trim().parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.code().to_string(), buf)
    }
}

/// One physical copy of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    /// Random identifier, safe to expose in URLs
    pub id: Uuid,
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    /// Cleared when the language is deleted
    pub language_id: Option<i32>,
    /// Cleared when the borrower account is removed
    pub borrower_id: Option<i32>,
    pub status: LoanStatus,
}

impl BookInstance {
    /// Overdue iff a due-back date is set and strictly before `on`
    pub fn is_overdue_on(&self, on: NaiveDate) -> bool {
        matches!(self.due_back, Some(due_back) if due_back < on)
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(today())
    }
}

/// Copy joined with the labels a listing needs
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookInstanceDetails {
    #[serde(flatten)]
    pub instance: BookInstance,
    pub book_title: String,
    pub language: Option<String>,
    pub borrower: Option<String>,
    pub is_overdue: bool,
}

impl BookInstanceDetails {
    pub fn new(
        instance: BookInstance,
        book_title: String,
        language: Option<String>,
        borrower: Option<String>,
    ) -> Self {
        let is_overdue = instance.is_overdue();
        Self {
            instance,
            book_title,
            language,
            borrower,
            is_overdue,
        }
    }
}

impl std::fmt::Display for BookInstanceDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.instance.id, self.book_title)
    }
}

/// Create copy request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBookInstance {
    pub book_id: i32,
    #[serde(default)]
    #[validate(length(max = 200, message = "Imprint must be at most 200 characters"))]
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub language_id: Option<i32>,
    pub borrower_id: Option<i32>,
    /// Defaults to maintenance
    #[serde(default)]
    pub status: LoanStatus,
}

/// Update copy request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBookInstance {
    pub book_id: Option<i32>,
    #[validate(length(max = 200, message = "Imprint must be at most 200 characters"))]
    pub imprint: Option<String>,
    #[serde(default, deserialize_with = "super::nullable::deserialize")]
    #[schema(value_type = Option<NaiveDate>)]
    pub due_back: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "super::nullable::deserialize")]
    #[schema(value_type = Option<i32>)]
    pub language_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "super::nullable::deserialize")]
    #[schema(value_type = Option<i32>)]
    pub borrower_id: Option<Option<i32>>,
    pub status: Option<LoanStatus>,
}

impl UpdateBookInstance {
    pub fn apply(&self, instance: &mut BookInstance) {
        if let Some(book_id) = self.book_id {
            instance.book_id = book_id;
        }
        if let Some(ref imprint) = self.imprint {
            instance.imprint = imprint.clone();
        }
        if let Some(due_back) = self.due_back {
            instance.due_back = due_back;
        }
        if let Some(language_id) = self.language_id {
            instance.language_id = language_id;
        }
        if let Some(borrower_id) = self.borrower_id {
            instance.borrower_id = borrower_id;
        }
        if let Some(status) = self.status {
            instance.status = status;
        }
    }
}
