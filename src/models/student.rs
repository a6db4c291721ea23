//! Student model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::rules::{self, validate_admission_number};

/// Student record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    /// School admission number, exactly 6 characters and unique
    pub admission_number: String,
    pub class_name: Option<String>,
    pub contact: Option<String>,
    pub section: Option<String>,
    /// Number of overdue returns recorded against this student
    pub warnings: i32,
    pub created_at: DateTime<Utc>,
}

/// Student registration request. Also the merged shape of an update.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
pub struct StudentInput {
    #[validate(length(min = 1, max = 200, message = "Name is required (max 200 characters)"))]
    pub name: String,
    #[validate(custom(function = "validate_admission_number"))]
    pub admission_number: String,
    #[validate(length(max = 50, message = "Class name must be at most 50 characters"))]
    pub class_name: Option<String>,
    #[validate(length(max = 100, message = "Contact must be at most 100 characters"))]
    pub contact: Option<String>,
    #[validate(length(max = 50, message = "Section must be at most 50 characters"))]
    pub section: Option<String>,
}

impl StudentInput {
    /// Trim every field; blank optional fields become absent
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            admission_number: self.admission_number.trim().to_string(),
            class_name: rules::normalize_optional(self.class_name),
            contact: rules::normalize_optional(self.contact),
            section: rules::normalize_optional(self.section),
        }
    }

    /// Apply a partial update on top of an existing student
    pub fn merged(current: &Student, update: UpdateStudent) -> Self {
        Self {
            name: update.name.unwrap_or_else(|| current.name.clone()),
            admission_number: update
                .admission_number
                .unwrap_or_else(|| current.admission_number.clone()),
            class_name: update.class_name.or_else(|| current.class_name.clone()),
            contact: update.contact.or_else(|| current.contact.clone()),
            section: update.section.or_else(|| current.section.clone()),
        }
    }
}

/// Update student request; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateStudent {
    pub name: Option<String>,
    pub admission_number: Option<String>,
    pub class_name: Option<String>,
    pub contact: Option<String>,
    pub section: Option<String>,
}

/// Student listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StudentQuery {
    /// Case-insensitive match on name, admission number or class
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}
