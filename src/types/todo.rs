use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

pub type TodoId = i64;

pub const DESCRIPTION_MAX_LEN: usize = 1024;

/// A stored to-do item. `id` and `created_at` are assigned by the store and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Refresh `updated_at`, never moving it before `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}

/// Body of `POST /todos`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTodo {
    #[validate(length(
        min = 1,
        max = 255,
        message = "title must be between 1 and 255 characters"
    ))]
    #[validate(custom(function = "validate_title_chars"))]
    pub title: String,
    #[validate(length(max = 1024, message = "description must be at most 1024 characters"))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Body of `PUT /todos/{id}`.
///
/// A field missing from the JSON stays `None` and leaves the stored value
/// alone. `description` is nullable, so it carries a second layer:
/// `Some(None)` clears it. `title` and `completed` reject an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[validate(schema(function = "validate_patch_description"))]
pub struct TodoPatch {
    #[validate(length(
        min = 1,
        max = 255,
        message = "title must be between 1 and 255 characters"
    ))]
    #[validate(custom(function = "validate_title_chars"))]
    #[serde(default, deserialize_with = "present")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    /// Copy every present field onto `todo`. Returns whether anything was
    /// carried over; timestamps are left to the caller.
    pub fn apply_to(&self, todo: &mut Todo) -> bool {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(description) = &self.description {
            todo.description = description.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        !self.is_empty()
    }
}

/// Marks a field as present once serde sees its key, whatever the value.
/// Combined with `#[serde(default)]` this separates "absent" from "null".
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// SQLite's `length()` stops at the first NUL, so control characters would
/// slip past the length rule here and trip the table's CHECK instead.
fn validate_title_chars(title: &str) -> Result<(), ValidationError> {
    if title.chars().any(char::is_control) {
        return Err(ValidationError::new("control_chars").with_message(Cow::Borrowed(
            "title must not contain control characters",
        )));
    }
    Ok(())
}

fn validate_patch_description(patch: &TodoPatch) -> Result<(), ValidationError> {
    match &patch.description {
        Some(Some(description)) if description.chars().count() > DESCRIPTION_MAX_LEN => {
            Err(ValidationError::new("length").with_message(Cow::Borrowed(
                "description must be at most 1024 characters",
            )))
        }
        _ => Ok(()),
    }
}
