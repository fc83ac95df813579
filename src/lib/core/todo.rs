use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A persisted todo item, serialized as the wire record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "storage", derive(sqlx::FromRow))]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub deadline_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Everything a store needs to insert a todo; the id is the store's business.
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub deadline_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Partial replacement of a todo. `None` keeps the stored value.
#[derive(Debug, Clone)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    /// `Some(None)` clears the deadline.
    pub deadline_at: Option<Option<NaiveDateTime>>,
    pub updated_at: NaiveDateTime,
}

impl TodoPatch {
    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(deadline_at) = self.deadline_at {
            todo.deadline_at = deadline_at;
        }
        todo.updated_at = self.updated_at.max(todo.created_at);
    }
}

/// The single filter a list request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoFilter {
    All,
    Completed(bool),
    /// Todos with a deadline at or before the cutoff. No deadline never matches.
    DueBy(NaiveDateTime),
}

impl TodoFilter {
    pub fn matches(&self, todo: &Todo) -> bool {
        match self {
            TodoFilter::All => true,
            TodoFilter::Completed(completed) => todo.completed == *completed,
            TodoFilter::DueBy(cutoff) => todo.deadline_at.is_some_and(|d| d <= *cutoff),
        }
    }
}

/// Current UTC wall clock at microsecond precision, the resolution timestamps are stored at.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}
