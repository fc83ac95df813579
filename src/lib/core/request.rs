use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SubsecRound};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::{NewTodo, TodoError, TodoFilter, TodoPatch};

/// Keys a create or update body may carry.
pub const ALLOWED_FIELDS: [&str; 4] = ["title", "description", "completed", "deadline_at"];

const DEADLINE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Query string of `GET /todos`. Unrecognised parameters are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub window: Option<String>,
    pub completed: Option<String>,
}

impl ListQuery {
    /// Resolves to exactly one filter: `window` wins over `completed`.
    pub fn into_filter(self, now: NaiveDateTime) -> Result<TodoFilter, TodoError> {
        if let Some(window) = self.window.filter(|w| !w.is_empty()) {
            let days: i64 = window.trim().parse().map_err(|_| TodoError::InvalidWindow)?;
            let cutoff = Duration::try_days(days)
                .and_then(|offset| now.checked_add_signed(offset))
                .ok_or(TodoError::InvalidWindow)?;
            return Ok(TodoFilter::DueBy(cutoff));
        }
        Ok(match self.completed.as_deref() {
            Some("true") => TodoFilter::Completed(true),
            Some("false") => TodoFilter::Completed(false),
            _ => TodoFilter::All,
        })
    }
}

/// Typed view of a create or update body after the allow-list check.
#[derive(Debug, Default, PartialEq)]
pub struct TodoFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub deadline_at: Option<Option<NaiveDateTime>>,
}

impl TodoFields {
    pub fn from_json(body: Map<String, Value>) -> Result<Self, TodoError> {
        // One stray key rejects the whole body, before any value is looked at.
        if let Some(key) = body.keys().find(|k| !ALLOWED_FIELDS.contains(&k.as_str())) {
            return Err(TodoError::InvalidField(key.clone()));
        }

        let mut fields = TodoFields::default();
        for (key, value) in body {
            match key.as_str() {
                "title" => fields.title = string_field("title", value)?,
                "description" => fields.description = string_field("description", value)?,
                "completed" => {
                    fields.completed = match value {
                        Value::Null => None,
                        Value::Bool(b) => Some(b),
                        _ => return Err(TodoError::InvalidValue("completed")),
                    }
                }
                "deadline_at" => {
                    fields.deadline_at = Some(match value {
                        Value::Null => None,
                        Value::String(raw) => Some(parse_deadline(&raw)?),
                        _ => return Err(TodoError::InvalidValue("deadline_at")),
                    })
                }
                _ => return Err(TodoError::InvalidField(key)),
            }
        }
        Ok(fields)
    }

    pub fn into_new_todo(self, now: NaiveDateTime) -> Result<NewTodo, TodoError> {
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .ok_or(TodoError::EmptyTitle)?;
        Ok(NewTodo {
            title,
            description: self.description.unwrap_or_default(),
            completed: self.completed.unwrap_or(false),
            deadline_at: self.deadline_at.flatten(),
            created_at: now,
        })
    }

    pub fn into_patch(self, now: NaiveDateTime) -> Result<TodoPatch, TodoError> {
        if self.title.as_deref() == Some("") {
            return Err(TodoError::EmptyTitle);
        }
        Ok(TodoPatch {
            title: self.title,
            description: self.description,
            completed: self.completed,
            deadline_at: self.deadline_at,
            updated_at: now,
        })
    }
}

fn string_field(name: &'static str, value: Value) -> Result<Option<String>, TodoError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(TodoError::InvalidValue(name)),
    }
}

/// Parses an ISO-8601 date or date-time. Offsets are folded into UTC.
pub fn parse_deadline(raw: &str) -> Result<NaiveDateTime, TodoError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc().trunc_subsecs(6));
    }
    for format in DEADLINE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.trunc_subsecs(6));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or(TodoError::InvalidDeadline)
}

/// Only plain non-negative decimal ids address a todo; anything else cannot exist.
pub fn parse_todo_id(raw: &str) -> Result<i64, TodoError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TodoError::NotFound);
    }
    raw.parse().map_err(|_| TodoError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> NaiveDateTime {
        parse_deadline("2023-02-20T12:00:00").unwrap()
    }

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn query(window: Option<&str>, completed: Option<&str>) -> ListQuery {
        ListQuery {
            window: window.map(str::to_string),
            completed: completed.map(str::to_string),
        }
    }

    #[test]
    fn window_takes_priority_over_completed() {
        let filter = query(Some("7"), Some("true")).into_filter(now()).unwrap();
        assert_eq!(
            filter,
            TodoFilter::DueBy(parse_deadline("2023-02-27T12:00:00").unwrap())
        );
    }

    #[test]
    fn negative_window_moves_cutoff_into_the_past() {
        let filter = query(Some("-3"), None).into_filter(now()).unwrap();
        assert_eq!(
            filter,
            TodoFilter::DueBy(parse_deadline("2023-02-17T12:00:00").unwrap())
        );
    }

    #[test]
    fn non_integer_window_is_rejected() {
        for raw in ["abc", "1.5", "7d"] {
            let err = query(Some(raw), None).into_filter(now()).unwrap_err();
            assert!(matches!(err, TodoError::InvalidWindow), "{raw}");
        }
    }

    #[test]
    fn overflowing_window_is_rejected() {
        let err = query(Some("9223372036854775807"), None)
            .into_filter(now())
            .unwrap_err();
        assert!(matches!(err, TodoError::InvalidWindow));
    }

    #[test]
    fn empty_window_falls_through_to_completed() {
        let filter = query(Some(""), Some("false")).into_filter(now()).unwrap();
        assert_eq!(filter, TodoFilter::Completed(false));
    }

    #[test]
    fn completed_only_matches_exact_literals() {
        assert_eq!(
            query(None, Some("true")).into_filter(now()).unwrap(),
            TodoFilter::Completed(true)
        );
        assert_eq!(
            query(None, Some("True")).into_filter(now()).unwrap(),
            TodoFilter::All
        );
        assert_eq!(query(None, None).into_filter(now()).unwrap(), TodoFilter::All);
    }

    #[test]
    fn unknown_key_rejects_whole_body() {
        let err = TodoFields::from_json(body(json!({"title": "x", "foo": "y"}))).unwrap_err();
        assert!(matches!(err, TodoError::InvalidField(ref key) if key == "foo"));
    }

    #[test]
    fn unknown_key_wins_over_bad_values() {
        let err = TodoFields::from_json(body(json!({"completed": "yes", "foo": 1}))).unwrap_err();
        assert!(matches!(err, TodoError::InvalidField(_)));
    }

    #[test]
    fn wrongly_typed_values_are_rejected() {
        let err = TodoFields::from_json(body(json!({"title": 5}))).unwrap_err();
        assert!(matches!(err, TodoError::InvalidValue("title")));
        let err = TodoFields::from_json(body(json!({"completed": "true"}))).unwrap_err();
        assert!(matches!(err, TodoError::InvalidValue("completed")));
        let err = TodoFields::from_json(body(json!({"deadline_at": 3}))).unwrap_err();
        assert!(matches!(err, TodoError::InvalidValue("deadline_at")));
    }

    #[test]
    fn title_only_body_gets_defaults() {
        let todo = TodoFields::from_json(body(json!({"title": "Buy milk"})))
            .and_then(|f| f.into_new_todo(now()))
            .unwrap();
        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.description, "");
        assert!(!todo.completed);
        assert_eq!(todo.deadline_at, None);
        assert_eq!(todo.created_at, now());
    }

    #[test]
    fn missing_or_empty_title_is_rejected_on_create() {
        for value in [json!({}), json!({"title": ""}), json!({"title": null})] {
            let err = TodoFields::from_json(body(value))
                .and_then(|f| f.into_new_todo(now()))
                .unwrap_err();
            assert!(matches!(err, TodoError::EmptyTitle));
        }
    }

    #[test]
    fn patch_rejects_blank_title_but_allows_absent_one() {
        let err = TodoFields::from_json(body(json!({"title": ""})))
            .and_then(|f| f.into_patch(now()))
            .unwrap_err();
        assert!(matches!(err, TodoError::EmptyTitle));

        let patch = TodoFields::from_json(body(json!({"completed": true})))
            .and_then(|f| f.into_patch(now()))
            .unwrap();
        assert_eq!(patch.title, None);
        assert_eq!(patch.completed, Some(true));
        assert!(patch.deadline_at.is_none());
    }

    #[test]
    fn null_deadline_clears_on_patch() {
        let fields = TodoFields::from_json(body(json!({"deadline_at": null}))).unwrap();
        assert_eq!(fields.deadline_at, Some(None));
    }

    #[test]
    fn deadline_accepts_iso_variants() {
        let midnight = parse_deadline("2023-02-27T00:00:00").unwrap();
        assert_eq!(parse_deadline("2023-02-27").unwrap(), midnight);
        assert_eq!(parse_deadline("2023-02-27 00:00:00").unwrap(), midnight);
        assert_eq!(parse_deadline("2023-02-27T00:00").unwrap(), midnight);
        assert_eq!(parse_deadline("2023-02-27T10:00:00+10:00").unwrap(), midnight);
        assert_eq!(parse_deadline("2023-02-27T00:00:00Z").unwrap(), midnight);
        assert_eq!(
            parse_deadline("2023-02-27T00:00:00.250").unwrap().to_string(),
            "2023-02-27 00:00:00.250"
        );
    }

    #[test]
    fn malformed_deadline_is_a_client_error() {
        for raw in ["tomorrow", "2023-13-01", "27/02/2023", ""] {
            let err = parse_deadline(raw).unwrap_err();
            assert!(matches!(err, TodoError::InvalidDeadline), "{raw}");
        }
    }

    #[test]
    fn todo_ids_must_be_plain_digits() {
        assert_eq!(parse_todo_id("42").unwrap(), 42);
        assert_eq!(parse_todo_id("0").unwrap(), 0);
        for raw in ["-1", "+1", "abc", "", "1.0", "99999999999999999999"] {
            assert!(matches!(parse_todo_id(raw), Err(TodoError::NotFound)), "{raw}");
        }
    }
}
