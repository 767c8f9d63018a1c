//! Validation of untyped page payloads.
//!
//! Payloads are walked by hand rather than deserialized so that every
//! violation is collected instead of stopping at the first bad field.
//!
//! Records carry no explicit tag. In structural mode the variant is
//! decided by field presence, trying [`RecordKind::ALL`] in order: an
//! object matches a variant when its required field is a valid positive
//! integer and all of that variant's optional fields present are
//! well-typed. Keys the variant does not declare are ignored, so the first
//! match wins: anything with a valid `id` and well-typed user fields is a
//! [`User`]. In targeted mode ([`Validator::for_kind`]) every item is
//! checked against one variant only.

use std::fmt;

use data_flux_schema_models::{ListenHistory, PageEnvelope, Record, RecordKind, Track, User};
use serde_json::{Map, Value};

const FIELD_REQUIRED: &str = "field required";
const VALID_INTEGER: &str = "input should be a valid integer";
const GREATER_THAN_ZERO: &str = "input should be greater than 0";
const VALID_STRING: &str = "input should be a valid string";
const VALID_LIST: &str = "input should be a valid list";
const VALID_OBJECT: &str = "input should be a valid object";
const MIN_ONE_ITEM: &str = "list should have at least 1 item";

/// A single problem found while validating a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Where the problem is (e.g. `"items[2].id"`). Empty for the payload
    /// root.
    pub location: String,
    /// What is wrong with the value at `location`.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// A payload that failed validation, with every violation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

impl ValidationFailure {
    /// Returns the violations in the order they were found.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns `true` if any violation sits at exactly `location`.
    #[must_use]
    pub fn has_violation_at(&self, location: &str) -> bool {
        self.violations.iter().any(|v| v.location == location)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s) for page", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Validates raw page payloads into [`PageEnvelope`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Validator {
    expected: Option<RecordKind>,
}

impl Validator {
    /// A validator that decides each item's variant from its shape.
    #[must_use]
    pub const fn structural() -> Self {
        Self { expected: None }
    }

    /// A validator that requires every item to be a `kind` record.
    #[must_use]
    pub const fn for_kind(kind: RecordKind) -> Self {
        Self {
            expected: Some(kind),
        }
    }

    /// Validates one page payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailure`] listing every missing field, mistyped
    /// field, non-positive integer, and an empty `items` list.
    pub fn validate(&self, raw: &Value) -> Result<PageEnvelope, ValidationFailure> {
        let mut violations = Vec::new();

        let Some(obj) = raw.as_object() else {
            push(&mut violations, String::new(), VALID_OBJECT);
            return Err(ValidationFailure { violations });
        };

        let total = required_positive(obj, "", "total", &mut violations);
        let page = required_positive(obj, "", "page", &mut violations);
        let size = required_positive(obj, "", "size", &mut violations);
        let pages = required_positive(obj, "", "pages", &mut violations);

        let items: Vec<Record> = match obj.get("items") {
            None => {
                push(&mut violations, "items".to_string(), FIELD_REQUIRED);
                Vec::new()
            }
            Some(Value::Array(values)) => {
                if values.is_empty() {
                    push(&mut violations, "items".to_string(), MIN_ONE_ITEM);
                }
                values
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| self.check_item(item, index, &mut violations))
                    .collect()
            }
            Some(_) => {
                push(&mut violations, "items".to_string(), VALID_LIST);
                Vec::new()
            }
        };

        match (total, page, size, pages) {
            (Some(total), Some(page), Some(size), Some(pages)) if violations.is_empty() => {
                Ok(PageEnvelope {
                    total,
                    page,
                    size,
                    pages,
                    items,
                })
            }
            _ => Err(ValidationFailure { violations }),
        }
    }

    fn check_item(
        &self,
        item: &Value,
        index: usize,
        violations: &mut Vec<Violation>,
    ) -> Option<Record> {
        let location = format!("items[{index}]");
        let Some(obj) = item.as_object() else {
            push(violations, location, VALID_OBJECT);
            return None;
        };

        if let Some(kind) = self.expected {
            return check_kind(kind, obj, &location, violations);
        }

        let mut attempts = Vec::new();
        for kind in RecordKind::ALL {
            let mut scratch = Vec::new();
            let prefix = format!("{location}.{kind}");
            if let Some(record) = check_kind(kind, obj, &prefix, &mut scratch) {
                return Some(record);
            }
            attempts.extend(scratch);
        }
        violations.extend(attempts);
        None
    }
}

fn check_kind(
    kind: RecordKind,
    obj: &Map<String, Value>,
    prefix: &str,
    violations: &mut Vec<Violation>,
) -> Option<Record> {
    let before = violations.len();

    let record = match kind {
        RecordKind::User => Record::User(User {
            id: required_positive(obj, prefix, "id", violations).unwrap_or_default(),
            first_name: optional_string(obj, prefix, "first_name", violations),
            last_name: optional_string(obj, prefix, "last_name", violations),
            email: optional_string(obj, prefix, "email", violations),
            gender: optional_string(obj, prefix, "gender", violations),
            favorite_genres: optional_string(obj, prefix, "favorite_genres", violations),
            created_at: optional_string(obj, prefix, "created_at", violations),
            updated_at: optional_string(obj, prefix, "updated_at", violations),
        }),
        RecordKind::Track => Record::Track(Track {
            id: required_positive(obj, prefix, "id", violations).unwrap_or_default(),
            name: optional_string(obj, prefix, "name", violations),
            artist: optional_string(obj, prefix, "artist", violations),
            songwriters: optional_string(obj, prefix, "songwriters", violations),
            duration: optional_string(obj, prefix, "duration", violations),
            genres: optional_string(obj, prefix, "genres", violations),
            album: optional_string(obj, prefix, "album", violations),
            created_at: optional_string(obj, prefix, "created_at", violations),
            updated_at: optional_string(obj, prefix, "updated_at", violations),
        }),
        RecordKind::ListenHistory => Record::ListenHistory(ListenHistory {
            user_id: required_positive(obj, prefix, "user_id", violations).unwrap_or_default(),
            items: optional_positive_list(obj, prefix, "items", violations),
            created_at: optional_string(obj, prefix, "created_at", violations),
            updated_at: optional_string(obj, prefix, "updated_at", violations),
        }),
    };

    (violations.len() == before).then_some(record)
}

fn location(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn push(violations: &mut Vec<Violation>, location: String, message: &str) {
    violations.push(Violation {
        location,
        message: message.to_string(),
    });
}

fn required_positive(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<u64> {
    let loc = location(prefix, key);
    let Some(value) = obj.get(key) else {
        push(violations, loc, FIELD_REQUIRED);
        return None;
    };
    positive_integer(value, loc, violations)
}

fn positive_integer(value: &Value, loc: String, violations: &mut Vec<Violation>) -> Option<u64> {
    match value.as_u64() {
        Some(0) => {
            push(violations, loc, GREATER_THAN_ZERO);
            None
        }
        Some(n) => Some(n),
        None if value.is_i64() => {
            push(violations, loc, GREATER_THAN_ZERO);
            None
        }
        None => {
            push(violations, loc, VALID_INTEGER);
            None
        }
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            push(violations, location(prefix, key), VALID_STRING);
            None
        }
    }
}

fn optional_positive_list(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<Vec<u64>> {
    let loc = location(prefix, key);
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(values)) => {
            let mut ids = Vec::with_capacity(values.len());
            for (index, value) in values.iter().enumerate() {
                if let Some(id) = positive_integer(value, format!("{loc}[{index}]"), violations) {
                    ids.push(id);
                }
            }
            Some(ids)
        }
        Some(_) => {
            push(violations, loc, VALID_LIST);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page(items: &Value) -> Value {
        json!({ "total": 100, "page": 1, "size": 10, "pages": 10, "items": items })
    }

    #[test]
    fn accepts_valid_user_page() {
        let raw = page(&json!([
            { "id": 1, "first_name": "John", "last_name": "Doe" },
            { "id": 2, "first_name": "Jane", "last_name": "Doe" },
        ]));
        let envelope = Validator::structural().validate(&raw).unwrap();
        assert_eq!(envelope.total, 100);
        assert_eq!(envelope.page, 1);
        assert_eq!(envelope.size, 10);
        assert_eq!(envelope.pages, 10);
        assert_eq!(envelope.items.len(), 2);
        assert!(envelope.items.iter().all(|r| r.kind() == RecordKind::User));
    }

    #[test]
    fn item_count_matches_input() {
        let items: Vec<Value> = (1..=25).map(|id| json!({ "user_id": id, "items": [] })).collect();
        let envelope = Validator::structural()
            .validate(&page(&Value::Array(items)))
            .unwrap();
        assert_eq!(envelope.items.len(), 25);
    }

    #[test]
    fn rejects_empty_items() {
        let raw = json!({ "total": 10, "page": 1, "size": 5, "pages": 2, "items": [] });
        let failure = Validator::structural().validate(&raw).unwrap_err();
        assert!(failure.to_string().contains("list should have at least 1 item"));
        assert!(failure.has_violation_at("items"));
    }

    #[test]
    fn reports_every_missing_field() {
        let failure = Validator::structural()
            .validate(&json!({ "items": [] }))
            .unwrap_err();
        for field in ["total", "page", "size", "pages", "items"] {
            assert!(failure.has_violation_at(field), "missing {field}");
        }
        assert_eq!(failure.violations().len(), 5);
    }

    #[test]
    fn rejects_non_positive_envelope_fields() {
        let raw = json!({
            "total": -1, "page": 0, "size": -5, "pages": 0,
            "items": [{ "id": 1, "first_name": "John" }],
        });
        let failure = Validator::structural().validate(&raw).unwrap_err();
        assert_eq!(failure.violations().len(), 4);
        assert!(
            failure
                .violations()
                .iter()
                .all(|v| v.message == GREATER_THAN_ZERO)
        );
    }

    #[test]
    fn rejects_non_integer_types() {
        let raw = json!({
            "total": "100", "page": 1.5, "size": true, "pages": null,
            "items": [{ "id": 1 }],
        });
        let failure = Validator::structural().validate(&raw).unwrap_err();
        assert_eq!(failure.violations().len(), 4);
        assert!(failure.violations().iter().all(|v| v.message == VALID_INTEGER));
    }

    #[test]
    fn rejects_non_object_payload() {
        let failure = Validator::structural().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(failure.violations()[0].message, VALID_OBJECT);
    }

    #[test]
    fn rejects_items_that_are_not_a_list() {
        let raw = json!({ "total": 1, "page": 1, "size": 1, "pages": 1, "items": {} });
        let failure = Validator::structural().validate(&raw).unwrap_err();
        assert!(failure.has_violation_at("items"));
        assert_eq!(failure.violations()[0].message, VALID_LIST);
    }

    #[test]
    fn id_only_object_is_a_user() {
        let envelope = Validator::structural()
            .validate(&page(&json!([{ "id": 2 }])))
            .unwrap();
        assert_eq!(envelope.items[0], Record::User(User { id: 2, ..User::default() }));
    }

    #[test]
    fn track_shaped_object_matches_user_first() {
        let raw = page(&json!([{ "id": 42, "name": "Song Title", "album": "Album Name" }]));
        let envelope = Validator::structural().validate(&raw).unwrap();
        assert_eq!(envelope.items[0], Record::User(User { id: 42, ..User::default() }));
    }

    #[test]
    fn mistyped_user_field_falls_through_to_track() {
        let envelope = Validator::structural()
            .validate(&page(&json!([{ "id": 1, "first_name": 5 }])))
            .unwrap();
        assert_eq!(envelope.items[0], Record::Track(Track { id: 1, ..Track::default() }));
    }

    #[test]
    fn keys_of_later_variants_do_not_block_user() {
        let envelope = Validator::structural()
            .validate(&page(&json!([{ "id": 1, "user_id": 2 }])))
            .unwrap();
        assert_eq!(envelope.items[0], Record::User(User { id: 1, ..User::default() }));
    }

    #[test]
    fn track_fields_are_read_in_targeted_mode() {
        let raw = page(&json!([{
            "id": 42,
            "name": "Song Title",
            "artist": "Artist Name",
            "songwriters": "Songwriter 1, Songwriter 2",
            "duration": "3:45",
            "genres": "rock",
            "album": "Album Name",
        }]));
        let envelope = Validator::for_kind(RecordKind::Track).validate(&raw).unwrap();
        let Record::Track(track) = &envelope.items[0] else {
            panic!("expected track, got {:?}", envelope.items[0]);
        };
        assert_eq!(track.id, 42);
        assert_eq!(track.duration.as_deref(), Some("3:45"));
        assert_eq!(track.album.as_deref(), Some("Album Name"));
    }

    #[test]
    fn listen_history_accepts_empty_and_missing_items() {
        let raw = page(&json!([
            { "user_id": 1, "items": [1, 2, 3] },
            { "user_id": 2 },
            { "user_id": 3, "items": [] },
        ]));
        let envelope = Validator::structural().validate(&raw).unwrap();
        let histories: Vec<&ListenHistory> = envelope
            .items
            .iter()
            .map(|r| match r {
                Record::ListenHistory(h) => h,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(histories[0].items, Some(vec![1, 2, 3]));
        assert_eq!(histories[1].items, None);
        assert_eq!(histories[2].items, Some(vec![]));
    }

    #[test]
    fn listen_history_rejects_non_positive_track_ids() {
        let failure = Validator::for_kind(RecordKind::ListenHistory)
            .validate(&page(&json!([{ "user_id": 1, "items": [4, 0, -2] }])))
            .unwrap_err();
        assert!(failure.has_violation_at("items[0].items[1]"));
        assert!(failure.has_violation_at("items[0].items[2]"));
    }

    #[test]
    fn structural_failure_reports_every_variant() {
        let failure = Validator::structural()
            .validate(&page(&json!([{ "first_name": "John" }])))
            .unwrap_err();
        assert!(failure.has_violation_at("items[0].user.id"));
        assert!(failure.has_violation_at("items[0].track.id"));
        assert!(failure.has_violation_at("items[0].listen_history.user_id"));
    }

    #[test]
    fn negative_id_is_rejected() {
        let failure = Validator::for_kind(RecordKind::User)
            .validate(&page(&json!([{ "id": -1, "first_name": "John" }])))
            .unwrap_err();
        assert_eq!(
            failure.violations(),
            &[Violation {
                location: "items[0].id".to_string(),
                message: GREATER_THAN_ZERO.to_string(),
            }]
        );
    }

    #[test]
    fn timestamps_must_be_strings() {
        let failure = Validator::for_kind(RecordKind::User)
            .validate(&page(&json!([{ "id": 1, "created_at": 123, "updated_at": 456 }])))
            .unwrap_err();
        assert!(failure.has_violation_at("items[0].created_at"));
        assert!(failure.has_violation_at("items[0].updated_at"));
    }

    #[test]
    fn null_optional_fields_are_absent() {
        let envelope = Validator::for_kind(RecordKind::Track)
            .validate(&page(&json!([{ "id": 3, "name": null, "created_at": null }])))
            .unwrap();
        assert_eq!(envelope.items[0], Record::Track(Track { id: 3, ..Track::default() }));
    }

    #[test]
    fn targeted_mode_ignores_foreign_fields() {
        let envelope = Validator::for_kind(RecordKind::Track)
            .validate(&page(&json!([{ "id": 5, "first_name": "stray" }])))
            .unwrap();
        assert_eq!(envelope.items[0].kind(), RecordKind::Track);
    }

    #[test]
    fn id_without_user_id_never_matches_listen_history() {
        let failure = Validator::structural()
            .validate(&page(&json!([{ "id": 0, "items": [1] }])))
            .unwrap_err();
        assert!(failure.has_violation_at("items[0].user.id"));
        assert!(failure.has_violation_at("items[0].listen_history.user_id"));
    }

    #[test]
    fn collects_violations_across_items_and_envelope() {
        let raw = json!({
            "total": 0, "page": 1, "size": 10, "pages": 1,
            "items": [{ "id": 1 }, "not an object", { "id": 0 }],
        });
        let failure = Validator::for_kind(RecordKind::User).validate(&raw).unwrap_err();
        assert!(failure.has_violation_at("total"));
        assert!(failure.has_violation_at("items[1]"));
        assert!(failure.has_violation_at("items[2].id"));
        assert_eq!(failure.violations().len(), 3);
    }

    #[test]
    fn failure_display_lists_violations() {
        let failure = Validator::structural()
            .validate(&json!({ "total": 1, "page": 1, "size": 1, "pages": 1 }))
            .unwrap_err();
        assert_eq!(
            failure.to_string(),
            "1 validation error(s) for page\n  items: field required"
        );
    }
}
