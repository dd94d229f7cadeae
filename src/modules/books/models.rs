//! Request and response bodies for the books API.

use libris_db::models::iso_date;
use libris_db::BookRecord;
use serde::{de, Deserialize, Deserializer, Serialize};
use time::Date;

/// Body of `POST /api/books`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `PUT /api/books/{id}`. Absent fields are left untouched; `null`
/// or blank clears the nullable ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookEdit {
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub genre: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_lenient_year")]
    pub year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    pub available: Option<bool>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub borrow_info: Option<Option<BorrowerInput>>,
}

/// Borrower details as typed by a librarian. Checked and parsed by the
/// lifecycle engine, so every field tolerates being missing here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowerInput {
    #[serde(default, alias = "borrowerName")]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub borrow_date: String,
}

/// Body of `PUT /api/books/{id}/borrow`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    #[serde(default)]
    pub borrow_info: Option<BorrowerInput>,
}

/// Body of `PUT /api/books/{id}/return`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[serde(default)]
    pub return_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

/// Result of a mutation: the record as stored plus a message for the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookOutcome {
    pub message: String,
    pub book: BookRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fine: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_borrowed: Option<i64>,
    #[serde(
        with = "iso_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Date>,
}

impl BookOutcome {
    pub fn new(message: impl Into<String>, book: BookRecord) -> Self {
        Self {
            message: message.into(),
            book,
            fine: None,
            days_borrowed: None,
            due_date: None,
        }
    }
}

/// Form inputs send the year as a number or as text; blank means unset.
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearValue {
        Number(i32),
        Text(String),
    }

    match Option::<YearValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(YearValue::Number(year)) => Ok(Some(year)),
        Some(YearValue::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse()
                .map(Some)
                .map_err(|_| de::Error::custom("year must be a whole number"))
        }
    }
}

fn present_lenient_year<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_year(deserializer).map(Some)
}

/// Absent, `null` and a value become `None`, `Some(None)` and
/// `Some(Some(v))`. Pair with `#[serde(default)]`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn book_input_accepts_text_year() {
        let input: BookInput =
            serde_json::from_value(json!({"title": "A", "author": "B", "year": "1965"})).unwrap();
        assert_eq!(input.year, Some(1965));

        let input: BookInput =
            serde_json::from_value(json!({"title": "A", "author": "B", "year": ""})).unwrap();
        assert_eq!(input.year, None);

        assert!(serde_json::from_value::<BookInput>(json!({"year": "soon"})).is_err());
    }

    #[test]
    fn missing_required_fields_deserialize_as_blank() {
        let input: BookInput = serde_json::from_value(json!({})).unwrap();
        assert!(input.title.is_empty());

        let request: BorrowRequest =
            serde_json::from_value(json!({"borrowInfo": {"name": "X"}})).unwrap();
        let info = request.borrow_info.unwrap();
        assert_eq!(info.name, "X");
        assert!(info.borrow_date.is_empty());
    }

    #[test]
    fn borrower_name_alias_is_accepted() {
        let info: BorrowerInput =
            serde_json::from_value(json!({"borrowerName": "X", "borrowDate": "2024-01-01"}))
                .unwrap();
        assert_eq!(info.name, "X");
    }

    #[test]
    fn edit_distinguishes_null_borrow_info_from_absent() {
        let absent: BookEdit = serde_json::from_value(json!({"title": "T"})).unwrap();
        assert!(absent.borrow_info.is_none());

        let cleared: BookEdit = serde_json::from_value(json!({"borrowInfo": null})).unwrap();
        assert!(matches!(cleared.borrow_info, Some(None)));
    }

    #[test]
    fn edit_null_or_blank_clears_nullable_fields() {
        let absent: BookEdit = serde_json::from_value(json!({"title": "T"})).unwrap();
        assert_eq!(absent.year, None);
        assert_eq!(absent.genre, None);

        let cleared: BookEdit =
            serde_json::from_value(json!({"year": null, "genre": null, "description": null}))
                .unwrap();
        assert_eq!(cleared.year, Some(None));
        assert_eq!(cleared.genre, Some(None));
        assert_eq!(cleared.description, Some(None));

        let blank: BookEdit = serde_json::from_value(json!({"year": ""})).unwrap();
        assert_eq!(blank.year, Some(None));

        let set: BookEdit = serde_json::from_value(json!({"year": "2001"})).unwrap();
        assert_eq!(set.year, Some(Some(2001)));
    }
}
