//! Normalized calendar events.
//!
//! SharePoint lists name their columns freely, so each normalized field pulls
//! from an ordered list of candidate column names: first present non-empty
//! value wins, with a documented default when none match.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DashError, DashResult};
use crate::session::Session;

/// A calendar event normalized from a SharePoint list item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// List item id; null when the item carries none.
    pub id: Option<i64>,
    pub title: String,
    pub participant: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub location: String,
    pub status: String,
    /// Full source property map, kept for the dashboard's debug view.
    pub raw: Map<String, Value>,
}

/// Events that transformed cleanly plus how many items were skipped.
#[derive(Debug, Serialize)]
pub struct FetchSummary {
    pub events: Vec<Event>,
    pub skipped: usize,
}

const PARTICIPANT_FIELDS: &[&str] = &["Participant", "ParticipantID", "Subject"];
const DATE_FIELDS: &[&str] = &["EventDate", "StartDate", "Date"];
const TIME_FIELDS: &[&str] = &["EventTime", "Time"];
const TYPE_FIELDS: &[&str] = &["Category", "EventType", "Type"];
const DESCRIPTION_FIELDS: &[&str] = &["Description", "Notes", "Body"];

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First present non-empty candidate, else the default.
fn first_of(props: &Map<String, Value>, candidates: &[&str], default: &str) -> String {
    candidates
        .iter()
        .filter_map(|key| props.get(*key))
        .filter_map(value_as_text)
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Map one raw list item into an [`Event`].
///
/// Missing columns fall back to their defaults; only an item that isn't a
/// JSON object at all is an error.
pub fn transform_item(item: &Value) -> DashResult<Event> {
    let props = item
        .as_object()
        .ok_or_else(|| DashError::ItemTransform(format!("expected a JSON object, got {item}")))?;

    Ok(Event {
        id: props
            .get("Id")
            .or_else(|| props.get("ID"))
            .and_then(Value::as_i64),
        title: first_of(props, &["Title"], ""),
        participant: first_of(props, PARTICIPANT_FIELDS, ""),
        date: first_of(props, DATE_FIELDS, ""),
        time: first_of(props, TIME_FIELDS, ""),
        kind: first_of(props, TYPE_FIELDS, "general"),
        description: first_of(props, DESCRIPTION_FIELDS, ""),
        location: first_of(props, &["Location"], ""),
        status: first_of(props, &["Status"], ""),
        raw: props.clone(),
    })
}

/// Normalize a raw item collection, skipping (and counting) bad items.
fn normalize_items(items: &[Value]) -> FetchSummary {
    let mut events = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for item in items {
        match transform_item(item) {
            Ok(event) => events.push(event),
            Err(e) => {
                eprintln!("Skipping list item: {e}");
                skipped += 1;
            }
        }
    }

    FetchSummary { events, skipped }
}

/// Fetch the session's list and normalize every item. A single bad item is
/// logged and skipped; it never fails the whole fetch.
pub async fn fetch_events(session: &Session) -> DashResult<FetchSummary> {
    let items = session.list_items().await?;
    Ok(normalize_items(&items))
}
