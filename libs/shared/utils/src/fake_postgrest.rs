//! In-memory stand-in for the PostgREST endpoints, mounted on a wiremock server.
//!
//! Supports the subset the cells use: `eq.`, `in.()` and `is.null` filters,
//! `select` with one level of `alias:table(*)` embedding, `limit`, inserts of
//! single rows or arrays, unique constraints, and `on_conflict` upserts with
//! `resolution=merge-duplicates`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::{matchers::path_regex, Mock, MockServer, Request, Respond, ResponseTemplate};

const REST_PREFIX: &str = "/rest/v1/";
const RESERVED_PARAMS: [&str; 5] = ["select", "order", "limit", "offset", "on_conflict"];

#[derive(Default)]
struct FakeState {
    tables: HashMap<String, Vec<Value>>,
    unique: HashMap<String, Vec<String>>,
    writes: HashMap<String, usize>,
}

#[derive(Clone, Default)]
pub struct FakePostgrest {
    state: Arc<Mutex<FakeState>>,
}

impl FakePostgrest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique constraint; plain inserts that collide get a 409.
    pub fn with_unique(self, table: &str, columns: &[&str]) -> Self {
        self.lock()
            .unique
            .insert(table.to_string(), columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn seed(&self, table: &str, row: Value) {
        self.lock().tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Number of write requests (not rows) received for `table`.
    pub fn write_count(&self, table: &str) -> usize {
        self.lock().writes.get(table).copied().unwrap_or(0)
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(path_regex(r"^/rest/v1/[a-z_]+$"))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake postgrest state poisoned")
    }
}

impl Respond for FakePostgrest {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let table = request.url.path().trim_start_matches(REST_PREFIX).to_string();
        let params: Vec<(String, String)> = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut state = self.lock();
        match request.method.as_str() {
            "GET" => state.select(&table, &params),
            "POST" => {
                let prefer = request
                    .headers
                    .get("Prefer")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                match request.body_json::<Value>() {
                    Ok(body) => state.insert(&table, &params, &prefer, body),
                    Err(_) => ResponseTemplate::new(400).set_body_json(json!({ "message": "invalid json body" })),
                }
            }
            _ => ResponseTemplate::new(405),
        }
    }
}

impl FakeState {
    fn select(&self, table: &str, params: &[(String, String)]) -> ResponseTemplate {
        let mut matched: Vec<Value> = self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| params.iter().all(|(k, v)| matches_filter(row, k, v)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((_, select)) = params.iter().find(|(k, _)| k == "select") {
            for (alias, target) in parse_embeds(select) {
                for row in matched.iter_mut() {
                    let embedded = row
                        .get(format!("{}_id", alias))
                        .and_then(value_text)
                        .and_then(|fk| self.find_by_id(&target, &fk));
                    row[alias.as_str()] = embedded.unwrap_or(Value::Null);
                }
            }
        }

        if let Some(limit) = params
            .iter()
            .find(|(k, _)| k == "limit")
            .and_then(|(_, v)| v.parse::<usize>().ok())
        {
            matched.truncate(limit);
        }

        ResponseTemplate::new(200).set_body_json(Value::Array(matched))
    }

    fn find_by_id(&self, table: &str, id: &str) -> Option<Value> {
        self.tables
            .get(table)?
            .iter()
            .find(|row| row.get("id").and_then(value_text).as_deref() == Some(id))
            .cloned()
    }

    fn insert(&mut self, table: &str, params: &[(String, String)], prefer: &str, body: Value) -> ResponseTemplate {
        let incoming = match body {
            Value::Array(items) => items,
            other => vec![other],
        };

        let merge = prefer.contains("resolution=merge-duplicates");
        let unique_cols = self.unique.get(table).cloned().unwrap_or_default();
        let key_cols: Vec<String> = if merge {
            params
                .iter()
                .find(|(k, _)| k == "on_conflict")
                .map(|(_, v)| v.split(',').map(str::to_string).collect())
                .unwrap_or_else(|| unique_cols.clone())
        } else {
            unique_cols
        };

        let rows = self.tables.entry(table.to_string()).or_default();
        let mut written = Vec::new();

        for item in incoming {
            let Value::Object(mut fields) = item else {
                return ResponseTemplate::new(400).set_body_json(json!({ "message": "expected object rows" }));
            };

            let existing = if key_cols.is_empty() {
                None
            } else {
                rows.iter().position(|row| {
                    key_cols
                        .iter()
                        .all(|c| row.get(c).and_then(value_text) == fields.get(c).and_then(value_text))
                })
            };

            match existing {
                Some(idx) if merge => {
                    if let Value::Object(current) = &mut rows[idx] {
                        for (k, v) in fields {
                            if k != "id" {
                                current.insert(k, v);
                            }
                        }
                    }
                    written.push(rows[idx].clone());
                }
                Some(_) => {
                    return ResponseTemplate::new(409).set_body_json(json!({
                        "code": "23505",
                        "message": "duplicate key value violates unique constraint"
                    }));
                }
                None => {
                    fields.entry("id").or_insert_with(|| json!(Uuid::new_v4()));
                    let row = Value::Object(fields);
                    rows.push(row.clone());
                    written.push(row);
                }
            }
        }

        *self.writes.entry(table.to_string()).or_default() += 1;
        ResponseTemplate::new(201).set_body_json(Value::Array(written))
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_filter(row: &Value, key: &str, raw: &str) -> bool {
    if RESERVED_PARAMS.contains(&key) {
        return true;
    }

    let actual = row.get(key).and_then(value_text);
    if let Some(expected) = raw.strip_prefix("eq.") {
        actual.as_deref() == Some(expected)
    } else if let Some(list) = raw.strip_prefix("in.(").and_then(|rest| rest.strip_suffix(')')) {
        actual.is_some_and(|value| list.split(',').any(|candidate| candidate == value))
    } else if raw == "is.null" {
        actual.is_none()
    } else {
        false
    }
}

fn parse_embeds(select: &str) -> Vec<(String, String)> {
    select
        .split(',')
        .filter_map(|part| {
            let (alias, rest) = part.split_once(':')?;
            let (target, _) = rest.split_once('(')?;
            Some((alias.trim().to_string(), target.trim().to_string()))
        })
        .collect()
}
