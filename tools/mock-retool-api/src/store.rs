//! In-memory stand-in for the Retool management API.

use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

const DEFAULT_PAGE: usize = 50;
const WRITABLE: [&str; 4] = ["apps", "folders", "users", "groups"];
/// Query keys that never act as equality filters.
const RESERVED_QUERY: [&str; 5] = ["limit", "next_token", "recursive", "start_time", "end_time"];

pub enum Reply {
    Json(StatusCode, Value),
    NoContent,
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(status, body) => (status, Json(body)).into_response(),
            Reply::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

pub struct Failure {
    pub status: StatusCode,
    pub message: String,
}

impl Failure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} '{id}' not found"))
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn into_reply(self) -> Reply {
        Reply::Json(
            self.status,
            json!({ "success": false, "message": self.message }),
        )
    }
}

type Outcome = Result<Reply, Failure>;

fn ok(status: StatusCode, data: Value) -> Outcome {
    Ok(Reply::Json(status, json!({ "success": true, "data": data })))
}

pub struct Store {
    collections: BTreeMap<String, Vec<Value>>,
    next_id: u64,
}

impl Store {
    pub fn seeded() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(
            "users".to_string(),
            vec![
                json!({
                    "id": "user_1", "email": "ada@acme.io",
                    "first_name": "Ada", "last_name": "Lovelace",
                    "active": true, "metadata": {}
                }),
                json!({
                    "id": "user_2", "email": "grace@acme.io",
                    "first_name": "Grace", "last_name": "Hopper",
                    "active": true, "metadata": {"team": "platform"}
                }),
                json!({
                    "id": "user_3", "email": "alan@acme.io",
                    "first_name": "Alan", "last_name": "Turing",
                    "active": false, "metadata": {}
                }),
            ],
        );
        collections.insert(
            "apps".to_string(),
            vec![
                json!({
                    "id": "app_1", "name": "Ops Dashboard",
                    "folder_id": "folder_1", "protected": false
                }),
                json!({
                    "id": "app_2", "name": "Refund Console",
                    "folder_id": "folder_1", "protected": true
                }),
            ],
        );
        collections.insert(
            "folders".to_string(),
            vec![
                json!({
                    "id": "folder_1", "name": "Support",
                    "folder_type": "app", "parent_folder_id": null
                }),
                json!({
                    "id": "folder_2", "name": "Jobs",
                    "folder_type": "workflow", "parent_folder_id": null
                }),
            ],
        );
        collections.insert(
            "workflows".to_string(),
            vec![json!({
                "id": "wf_1", "name": "Nightly export",
                "folder_id": "folder_2", "is_enabled": true
            })],
        );
        collections.insert(
            "resources".to_string(),
            vec![
                json!({"id": "res_1", "display_name": "Prod DB", "resource_type": "postgresql"}),
                json!({"id": "res_2", "display_name": "Stripe", "resource_type": "restapi"}),
            ],
        );
        collections.insert(
            "groups".to_string(),
            vec![json!({
                "id": 1, "name": "Admin", "universal_app_access": "own",
                "members": [{"id": "user_1", "is_group_admin": true}]
            })],
        );
        collections.insert(
            "audit_logs".to_string(),
            vec![
                json!({
                    "id": "log_1", "user_email": "ada@acme.io",
                    "action_type": "app_saved", "timestamp": "2026-01-05T10:00:00Z"
                }),
                json!({
                    "id": "log_2", "user_email": "grace@acme.io",
                    "action_type": "user_login", "timestamp": "2026-01-06T08:30:00Z"
                }),
            ],
        );
        Self {
            collections,
            next_id: 100,
        }
    }

    pub fn handle(
        &mut self,
        method: &Method,
        segments: &[String],
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Reply {
        self.route(method, segments, query, body)
            .unwrap_or_else(Failure::into_reply)
    }

    fn route(
        &mut self,
        method: &Method,
        segments: &[String],
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Outcome {
        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let Some(collection) = segs.first().copied() else {
            return Err(Failure::new(StatusCode::NOT_FOUND, "route not found"));
        };
        if !self.collections.contains_key(collection) {
            return Err(Failure::new(
                StatusCode::NOT_FOUND,
                format!("unknown collection '{collection}'"),
            ));
        }
        let writable = WRITABLE.contains(&collection);

        match (method.as_str(), segs.as_slice()) {
            ("GET", [_]) => self.list(collection, query),
            ("GET", [_, id]) if collection != "audit_logs" => {
                let item = self.find(collection, id)?;
                ok(StatusCode::OK, item.clone())
            }
            ("POST", [_]) if writable => self.create(collection, body),
            ("PATCH", [_, id]) if writable && collection != "apps" => {
                self.patch(collection, id, body)
            }
            ("DELETE", [_, id]) if writable => self.delete(collection, id),
            ("POST", ["groups", id, "members"]) => self.add_members(id, body),
            ("DELETE", ["groups", id, "members", user_id]) => {
                self.remove_member(id, user_id)
            }
            _ => Err(Failure::new(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("{method} not supported on /{}", segs.join("/")),
            )),
        }
    }

    fn items(&mut self, collection: &str) -> &mut Vec<Value> {
        self.collections.entry(collection.to_string()).or_default()
    }

    fn find(&self, collection: &str, id: &str) -> Result<&Value, Failure> {
        self.collections
            .get(collection)
            .and_then(|items| items.iter().find(|item| id_matches(item, id)))
            .ok_or_else(|| Failure::not_found(singular(collection), id))
    }

    fn position(&self, collection: &str, id: &str) -> Result<usize, Failure> {
        self.collections
            .get(collection)
            .and_then(|items| items.iter().position(|item| id_matches(item, id)))
            .ok_or_else(|| Failure::not_found(singular(collection), id))
    }

    fn list(&self, collection: &str, query: &[(String, String)]) -> Outcome {
        let mut limit = DEFAULT_PAGE;
        let mut offset = 0usize;
        let mut filters = Vec::new();
        for (key, value) in query {
            match key.as_str() {
                "limit" => {
                    limit = value
                        .parse()
                        .ok()
                        .filter(|n| (1..=100).contains(n))
                        .ok_or_else(|| Failure::bad_request("limit must be between 1 and 100"))?;
                }
                "next_token" => {
                    offset = value
                        .parse()
                        .map_err(|_| Failure::bad_request("invalid next_token"))?;
                }
                k if RESERVED_QUERY.contains(&k) => {}
                _ => filters.push((key.as_str(), value.as_str())),
            }
        }

        let matching: Vec<&Value> = self
            .collections
            .get(collection)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| filters.iter().all(|(k, v)| field_equals(item, k, v)))
                    .collect()
            })
            .unwrap_or_default();
        let total = matching.len();
        let page: Vec<Value> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let end = offset + page.len();
        let has_more = end < total;
        Ok(Reply::Json(
            StatusCode::OK,
            json!({
                "success": true,
                "data": page,
                "total_count": total,
                "has_more": has_more,
                "next_token": has_more.then(|| end.to_string()),
            }),
        ))
    }

    fn create(&mut self, collection: &str, body: Option<Value>) -> Outcome {
        let Some(Value::Object(mut fields)) = body else {
            return Err(Failure::bad_request("request body must be a JSON object"));
        };
        let required = if collection == "users" { "email" } else { "name" };
        if !fields.get(required).is_some_and(|v| v.as_str().is_some_and(|s| !s.is_empty())) {
            return Err(Failure::bad_request(format!("{required} is required")));
        }
        if collection == "users" {
            let email = fields.get("email").cloned().unwrap_or(Value::Null);
            if self.items("users").iter().any(|u| u.get("email") == Some(&email)) {
                return Err(Failure::new(
                    StatusCode::CONFLICT,
                    "a user with this email already exists",
                ));
            }
            fields.entry("active").or_insert(Value::Bool(true));
            fields.entry("metadata").or_insert_with(|| Value::Object(Map::new()));
        }

        self.next_id += 1;
        let id = if collection == "groups" {
            json!(self.next_id)
        } else {
            json!(format!("{}_{}", singular(collection), self.next_id))
        };
        if collection == "groups" {
            fields.entry("members").or_insert_with(|| json!([]));
        }
        fields.insert("id".into(), id);
        let item = Value::Object(fields);
        self.items(collection).push(item.clone());
        ok(StatusCode::CREATED, item)
    }

    fn patch(&mut self, collection: &str, id: &str, body: Option<Value>) -> Outcome {
        let operations = body
            .as_ref()
            .and_then(|b| b.get("operations"))
            .and_then(Value::as_array)
            .filter(|ops| !ops.is_empty())
            .cloned()
            .ok_or_else(|| Failure::bad_request("operations must be a non-empty array"))?;
        let index = self.position(collection, id)?;
        let item = &mut self.items(collection)[index];
        let Some(fields) = item.as_object_mut() else {
            return Err(Failure::new(StatusCode::INTERNAL_SERVER_ERROR, "corrupt record"));
        };

        let mut next = fields.clone();
        for op in &operations {
            let kind = op.get("op").and_then(Value::as_str).unwrap_or_default();
            let path = op
                .get("path")
                .and_then(Value::as_str)
                .and_then(|p| p.strip_prefix('/'))
                .filter(|p| !p.is_empty() && !p.contains('/') && *p != "id")
                .ok_or_else(|| Failure::bad_request("path must look like /field"))?;
            match kind {
                "add" | "replace" => {
                    let value = op
                        .get("value")
                        .cloned()
                        .ok_or_else(|| Failure::bad_request(format!("{kind} needs a value")))?;
                    next.insert(path.to_string(), value);
                }
                "remove" => {
                    next.remove(path);
                }
                other => return Err(Failure::bad_request(format!("unsupported op '{other}'"))),
            }
        }
        *fields = next;
        ok(StatusCode::OK, item.clone())
    }

    fn delete(&mut self, collection: &str, id: &str) -> Outcome {
        let index = self.position(collection, id)?;
        self.items(collection).remove(index);
        Ok(Reply::NoContent)
    }

    fn add_members(&mut self, group_id: &str, body: Option<Value>) -> Outcome {
        let members = body
            .as_ref()
            .and_then(|b| b.get("members"))
            .and_then(Value::as_array)
            .filter(|m| !m.is_empty())
            .cloned()
            .ok_or_else(|| Failure::bad_request("members must be a non-empty array"))?;
        for member in &members {
            let user_id = member
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| Failure::bad_request("each member needs an id"))?;
            self.find("users", user_id)?;
        }

        let index = self.position("groups", group_id)?;
        let group = &mut self.items("groups")[index];
        let list = group
            .as_object_mut()
            .map(|g| g.entry("members").or_insert_with(|| json!([])))
            .and_then(Value::as_array_mut)
            .ok_or_else(|| Failure::new(StatusCode::INTERNAL_SERVER_ERROR, "corrupt group"))?;
        for member in members {
            let already = list.iter().any(|m| m.get("id") == member.get("id"));
            if !already {
                list.push(member);
            }
        }
        ok(StatusCode::OK, group.clone())
    }

    fn remove_member(&mut self, group_id: &str, user_id: &str) -> Outcome {
        let index = self.position("groups", group_id)?;
        let list = self.items("groups")[index]
            .get_mut("members")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| Failure::not_found("member", user_id))?;
        let before = list.len();
        list.retain(|m| m.get("id").and_then(Value::as_str) != Some(user_id));
        if list.len() == before {
            return Err(Failure::not_found("member", user_id));
        }
        Ok(Reply::NoContent)
    }
}

fn id_matches(item: &Value, id: &str) -> bool {
    match item.get("id") {
        Some(Value::String(s)) => s == id,
        Some(Value::Number(n)) => n.to_string() == id,
        _ => false,
    }
}

fn field_equals(item: &Value, key: &str, expected: &str) -> bool {
    match item.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

fn singular(collection: &str) -> &str {
    match collection {
        "apps" => "app",
        "folders" => "folder",
        "workflows" => "workflow",
        "resources" => "resource",
        "users" => "user",
        "groups" => "group",
        "audit_logs" => "audit_log",
        other => other,
    }
}
