use chrono::{NaiveTime, Timelike};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The home page never lists more than this many visitors.
pub const ONLINE_LIMIT: usize = 18;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A user row from `GET /admin/users/json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Form body of `POST /admin/users/add-json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Form body of `POST /admin/permissions/add-json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewPermission {
    pub name: String,
    pub category: String,
}

/// `{success, username|name|message}` envelope shared by the write endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ActionResponse {
    fn into_result(self) -> Result<Self, ApiError> {
        if self.success {
            Ok(self)
        } else {
            Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "Request rejected".to_string()),
            ))
        }
    }
}

/// A visitor seen in the last few minutes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OnlineUser {
    #[serde(default)]
    pub username: Option<String>,
    /// `HH:MM`, as the server formats it.
    pub last_seen: String,
}

impl OnlineUser {
    pub fn display_name(&self) -> &str {
        match self.username.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Anonymous visitor",
        }
    }

    pub fn last_seen_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(self.last_seen.trim(), "%H:%M").ok()
    }

    fn minute_of_day(&self) -> Option<u32> {
        self.last_seen_time().map(|t| t.hour() * 60 + t.minute())
    }
}

/// Newest first. Stamps carry no date, so a set spanning more than half a
/// day has crossed midnight and its early-morning stamps are the newest.
/// Unreadable stamps go last; ties keep the server's order.
fn sort_newest_first(users: &mut [OnlineUser]) {
    let minutes = users.iter().filter_map(OnlineUser::minute_of_day);
    let (lo, hi) = minutes.fold((u32::MAX, 0), |(lo, hi), m| (lo.min(m), hi.max(m)));
    let wrapped = hi.saturating_sub(lo) > MINUTES_PER_DAY / 2;

    users.sort_by_key(|u| {
        std::cmp::Reverse(u.minute_of_day().map(|m| {
            if wrapped && m < MINUTES_PER_DAY / 2 {
                m + MINUTES_PER_DAY
            } else {
                m
            }
        }))
    });
}

/// The online counter counts everyone; the list shows the first few.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnlineSnapshot {
    pub total: usize,
    pub users: Vec<OnlineUser>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered `{success: false}`.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Message suitable for a toast or stderr.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http(e) if e.is_timeout() => "The server did not answer in time".to_string(),
            ApiError::Http(e) if e.is_connect() => "Cannot reach the server".to_string(),
            ApiError::Http(e) => format!("Network error: {}", e),
            ApiError::Status { status, .. } => format!("Server error ({})", status),
            ApiError::Decode(_) => "The server sent an unexpected response".to_string(),
            ApiError::Rejected(message) => message.clone(),
        }
    }
}

/// Client for the admin JSON endpoints.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
    online_path: String,
}

impl AdminClient {
    pub fn new(base_url: &str, timeout: Duration, online_path: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("admin-panel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            online_path: online_path.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let response = self.http.get(self.url("/admin/users/json")).send().await?;
        let users: Vec<User> = read_json(response).await?;
        tracing::debug!(count = users.len(), "users loaded");
        Ok(users)
    }

    /// Returns the created username.
    pub async fn add_user(&self, user: &NewUser) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/admin/users/add-json"))
            .form(user)
            .send()
            .await?;
        let reply = read_json::<ActionResponse>(response).await?.into_result()?;
        let username = reply.username.unwrap_or_else(|| user.username.clone());
        tracing::info!(%username, "user added");
        Ok(username)
    }

    /// Returns the created permission name.
    pub async fn add_permission(&self, permission: &NewPermission) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/admin/permissions/add-json"))
            .form(permission)
            .send()
            .await?;
        let reply = read_json::<ActionResponse>(response).await?.into_result()?;
        let name = reply.name.unwrap_or_else(|| permission.name.clone());
        tracing::info!(%name, "permission added");
        Ok(name)
    }

    /// Returns the server's confirmation message.
    pub async fn delete_user(&self, id: i64) -> Result<String, ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/admin/users/delete-json/{}", id)))
            .send()
            .await?;
        let reply = read_json::<ActionResponse>(response).await?.into_result()?;
        tracing::info!(id, "user deleted");
        Ok(reply.message.unwrap_or_else(|| "User deleted".to_string()))
    }

    /// Recent visitors, newest first, capped at [`ONLINE_LIMIT`].
    pub async fn online_users(&self) -> Result<OnlineSnapshot, ApiError> {
        let response = self.http.get(self.url(&self.online_path)).send().await?;
        let mut users: Vec<OnlineUser> = read_json(response).await?;
        let total = users.len();
        sort_newest_first(&mut users);
        users.truncate(ONLINE_LIMIT);
        Ok(OnlineSnapshot { total, users })
    }
}

/// Decode a JSON body. Error statuses still carry `{success, message}`
/// bodies, so the status only matters when the body does not parse.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.bytes().await?;
    match serde_json::from_slice::<T>(&body) {
        Ok(value) => Ok(value),
        Err(e) if status.is_success() => Err(ApiError::Decode(e)),
        Err(_) => {
            tracing::warn!(status = status.as_u16(), %url, "request failed");
            Err(ApiError::Status {
                status: status.as_u16(),
                url,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, Path, State};
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    type Calls = Arc<Mutex<Vec<String>>>;

    async fn users(State(calls): State<Calls>) -> Json<Value> {
        calls.lock().unwrap().push("list".to_string());
        Json(json!([
            {"id": 1, "username": "salem", "email": "salem@example.org", "permissions": ["news", "gallery"]},
            {"id": 2, "username": "huda", "email": null, "permissions": []}
        ]))
    }

    async fn add_user(State(calls): State<Calls>, Form(form): Form<HashMap<String, String>>) -> Json<Value> {
        let username = form.get("username").cloned().unwrap_or_default();
        calls.lock().unwrap().push(format!("add:{}:{}", username, form.get("role").cloned().unwrap_or_default()));
        if username == "taken" {
            Json(json!({"success": false, "message": "Username already exists"}))
        } else {
            Json(json!({"success": true, "username": username}))
        }
    }

    async fn add_permission(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
        Json(json!({"success": true, "name": form.get("name")}))
    }

    async fn delete_user(Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
        if id == 404 {
            (StatusCode::NOT_FOUND, Json(json!({"success": false, "message": "User not found"})))
        } else {
            (StatusCode::OK, Json(json!({"success": true, "message": "deleted"})))
        }
    }

    async fn online() -> Json<Value> {
        let rows: Vec<Value> = (0..25)
            .map(|i| {
                if i == 0 {
                    json!({"username": null, "last_seen": "10:00"})
                } else {
                    json!({"username": format!("user{}", i), "last_seen": "10:01"})
                }
            })
            .collect();
        Json(Value::Array(rows))
    }

    async fn online_across_midnight() -> Json<Value> {
        let mut rows = vec![
            json!({"username": "old1", "last_seen": "23:58"}),
            json!({"username": "old2", "last_seen": "23:57"}),
        ];
        rows.extend((0..20).map(|i| json!({"username": format!("new{}", i), "last_seen": "00:03"})));
        Json(Value::Array(rows))
    }

    async fn spawn_stub() -> (String, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/admin/users/json", get(users))
            .route("/admin/users/add-json", post(add_user))
            .route("/admin/permissions/add-json", post(add_permission))
            .route("/admin/users/delete-json/:id", delete(delete_user))
            .route("/admin/online/json", get(online))
            .route("/admin/online/midnight", get(online_across_midnight))
            .route("/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
            .with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}/"), calls)
    }

    fn client(base: &str, online_path: &str) -> AdminClient {
        AdminClient::new(base, Duration::from_secs(5), online_path).unwrap()
    }

    #[tokio::test]
    async fn test_list_users() {
        let (base, calls) = spawn_stub().await;
        let users = client(&base, "/admin/online/json").list_users().await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].permissions, vec!["news", "gallery"]);
        assert_eq!(users[1].email, None);
        assert_eq!(calls.lock().unwrap().as_slice(), ["list"]);
    }

    #[tokio::test]
    async fn test_add_user_sends_form() {
        let (base, calls) = spawn_stub().await;
        let new_user = NewUser {
            username: "nour".to_string(),
            email: "nour@example.org".to_string(),
            password: "secret".to_string(),
            role: "editor".to_string(),
        };
        let name = client(&base, "/admin/online/json").add_user(&new_user).await.unwrap();

        assert_eq!(name, "nour");
        assert_eq!(calls.lock().unwrap().as_slice(), ["add:nour:editor"]);
    }

    #[tokio::test]
    async fn test_add_user_rejected_carries_message() {
        let (base, _) = spawn_stub().await;
        let new_user = NewUser {
            username: "taken".to_string(),
            ..NewUser::default()
        };
        let err = client(&base, "/admin/online/json").add_user(&new_user).await.unwrap_err();

        assert!(matches!(err, ApiError::Rejected(_)));
        assert_eq!(err.user_message(), "Username already exists");
    }

    #[tokio::test]
    async fn test_add_permission() {
        let (base, _) = spawn_stub().await;
        let permission = NewPermission {
            name: "library".to_string(),
            category: "content".to_string(),
        };
        let name = client(&base, "/admin/online/json").add_permission(&permission).await.unwrap();
        assert_eq!(name, "library");
    }

    #[tokio::test]
    async fn test_delete_user_reads_body_on_error_status() {
        let (base, _) = spawn_stub().await;
        let c = client(&base, "/admin/online/json");

        assert_eq!(c.delete_user(7).await.unwrap(), "deleted");
        let err = c.delete_user(404).await.unwrap_err();
        assert_eq!(err.user_message(), "User not found");
    }

    #[tokio::test]
    async fn test_online_users_capped() {
        let (base, _) = spawn_stub().await;
        let online = client(&base, "/admin/online/json").online_users().await.unwrap();

        assert_eq!(online.total, 25);
        assert_eq!(online.users.len(), ONLINE_LIMIT);
        // Newest first; the 10:00 visitor falls off the list.
        assert_eq!(online.users[0].display_name(), "user1");
        assert!(online.users.iter().all(|u| u.last_seen == "10:01"));
    }

    #[tokio::test]
    async fn test_online_users_newest_first_across_midnight() {
        let (base, _) = spawn_stub().await;
        let online = client(&base, "/admin/online/midnight").online_users().await.unwrap();

        assert_eq!(online.total, 22);
        assert_eq!(online.users[0].display_name(), "new0");
        assert_eq!(online.users.len(), ONLINE_LIMIT);
        assert!(online.users.iter().all(|u| u.last_seen == "00:03"));
    }

    fn seen(name: &str, last_seen: &str) -> OnlineUser {
        OnlineUser {
            username: Some(name.to_string()),
            last_seen: last_seen.to_string(),
        }
    }

    #[test]
    fn test_sort_newest_first() {
        let mut users = vec![seen("a", "09:58"), seen("b", "bad"), seen("c", "10:02"), seen("d", "10:00")];
        sort_newest_first(&mut users);
        let names: Vec<&str> = users.iter().map(|u| u.display_name()).collect();
        assert_eq!(names, ["c", "d", "a", "b"]);

        let mut users = vec![seen("late", "23:59"), seen("early", "00:01"), seen("mid", "00:00")];
        sort_newest_first(&mut users);
        let names: Vec<&str> = users.iter().map(|u| u.display_name()).collect();
        assert_eq!(names, ["early", "mid", "late"]);
    }

    #[test]
    fn test_online_user_display() {
        let anonymous = OnlineUser {
            username: None,
            last_seen: "09:15".to_string(),
        };
        assert_eq!(anonymous.display_name(), "Anonymous visitor");
        assert_eq!(anonymous.last_seen_time(), NaiveTime::from_hms_opt(9, 15, 0));

        let blank = OnlineUser {
            username: Some("  ".to_string()),
            last_seen: "late".to_string(),
        };
        assert_eq!(blank.display_name(), "Anonymous visitor");
        assert_eq!(blank.last_seen_time(), None);
    }

    #[tokio::test]
    async fn test_non_json_error_is_status() {
        let (base, _) = spawn_stub().await;
        let err = client(&base, "/broken").online_users().await.unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert_eq!(err.user_message(), "Server error (500)");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let c = client("http://localhost:8000///", "/x");
        assert_eq!(c.base_url(), "http://localhost:8000");
        assert_eq!(c.url("/admin/users/json"), "http://localhost:8000/admin/users/json");
    }
}
