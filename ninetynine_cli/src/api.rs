use std::time::Duration;

use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::Room;

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub email: &'a str,
}

/// Older builds of the server looked users up by username, so it is sent when given.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest<'a> {
    pub user_id: &'a str,
    pub room_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettingRequest<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub username: &'a str,
}

/// Whatever came back: status plus body. Non-2xx is data here, not an error.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The server reports failures as `{"error": "..."}`.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    pub fn room(&self) -> Result<Room> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.body.get("userId").and_then(Value::as_str)
    }
}

pub struct GameApi {
    client: Client,
    config: Config,
}

impl GameApi {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn register(&self, username: &str, password: &str, email: &str) -> Result<ApiResponse> {
        self.post(
            "/register",
            &RegisterRequest {
                username,
                password,
                email,
            },
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str, username: Option<&str>) -> Result<ApiResponse> {
        self.post(
            "/login",
            &LoginRequest {
                username,
                email,
                password,
            },
        )
        .await
    }

    pub async fn create_room(&self, user_id: &str) -> Result<ApiResponse> {
        self.post("/createroom", &CreateRoomRequest { user_id }).await
    }

    pub async fn join_room(&self, user_id: &str, room_id: &str) -> Result<ApiResponse> {
        self.post("/joinroom", &JoinRoomRequest { user_id, room_id })
            .await
    }

    pub async fn account_setting(&self, user_id: &str, email: &str, username: &str) -> Result<ApiResponse> {
        self.post(
            "/accountsetting",
            &AccountSettingRequest {
                user_id,
                email,
                username,
            },
        )
        .await
    }

    /// Any path, any JSON body.
    pub async fn post_raw(&self, path: &str, body: &Value) -> Result<ApiResponse> {
        self.post(path, body).await
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        let url = self.config.http_url(path)?;
        tracing::debug!(%url, "POST");

        let client = &self.client;
        let target = &url;
        // Only transport failures are retried; a 4xx/5xx is a real answer.
        let res = retry(self.backoff(), move || async move {
            client
                .post(target.clone())
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!(url = %target, "request failed, retrying: {}", e);
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
        })
        .await?;

        let status = res.status();
        let text = res.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::info!(%url, %status, "response received");
        Ok(ApiResponse { status, body })
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(self.config.retry_window))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_body_omits_missing_username() {
        let body = serde_json::to_value(LoginRequest {
            username: None,
            email: "test@email.com",
            password: "123456",
        })
        .unwrap();
        assert_eq!(body, json!({ "email": "test@email.com", "password": "123456" }));

        let body = serde_json::to_value(LoginRequest {
            username: Some("test"),
            email: "test@email.com",
            password: "123456",
        })
        .unwrap();
        assert_eq!(body["username"], "test");
    }

    #[test]
    fn room_requests_use_camel_case() {
        let body = serde_json::to_value(JoinRoomRequest {
            user_id: "u1",
            room_id: "r1",
        })
        .unwrap();
        assert_eq!(body, json!({ "userId": "u1", "roomId": "r1" }));
    }

    #[test]
    fn error_message_reads_error_field() {
        let res = ApiResponse {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": "Room is full" }),
        };
        assert!(!res.is_success());
        assert_eq!(res.error_message(), Some("Room is full"));

        let res = ApiResponse {
            status: StatusCode::OK,
            body: json!("plain text"),
        };
        assert_eq!(res.error_message(), None);
    }
}
