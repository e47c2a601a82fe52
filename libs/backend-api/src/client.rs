//! Typed access to the murmur remote service
//!
//! `BackendApi` is the full remote contract; `HttpBackendClient` speaks it
//! over HTTP with one JSON POST per call.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::models::{Post, Principal, Topic, UserProfile, UserRole};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Full remote-service contract.
///
/// Every operation the service exposes to clients, one method each. All
/// calls are fallible awaits; none of them touches local state.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Create a post authored by the calling identity.
    async fn create_post(&self, content: &str, topic: Topic) -> ApiResult<()>;

    /// Fetch the public feed in the service's display order.
    async fn get_public_feed(&self) -> ApiResult<Vec<Post>>;

    /// Resolve a principal to its chosen username, if it saved one.
    async fn get_username(&self, user: &Principal) -> ApiResult<Option<String>>;

    /// Fetch the calling identity's profile, if it saved one.
    async fn get_caller_user_profile(&self) -> ApiResult<Option<UserProfile>>;

    /// Create or replace the calling identity's profile.
    async fn save_caller_user_profile(&self, profile: &UserProfile) -> ApiResult<()>;

    /// Fetch any user's profile by principal.
    async fn get_user_profile(&self, user: &Principal) -> ApiResult<Option<UserProfile>>;

    /// Role the service has assigned to the calling identity.
    async fn get_caller_user_role(&self) -> ApiResult<UserRole>;

    /// Whether the calling identity holds the admin role.
    async fn is_caller_admin(&self) -> ApiResult<bool>;

    /// Assign a role to a user. The service enforces that the caller is an
    /// admin.
    async fn assign_caller_user_role(&self, user: &Principal, role: UserRole) -> ApiResult<()>;
}

// ============================================================================
// HTTP TRANSPORT
// ============================================================================

/// Failure envelope returned by the service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Serialize)]
struct CreatePostRequest<'a> {
    content: &'a str,
    topic: Topic,
}

#[derive(Serialize)]
struct UserRequest<'a> {
    user: &'a Principal,
}

#[derive(Serialize)]
struct SaveProfileRequest<'a> {
    profile: &'a UserProfile,
}

#[derive(Serialize)]
struct AssignRoleRequest<'a> {
    user: &'a Principal,
    role: UserRole,
}

#[derive(Serialize)]
struct Empty {}

/// HTTP implementation of [`BackendApi`].
///
/// Each operation becomes `POST {base_url}/api/v1/{method}` with a JSON
/// body. An opaque bearer credential, once installed by the session layer,
/// authenticates the caller; credential-less calls go out anonymous.
pub struct HttpBackendClient {
    client: Client,
    base_url: String,
    credential: RwLock<Option<String>>,
}

impl HttpBackendClient {
    /// Create a client with default timeouts.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with explicit connect/request timeouts.
    pub fn with_timeouts(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: RwLock::new(None),
        })
    }

    /// Install the bearer credential used on subsequent calls.
    pub fn set_credential(&self, credential: impl Into<String>) {
        *self.credential.write() = Some(credential.into());
    }

    /// Drop the installed credential; later calls go out anonymous.
    pub fn clear_credential(&self) {
        *self.credential.write() = None;
    }

    async fn send<Req>(&self, method: &str, body: &Req) -> ApiResult<reqwest::Response>
    where
        Req: Serialize + ?Sized,
    {
        let url = format!("{}/api/v1/{}", self.base_url, method);
        debug!(method = %method, "Calling remote service");

        let mut request = self.client.post(&url).json(body);
        if let Some(credential) = self.credential.read().clone() {
            request = request.bearer_auth(credential);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, response).await);
        }
        Ok(response)
    }

    /// Call an operation and decode its JSON response.
    async fn call<Req, Res>(&self, method: &str, body: &Req) -> ApiResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let response = self.send(method, body).await?;
        response
            .json::<Res>()
            .await
            .map_err(|e| ApiError::Decode(format!("response parse failed: {}", e)))
    }

    /// Call an operation whose response body carries nothing.
    async fn call_unit<Req>(&self, method: &str, body: &Req) -> ApiResult<()>
    where
        Req: Serialize + ?Sized,
    {
        self.send(method, body).await?;
        Ok(())
    }

    async fn status_error(status: StatusCode, response: reqwest::Response) -> ApiError {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthenticated;
        }
        let message = match response.json::<ErrorResponse>().await {
            Ok(envelope) => envelope.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        ApiError::Status {
            code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl BackendApi for HttpBackendClient {
    async fn create_post(&self, content: &str, topic: Topic) -> ApiResult<()> {
        self.call_unit("create_post", &CreatePostRequest { content, topic })
            .await
    }

    async fn get_public_feed(&self) -> ApiResult<Vec<Post>> {
        self.call("get_public_feed", &Empty {}).await
    }

    async fn get_username(&self, user: &Principal) -> ApiResult<Option<String>> {
        self.call("get_username", &UserRequest { user }).await
    }

    async fn get_caller_user_profile(&self) -> ApiResult<Option<UserProfile>> {
        self.call("get_caller_user_profile", &Empty {}).await
    }

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> ApiResult<()> {
        self.call_unit("save_caller_user_profile", &SaveProfileRequest { profile })
            .await
    }

    async fn get_user_profile(&self, user: &Principal) -> ApiResult<Option<UserProfile>> {
        self.call("get_user_profile", &UserRequest { user }).await
    }

    async fn get_caller_user_role(&self) -> ApiResult<UserRole> {
        self.call("get_caller_user_role", &Empty {}).await
    }

    async fn is_caller_admin(&self) -> ApiResult<bool> {
        self.call("is_caller_admin", &Empty {}).await
    }

    async fn assign_caller_user_role(&self, user: &Principal, role: UserRole) -> ApiResult<()> {
        self.call_unit("assign_caller_user_role", &AssignRoleRequest { user, role })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpBackendClient::new("http://localhost:8080/").expect("Should build");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn credential_install_and_clear() {
        let client = HttpBackendClient::new("http://localhost:8080").expect("Should build");
        assert!(client.credential.read().is_none());

        client.set_credential("delegation-token");
        assert_eq!(
            client.credential.read().as_deref(),
            Some("delegation-token")
        );

        client.clear_credential();
        assert!(client.credential.read().is_none());
    }

    #[test]
    fn create_post_request_wire_shape() {
        let body = CreatePostRequest {
            content: "hello world",
            topic: Topic::Tech,
        };
        let value = serde_json::to_value(&body).expect("Should serialize");
        assert_eq!(value["content"], "hello world");
        assert_eq!(value["topic"], "tech");
    }

    #[test]
    fn assign_role_request_wire_shape() {
        let user = Principal::new("user-9");
        let body = AssignRoleRequest {
            user: &user,
            role: UserRole::Admin,
        };
        let value = serde_json::to_value(&body).expect("Should serialize");
        assert_eq!(value["user"], "user-9");
        assert_eq!(value["role"], "admin");
    }
}
