use crate::adapters::http::ApiClient;
use crate::domain::model::{AuthUser, LoginRequest, LoginResponse};
use crate::utils::error::{AdminError, Result};
use reqwest::Method;
use tokio::sync::watch;

const LOGIN_PATH: &str = "/api/auth/login/";
const CURRENT_USER_PATH: &str = "/account/auth-user/";
const NOT_AUTHENTICATED: &str = "user not authenticated";

/// The signed-in user, passed explicitly to whatever needs it.
///
/// Lifetime: [`UserContext::init`] resolves the current user (or none) from
/// the stored credential; [`UserContext::logout`] clears the credential and
/// the user and notifies every subscriber.
pub struct UserContext {
    api: ApiClient,
    user: watch::Sender<Option<AuthUser>>,
}

impl UserContext {
    pub async fn init(api: ApiClient) -> Result<Self> {
        let user = fetch_current_user(&api).await?;
        match &user {
            Some(user) => tracing::debug!("Signed in as {}", user.email),
            None => tracing::debug!("No signed-in user"),
        }
        let (sender, _) = watch::channel(user);
        Ok(Self { api, user: sender })
    }

    /// A context that has not asked the server yet, for login and logout.
    pub fn signed_out(api: ApiClient) -> Self {
        let (sender, _) = watch::channel(None);
        Self { api, user: sender }
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.user.subscribe()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .api
            .send_json(Method::POST, LOGIN_PATH, &request, "login", None)
            .await?;
        self.api.credentials().save(&response.access)?;
        tracing::info!("Logged in as {}", email);

        match self.refresh().await? {
            Some(user) => Ok(user),
            None => Err(AdminError::Http {
                status: 400,
                body: "login succeeded but the server reports no authenticated user".to_string(),
            }),
        }
    }

    pub async fn refresh(&self) -> Result<Option<AuthUser>> {
        let user = fetch_current_user(&self.api).await?;
        self.user.send_replace(user.clone());
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.api.credentials().clear()?;
        self.user.send_replace(None);
        tracing::info!("Logged out");
        Ok(())
    }
}

async fn fetch_current_user(api: &ApiClient) -> Result<Option<AuthUser>> {
    if api.credentials().load()?.is_none() {
        return Ok(None);
    }

    match api.get_json::<AuthUser>(CURRENT_USER_PATH, "user", None).await {
        Ok(user) => Ok(Some(user)),
        Err(AdminError::Validation { details, .. })
            if details.get("message").and_then(|m| m.as_str()) == Some(NOT_AUTHENTICATED) =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
