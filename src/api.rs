//! Remote users collection
//!
//! `UsersApi` is the seam between the manager and the network. The HTTP
//! implementation talks to a JSON collection endpoint:
//!
//! | Operation | Method | Path          |
//! |-----------|--------|---------------|
//! | list      | GET    | `/users`      |
//! | create    | POST   | `/users`      |
//! | update    | PUT    | `/users/{id}` |
//! | delete    | DELETE | `/users/{id}` |

use crate::constants::USERS_PATH;
use crate::error::Result;
use crate::types::{User, UserPayload};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait UsersApi: Send + Sync {
    async fn list(&self) -> Result<Vec<User>>;
    async fn create(&self, payload: &UserPayload) -> Result<User>;
    async fn update(&self, id: u64, payload: &UserPayload) -> Result<User>;
    /// Response body is ignored.
    async fn delete(&self, id: u64) -> Result<()>;
}

pub struct HttpUsersApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUsersApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, USERS_PATH)
    }

    pub fn item_url(&self, id: u64) -> String {
        format!("{}/{}/{}", self.base_url, USERS_PATH, id)
    }
}

#[async_trait]
impl UsersApi for HttpUsersApi {
    async fn list(&self) -> Result<Vec<User>> {
        let url = self.collection_url();
        debug!(%url, "GET users");
        let users = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<User>>()
            .await?;
        debug!(count = users.len(), "Users received");
        Ok(users)
    }

    async fn create(&self, payload: &UserPayload) -> Result<User> {
        let url = self.collection_url();
        debug!(%url, "POST user");
        let user = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?
            .json::<User>()
            .await?;
        Ok(user)
    }

    async fn update(&self, id: u64, payload: &UserPayload) -> Result<User> {
        let url = self.item_url(id);
        debug!(%url, "PUT user");
        let user = self
            .client
            .put(&url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?
            .json::<User>()
            .await?;
        Ok(user)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        let url = self.item_url(id);
        debug!(%url, "DELETE user");
        self.client.delete(&url).send().await?.error_for_status()?;
        Ok(())
    }
}
