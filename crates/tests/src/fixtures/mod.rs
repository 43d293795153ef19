pub mod memory_store;
pub mod test_app;

use async_trait::async_trait;
use huddle_services::auth::{AuthError, TokenVerifier, UserDescriptor};
use std::collections::HashMap;

/// Verifier with a fixed token table. `token-<id>` maps to user `<id>` with
/// display name `User <id>`.
#[derive(Default)]
pub struct StaticTokenVerifier {
    users: HashMap<String, UserDescriptor>,
}

impl StaticTokenVerifier {
    pub fn with_users(ids: &[&str]) -> Self {
        let users = ids
            .iter()
            .map(|id| {
                (
                    format!("token-{id}"),
                    UserDescriptor {
                        user_id: id.to_string(),
                        display_name: Some(format!("User {id}")),
                        email: Some(format!("{id}@example.com")),
                        avatar_url: None,
                    },
                )
            })
            .collect();
        Self { users }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserDescriptor, AuthError> {
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".into()))
    }
}
