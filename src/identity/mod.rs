mod supabase_auth_client;

use crate::domain::{BearerToken, UserEmail};
use async_trait::async_trait;
pub use supabase_auth_client::SupabaseAuthClient;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct IdentifiedUser {
    pub user_id: Uuid,
    pub email: UserEmail,
}

/// Resolves an access token into the user it was issued to.
///
/// Any error means the caller is not authenticated.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, token: &BearerToken) -> Result<IdentifiedUser, anyhow::Error>;
}
