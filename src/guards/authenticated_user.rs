use crate::domain::UserEmail;
use crate::guards::{BearerAuth, OrStatus};
use crate::identity::IdentityProvider;
use crate::routes::error_chain_fmt;
use rocket::http::Status;
use rocket::outcome::{try_outcome, IntoOutcome};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: UserEmail,
    // prevents construction outside of this module
    _private: (),
}

#[derive(thiserror::Error)]
pub enum AuthError {
    /// No usable bearer token, or the identity provider refused it.
    #[error(transparent)]
    InvalidCredentials(anyhow::Error),
    #[error(transparent)]
    ProviderUnavailable(anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidCredentials(_) => Status::Unauthorized,
            AuthError::ProviderUnavailable(_) => Status::InternalServerError,
        }
    }
}

impl std::fmt::Debug for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let identity = match request
            .rocket()
            .state::<Arc<dyn IdentityProvider>>()
            .or_status(
                Status::InternalServerError,
                "No identity provider has been configured.",
            ) {
            Ok(identity) => identity,
            Err((status, e)) => {
                return Outcome::Failure((status, AuthError::ProviderUnavailable(e)))
            }
        };
        let bearer_auth = try_outcome!(request
            .guard::<BearerAuth>()
            .await
            .map_failure(|(status, e)| (status, AuthError::InvalidCredentials(e))));

        identity
            .get_user(&bearer_auth.token)
            .await
            .map(|user| AuthenticatedUser {
                user_id: user.user_id,
                email: user.email,
                _private: (),
            })
            .map_err(AuthError::InvalidCredentials)
            .into_outcome(Status::Unauthorized)
    }
}
