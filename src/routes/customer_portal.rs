use crate::domain::PortalReturnUrl;
use crate::guards::{AuthError, AuthenticatedUser, RequestOrigin};
use crate::payments::PaymentProcessor;
use crate::routes::{error_chain_fmt, ErrorBody};
use rocket::http::{Header, Status};
use rocket::response::Responder;
use rocket::serde::json::Json;
use rocket::{Request, Response, State};
use std::sync::Arc;
use uuid::Uuid;

/// Where the billing portal returns to when the request names no origin.
pub struct PortalReturnTarget {
    pub fallback_origin: String,
    pub path: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct PortalSessionResponse {
    pub url: String,
    pub success: bool,
}

#[derive(thiserror::Error)]
pub enum PortalError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    AuthError(#[from] AuthError),
    #[error("No Stripe customer found for this user")]
    NoCustomer,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for PortalError {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = match &self {
            PortalError::MethodNotAllowed => Status::MethodNotAllowed,
            PortalError::AuthError(e) => e.status(),
            PortalError::NoCustomer => Status::NotFound,
            PortalError::UnexpectedError(_) => Status::InternalServerError,
        };
        if status == Status::InternalServerError {
            tracing::error!(error.cause_chain = ?self, "Billing portal session failed");
        } else {
            tracing::warn!(error.cause_chain = ?self, "Billing portal request rejected");
        }
        let error = match &self {
            PortalError::UnexpectedError(e) => format!("{:#}", e),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error,
            success: Some(false),
        };
        let mut response = Response::build_from(Json(body).respond_to(request)?);
        response.status(status);
        match self {
            PortalError::MethodNotAllowed => {
                response.header(Header::new("Allow", "POST, OPTIONS"));
            }
            PortalError::AuthError(_) if status == Status::Unauthorized => {
                response.header(Header::new("WWW-Authenticate", "Bearer"));
            }
            _ => {}
        }
        response.ok()
    }
}

#[tracing::instrument(
    name = "Create billing portal session",
    skip(user, origin, payments, target),
    fields(request_id = %Uuid::new_v4())
)]
#[post("/customer-portal")]
pub async fn customer_portal(
    user: Result<AuthenticatedUser, AuthError>,
    origin: RequestOrigin,
    payments: &State<Arc<dyn PaymentProcessor>>,
    target: &State<PortalReturnTarget>,
) -> Result<Json<PortalSessionResponse>, PortalError> {
    let user = user?;
    let customer = payments
        .find_customer_by_email(&user.email)
        .await?
        .ok_or(PortalError::NoCustomer)?;

    let return_url = PortalReturnUrl::derive(
        origin.origin.as_deref(),
        origin.referer.as_deref(),
        &target.fallback_origin,
        &target.path,
    );
    let session = payments
        .create_billing_portal_session(&customer.id, return_url.as_ref())
        .await?;

    tracing::info!(session_id = %session.id, "Billing portal session created");
    Ok(Json(PortalSessionResponse {
        url: session.url,
        success: true,
    }))
}

#[options("/customer-portal")]
pub fn customer_portal_preflight() {}

#[get("/customer-portal")]
pub fn customer_portal_get() -> PortalError {
    PortalError::MethodNotAllowed
}

#[put("/customer-portal")]
pub fn customer_portal_put() -> PortalError {
    PortalError::MethodNotAllowed
}

#[patch("/customer-portal")]
pub fn customer_portal_patch() -> PortalError {
    PortalError::MethodNotAllowed
}

#[delete("/customer-portal")]
pub fn customer_portal_delete() -> PortalError {
    PortalError::MethodNotAllowed
}
