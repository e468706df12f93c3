use crate::domain::{BillingState, PlanRef, SubscriptionStatusResponse};
use crate::guards::{AuthError, AuthenticatedUser};
use crate::models::SubscriptionStatusRow;
use crate::payments::PaymentProcessor;
use crate::routes::{error_chain_fmt, ErrorBody};
use crate::startup::BillingDbConn;
use anyhow::Context;
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl};
use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use rocket::{Request, Response, State};
use std::sync::Arc;
use uuid::Uuid;

#[derive(thiserror::Error)]
pub enum CheckSubscriptionError {
    #[error(transparent)]
    AuthError(#[from] AuthError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for CheckSubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for CheckSubscriptionError {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        let status = match &self {
            CheckSubscriptionError::AuthError(e) => e.status(),
            CheckSubscriptionError::UnexpectedError(_) => Status::InternalServerError,
        };
        if status == Status::InternalServerError {
            tracing::error!(error.cause_chain = ?self, "Subscription check failed");
        } else {
            tracing::warn!(error.cause_chain = ?self, "Rejected subscription check");
        }
        let error = match &self {
            CheckSubscriptionError::UnexpectedError(e) => format!("{:#}", e),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error,
            success: None,
        };
        Response::build_from(Json(body).respond_to(request)?)
            .status(status)
            .ok()
    }
}

type CheckSubscriptionResult = Result<Json<SubscriptionStatusResponse>, CheckSubscriptionError>;

// The check is served on every verb a client may use; OPTIONS is the CORS preflight.

#[post("/check-subscription")]
pub async fn check_subscription(
    user: Result<AuthenticatedUser, AuthError>,
    conn: BillingDbConn,
    payments: &State<Arc<dyn PaymentProcessor>>,
) -> CheckSubscriptionResult {
    reconcile(user, &conn, payments.inner().as_ref()).await
}

#[get("/check-subscription")]
pub async fn check_subscription_get(
    user: Result<AuthenticatedUser, AuthError>,
    conn: BillingDbConn,
    payments: &State<Arc<dyn PaymentProcessor>>,
) -> CheckSubscriptionResult {
    reconcile(user, &conn, payments.inner().as_ref()).await
}

#[put("/check-subscription")]
pub async fn check_subscription_put(
    user: Result<AuthenticatedUser, AuthError>,
    conn: BillingDbConn,
    payments: &State<Arc<dyn PaymentProcessor>>,
) -> CheckSubscriptionResult {
    reconcile(user, &conn, payments.inner().as_ref()).await
}

#[patch("/check-subscription")]
pub async fn check_subscription_patch(
    user: Result<AuthenticatedUser, AuthError>,
    conn: BillingDbConn,
    payments: &State<Arc<dyn PaymentProcessor>>,
) -> CheckSubscriptionResult {
    reconcile(user, &conn, payments.inner().as_ref()).await
}

#[delete("/check-subscription")]
pub async fn check_subscription_delete(
    user: Result<AuthenticatedUser, AuthError>,
    conn: BillingDbConn,
    payments: &State<Arc<dyn PaymentProcessor>>,
) -> CheckSubscriptionResult {
    reconcile(user, &conn, payments.inner().as_ref()).await
}

#[options("/check-subscription")]
pub fn check_subscription_preflight() {}

/// Re-derives the user's billing state from the payment processor and writes
/// it over the user's status row.
#[tracing::instrument(
    name = "Check subscription status",
    skip(user, conn, payments),
    fields(request_id = %Uuid::new_v4(), user_id = tracing::field::Empty)
)]
async fn reconcile(
    user: Result<AuthenticatedUser, AuthError>,
    conn: &BillingDbConn,
    payments: &dyn PaymentProcessor,
) -> CheckSubscriptionResult {
    let user = user?;
    tracing::Span::current().record("user_id", &tracing::field::display(&user.user_id));
    let state = fetch_billing_state(&user, conn, payments).await?;
    store_billing_state(conn, state.to_row(user.user_id))
        .await
        .context("Failed to store the subscription status.")?;
    tracing::info!(status = state.status().as_str(), "Subscription status reconciled");
    Ok(Json(state.to_response()))
}

#[tracing::instrument(name = "Fetch billing state", skip(user, conn, payments))]
async fn fetch_billing_state(
    user: &AuthenticatedUser,
    conn: &BillingDbConn,
    payments: &dyn PaymentProcessor,
) -> Result<BillingState, anyhow::Error> {
    let customer = match payments.find_customer_by_email(&user.email).await? {
        Some(customer) => customer,
        None => {
            tracing::info!("No payment customer on file");
            return Ok(BillingState::Unsubscribed);
        }
    };
    let subscription = match payments.find_active_subscription(&customer.id).await? {
        Some(subscription) => subscription,
        None => return Ok(BillingState::Unsubscribed),
    };
    let plan = match subscription.price_id.clone() {
        Some(price_id) => conn
            .run(move |c: &mut PgConnection| find_plan_by_price(c, &price_id))
            .await
            .context("Failed to look up the subscribed plan.")?,
        None => None,
    };
    if plan.is_none() {
        tracing::warn!(
            stripe_subscription_id = %subscription.id,
            "Active subscription does not match any known plan"
        );
    }
    Ok(BillingState::Subscribed {
        plan,
        stripe_subscription_id: subscription.id,
        current_period_end: subscription.current_period_end,
    })
}

fn find_plan_by_price(
    conn: &PgConnection,
    price_id: &str,
) -> Result<Option<PlanRef>, diesel::result::Error> {
    use crate::schema::subscription_plans as plans;
    plans::table
        .select((plans::id, plans::name))
        .filter(plans::stripe_price_id.eq(price_id))
        .first::<(Uuid, String)>(conn)
        .optional()
        .map(|plan| plan.map(|(id, name)| PlanRef { id, name }))
}

#[tracing::instrument(name = "Upsert subscription status", skip(conn, row))]
async fn store_billing_state(
    conn: &BillingDbConn,
    row: SubscriptionStatusRow,
) -> Result<(), diesel::result::Error> {
    use crate::schema::user_subscriptions;
    conn.run(move |c: &mut PgConnection| {
        diesel::insert_into(user_subscriptions::table)
            .values(&row)
            .on_conflict(user_subscriptions::user_id)
            .do_update()
            .set(&row)
            .execute(c)
            .map(|_| ())
    })
    .await
}
