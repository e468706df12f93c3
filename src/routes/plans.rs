use crate::models::SubscriptionPlan;
use crate::routes::{error_chain_fmt, ErrorBody};
use crate::startup::BillingDbConn;
use anyhow::Context;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use rocket::{Request, Response};
use uuid::Uuid;

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub currency: String,
    pub billing_interval: String,
    pub stripe_price_id: Option<String>,
}

impl From<SubscriptionPlan> for PlanResponse {
    fn from(plan: SubscriptionPlan) -> Self {
        PlanResponse {
            id: plan.id,
            name: plan.name,
            description: plan.description,
            price_cents: plan.price_cents,
            currency: plan.currency,
            billing_interval: plan.billing_interval,
            stripe_price_id: plan.stripe_price_id,
        }
    }
}

#[derive(thiserror::Error)]
pub enum ListPlansError {
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ListPlansError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<'r> Responder<'r, 'static> for ListPlansError {
    fn respond_to(self, request: &'r Request<'_>) -> rocket::response::Result<'static> {
        tracing::error!(error.cause_chain = ?self, "Listing plans failed");
        let body = ErrorBody {
            error: self.to_string(),
            success: None,
        };
        Response::build_from(Json(body).respond_to(request)?)
            .status(match self {
                ListPlansError::UnexpectedError(_) => Status::InternalServerError,
            })
            .ok()
    }
}

#[tracing::instrument(name = "List subscription plans", skip(conn))]
#[get("/plans")]
pub async fn list_plans(conn: BillingDbConn) -> Result<Json<Vec<PlanResponse>>, ListPlansError> {
    let plans = conn
        .run(|c: &mut PgConnection| get_active_plans(c))
        .await
        .context("Failed to fetch subscription plans from the database.")?;
    Ok(Json(plans.into_iter().map(PlanResponse::from).collect()))
}

fn get_active_plans(conn: &PgConnection) -> Result<Vec<SubscriptionPlan>, diesel::result::Error> {
    use crate::schema::subscription_plans as plans;
    plans::table
        .filter(plans::is_active.eq(true))
        .order((plans::price_cents.asc(), plans::name.asc()))
        .load::<SubscriptionPlan>(conn)
}
