use crate::schema::user_subscriptions;
use chrono::offset::Utc;
use chrono::DateTime;

/// One row per user; written in full on every reconciliation.
#[derive(Queryable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[table_name = "user_subscriptions"]
#[changeset_options(treat_none_as_null = "true")]
pub struct SubscriptionStatusRow {
    pub user_id: uuid::Uuid,
    pub plan_id: Option<uuid::Uuid>,
    pub stripe_subscription_id: Option<String>,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
}
