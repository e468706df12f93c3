use chrono::offset::Utc;
use chrono::DateTime;

#[derive(Queryable, Debug)]
pub struct SubscriptionPlan {
    pub id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub currency: String,
    pub billing_interval: String,
    pub stripe_price_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
