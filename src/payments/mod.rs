mod stripe_client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use stripe_client::StripeClient;

use crate::domain::UserEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSubscription {
    pub id: String,
    /// Price of the first subscription item, when Stripe reports one.
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPortalSession {
    pub id: String,
    pub url: String,
}

/// The subset of the payment processor's API the billing routes rely on.
///
/// Every call is attempted exactly once; errors carry the processor's own
/// message so it can be surfaced to the caller.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn find_customer_by_email(
        &self,
        email: &UserEmail,
    ) -> Result<Option<Customer>, anyhow::Error>;

    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<ActiveSubscription>, anyhow::Error>;

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<BillingPortalSession, anyhow::Error>;
}
