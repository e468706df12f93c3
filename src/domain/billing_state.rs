use crate::domain::SubscriptionStatus;
use crate::models::SubscriptionStatusRow;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// A local plan matched against the price of a Stripe subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRef {
    pub id: Uuid,
    pub name: String,
}

/// Billing state of a user as derived from Stripe during reconciliation.
///
/// Every check rebuilds this value from scratch; it is then written over the
/// user's status row in full and rendered as the endpoint's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingState {
    Unsubscribed,
    Subscribed {
        plan: Option<PlanRef>,
        stripe_subscription_id: String,
        current_period_end: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubscriptionStatusResponse {
    pub subscribed: bool,
    pub plan: Option<String>,
    pub current_period_end: Option<String>,
}

impl BillingState {
    pub fn status(&self) -> SubscriptionStatus {
        match self {
            BillingState::Unsubscribed => SubscriptionStatus::Inactive,
            BillingState::Subscribed { .. } => SubscriptionStatus::Active,
        }
    }

    pub fn to_row(&self, user_id: Uuid) -> SubscriptionStatusRow {
        let status = self.status().as_str().to_string();
        match self {
            BillingState::Unsubscribed => SubscriptionStatusRow {
                user_id,
                plan_id: None,
                stripe_subscription_id: None,
                status,
                current_period_end: None,
            },
            BillingState::Subscribed {
                plan,
                stripe_subscription_id,
                current_period_end,
            } => SubscriptionStatusRow {
                user_id,
                plan_id: plan.as_ref().map(|p| p.id),
                stripe_subscription_id: Some(stripe_subscription_id.clone()),
                status,
                current_period_end: *current_period_end,
            },
        }
    }

    pub fn to_response(&self) -> SubscriptionStatusResponse {
        match self {
            BillingState::Unsubscribed => SubscriptionStatusResponse {
                subscribed: false,
                plan: None,
                current_period_end: None,
            },
            BillingState::Subscribed {
                plan,
                current_period_end,
                ..
            } => SubscriptionStatusResponse {
                subscribed: true,
                plan: plan.as_ref().map(|p| p.name.clone()),
                current_period_end: current_period_end
                    .map(|end| end.to_rfc3339_opts(SecondsFormat::Millis, true)),
            },
        }
    }
}
