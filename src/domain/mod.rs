mod billing_state;
mod bearer_token;
mod portal_return_url;
mod subscription_status;
mod user_email;

pub use bearer_token::BearerToken;
pub use billing_state::{BillingState, PlanRef, SubscriptionStatusResponse};
pub use portal_return_url::PortalReturnUrl;
pub use subscription_status::SubscriptionStatus;
pub use user_email::UserEmail;
