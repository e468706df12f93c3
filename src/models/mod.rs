mod subscription_plan;
mod user_subscription;

pub use subscription_plan::*;
pub use user_subscription::*;
