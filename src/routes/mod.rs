pub(crate) mod check_subscription;
pub(crate) mod customer_portal;
pub(crate) mod health_check;
mod plans;

pub use check_subscription::*;
pub use customer_portal::*;
pub use health_check::*;
pub use plans::*;

/// JSON body of every error response.
#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
