mod authenticated_user;
mod bearer_auth;
mod request_origin;

use anyhow::anyhow;
pub use authenticated_user::*;
pub use bearer_auth::*;
pub use request_origin::*;
use rocket::http::Status;

trait OrStatus<T> {
    fn or_status(self, status: Status, context: &'static str)
        -> Result<T, (Status, anyhow::Error)>;
}

impl<T> OrStatus<T> for Option<T> {
    fn or_status(
        self,
        status: Status,
        context: &'static str,
    ) -> Result<T, (Status, anyhow::Error)> {
        self.ok_or_else(|| (status, anyhow!(context)))
    }
}
