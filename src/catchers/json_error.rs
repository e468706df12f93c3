use crate::routes::ErrorBody;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::Request;

/// Renders statuses that no handler produced (unknown routes, unparseable
/// requests, unavailable database) in the same JSON shape as handler errors.
#[catch(default)]
pub fn json_error(status: Status, request: &Request) -> (Status, Json<ErrorBody>) {
    tracing::warn!(
        status = status.code,
        method = %request.method(),
        uri = %request.uri(),
        "Request failed before reaching a handler"
    );
    let error = match status.code {
        400 | 422 => "Bad request".to_string(),
        401 => "Unauthorized".to_string(),
        404 => "Not found".to_string(),
        503 => "Service unavailable".to_string(),
        code => format!("Request failed with status {}", code),
    };
    (
        status,
        Json(ErrorBody {
            error,
            success: Some(false),
        }),
    )
}
