use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use std::convert::Infallible;

/// The `Origin` and `Referer` headers of the incoming request, if any.
pub struct RequestOrigin {
    pub origin: Option<String>,
    pub referer: Option<String>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestOrigin {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let header = |name: &str| {
            request
                .headers()
                .get_one(name)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Outcome::Success(RequestOrigin {
            origin: header("Origin"),
            referer: header("Referer"),
        })
    }
}
