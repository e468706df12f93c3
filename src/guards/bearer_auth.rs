use crate::domain::BearerToken;
use anyhow::{anyhow, Context};
use rocket::http::Status;
use rocket::outcome::Outcome::{Failure, Success};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;

pub struct BearerAuth {
    pub token: BearerToken,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerAuth {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match from_request_result(request) {
            Ok(auth) => Success(auth),
            Err(e) => Failure((Status::Unauthorized, e)),
        }
    }
}

fn from_request_result(request: &Request) -> Result<BearerAuth, anyhow::Error> {
    let header_value = request
        .headers()
        .get_one("Authorization")
        .context("Missing authorization header.")?;

    let token = BearerToken::parse(header_value).map_err(|e| anyhow!(e))?;

    Ok(BearerAuth { token })
}
