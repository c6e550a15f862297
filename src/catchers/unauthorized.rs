use crate::routes::ErrorBody;
use rocket::http::Header;
use rocket::serde::json::Json;

#[catch(401)]
pub fn unauthorized_request_credentials() -> RequestBearerAuth {
    RequestBearerAuth::new()
}

struct BearerChallengeHeader;

impl<'h> From<BearerChallengeHeader> for Header<'h> {
    fn from(_: BearerChallengeHeader) -> Self {
        Header::new("WWW-Authenticate", r#"Bearer realm="wallscape""#)
    }
}

#[derive(Responder)]
#[response(status = 401)]
pub struct RequestBearerAuth {
    inner: Json<ErrorBody>,
    challenge: BearerChallengeHeader,
}

impl RequestBearerAuth {
    fn new() -> RequestBearerAuth {
        RequestBearerAuth {
            inner: Json(ErrorBody::new("Unauthorized")),
            challenge: BearerChallengeHeader,
        }
    }
}

impl Default for RequestBearerAuth {
    fn default() -> Self {
        Self::new()
    }
}
