use crate::routes::ErrorBody;
use rocket::response::status::BadRequest;
use rocket::serde::json::Json;
use rocket::Request;

/// Bodies that fail to deserialize are reported as a plain 400.
#[catch(422)]
pub fn unprocessable_entity_to_bad_request(_req: &Request) -> BadRequest<Json<ErrorBody>> {
    BadRequest(Json(ErrorBody::new("Invalid request body")))
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> BadRequest<Json<ErrorBody>> {
    BadRequest(Json(ErrorBody::new("Bad request")))
}
