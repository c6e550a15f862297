use crate::routes::ErrorBody;
use rocket::response::status::NotFound;
use rocket::serde::json::Json;
use rocket::Request;

#[catch(404)]
pub fn route_not_found(req: &Request) -> NotFound<Json<ErrorBody>> {
    NotFound(Json(
        ErrorBody::new("Not found").with_details(format!("No route for {}", req.uri())),
    ))
}
