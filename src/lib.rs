#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;

pub mod auth_provider;
pub mod billing;
pub mod catchers;
pub mod configuration;
pub mod domain;
pub mod email;
pub mod guards;
pub mod image_generation;
pub mod models;
pub mod port_saver;
pub mod routes;
pub mod schema;
pub mod startup;
pub mod stripe;
pub mod telemetry;
