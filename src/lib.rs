#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub mod catchers;
pub mod configuration;
pub mod cors;
pub mod domain;
pub mod guards;
pub mod identity;
pub mod models;
pub mod payments;
pub mod port_saver;
pub mod routes;
pub mod schema;
pub mod startup;
pub mod telemetry;
