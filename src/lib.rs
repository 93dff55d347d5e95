#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod client;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;
use config::{ConfigFairing, DatabaseFairing};
use cors::CorsFairing;
use logging::LoggerFairing;

/// Assemble the server, connecting to the database named in the Rocket config.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build(), DatabaseFairing::from_config())
}

/// Mount routes and attach fairings. The config fairing must precede the database one.
fn assemble(rocket: Rocket<Build>, database: DatabaseFairing) -> Rocket<Build> {
    rocket
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(database)
        .attach(CorsFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// A server using the given client and database, for tests.
#[cfg(test)]
pub(crate) fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    assemble(
        rocket::build(),
        DatabaseFairing::with_client(client, db_name),
    )
}

/// Connect to the test database server, if there is one.
///
/// Transactions need a replica set, so a standalone server counts as absent.
#[cfg(test)]
pub(crate) async fn db_client() -> Option<mongodb::Client> {
    use std::time::Duration;

    use log::warn;
    use mongodb::{bson::doc, options::ClientOptions, Client};

    let db_uri = match rocket::Config::figment().extract_inner::<String>("db_uri") {
        Ok(uri) => uri,
        Err(e) => {
            warn!("No `db_uri` configured: {e}");
            return None;
        }
    };
    let mut options = ClientOptions::parse(&db_uri).await.ok()?;
    options.server_selection_timeout = Some(Duration::from_secs(2));
    let client = Client::with_options(options).ok()?;

    match client
        .database("admin")
        .run_command(doc! { "hello": 1 }, None)
        .await
    {
        Ok(hello) if hello.get_str("setName").is_ok() => Some(client),
        Ok(_) => {
            warn!("MongoDB at {db_uri} is not a replica set");
            None
        }
        Err(e) => {
            warn!("MongoDB at {db_uri} is unreachable: {e}");
            None
        }
    }
}

/// A fresh database name, so concurrent tests never collide.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}
