use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::user::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_auth_ttl")]
    pub(crate) auth_ttl: i64,
    #[serde(default = "default_allowed_origin")]
    pub(crate) allowed_origin: String,
    #[serde(default = "default_max_candidates")]
    pub(crate) max_candidates: u64,
    pub(crate) admin_username: String,
    pub(crate) admin_email: String,
    // secrets
    pub(crate) jwt_secret: String,
    pub(crate) admin_password: String,
}

fn default_auth_ttl() -> i64 {
    86_400
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

fn default_max_candidates() -> u64 {
    10
}

impl Config {
    /// Valid lifetime of auth tokens and cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl)
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Value of the `Access-Control-Allow-Origin` header.
    pub fn allowed_origin(&self) -> &str {
        &self.allowed_origin
    }

    /// Most candidates a single election may hold.
    pub fn max_candidates(&self) -> u64 {
        self.max_candidates
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the database fairing and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match rocket.figment().extract::<Config>() {
            Ok(config) => Ok(rocket.manage(config)),
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                Err(rocket)
            }
        }
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: String,
}

fn default_db_name() -> String {
    "ovs".to_string()
}

/// A fairing that connects to MongoDB, performs any setup necessary, and
/// places both a `Client` and a `Database` into managed state.
///
/// Must be attached after [`ConfigFairing`], since seeding the admin account
/// reads the application config.
pub struct DatabaseFairing {
    connection: Option<(MongoClient, String)>,
}

impl DatabaseFairing {
    /// Connect using `db_uri` and `db_name` from the Rocket config.
    pub fn from_config() -> Self {
        Self { connection: None }
    }

    /// Use an already-connected client and the named database.
    pub fn with_client(client: MongoClient, db_name: impl Into<String>) -> Self {
        Self {
            connection: Some((client, db_name.into())),
        }
    }

    async fn connect(&self, rocket: &Rocket<Build>) -> Option<(MongoClient, Database)> {
        if let Some((client, db_name)) = &self.connection {
            return Some((client.clone(), client.database(db_name)));
        }

        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return None;
            }
        };
        info!("Loaded database config, connecting...");
        match MongoClient::with_uri_str(&config.db_uri).await {
            Ok(client) => {
                let db = client.database(&config.db_name);
                Some((client, db))
            }
            Err(e) => {
                error!("Failed to connect to database: {e}");
                None
            }
        }
    }
}

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (client, db) = match self.connect(&rocket).await {
            Some(connection) => connection,
            None => return Err(rocket),
        };

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }

        // Ensure there is at least one admin user.
        let config = match rocket.state::<Config>() {
            Some(config) => config,
            None => {
                error!("Application config must be loaded before the database");
                return Err(rocket);
            }
        };
        if let Err(e) = ensure_admin_exists(&Coll::from_db(&db), config).await {
            error!("Failed to create default admin: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        Ok(rocket.manage(client).manage(db))
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                auth_ttl: default_auth_ttl(),
                allowed_origin: "http://localhost:5173".to_string(),
                max_candidates: default_max_candidates(),
                admin_username: "admin".to_string(),
                admin_email: "admin@example.com".to_string(),
                jwt_secret: "test secret".to_string(),
                admin_password: "Admin123pass".to_string(),
            }
        }
    }
}
