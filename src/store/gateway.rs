// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{
    Row,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow},
};
use tracing::{debug, info};

use crate::{
    cfg::config::DbConfig,
    models::{person::{Coordinates, Location, Person}, user::UserRecord},
    store::{Storage, StoreError},
};

const SCHEMA_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id serial PRIMARY KEY,
        username text UNIQUE NOT NULL,
        password text NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS persons (
        id serial PRIMARY KEY,
        owner_id bigint NOT NULL REFERENCES users(id),
        name text NOT NULL,
        cord_x int NOT NULL,
        cord_y int NOT NULL,
        creation_date timestamp DEFAULT now(),
        height int NOT NULL,
        weight int NOT NULL,
        color text NOT NULL,
        country text NOT NULL,
        location_x float NOT NULL,
        location_y float NULL,
        location_name text NULL
    )",
];

/// PostgreSQL-backed gateway. The pool opens connections lazily and
/// replaces dead ones at the point of use, so a database restart does not
/// require a server restart.
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Builds the pool without touching the network. Call `ping` to verify
    /// the driver is reachable before serving traffic.
    pub fn connect_lazy(cfg: &DbConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .database(&cfg.name)
            .username(&cfg.user)
            .password(&cfg.password);

        let pool = PgPoolOptions::new()
            .max_connections(cfg.pool_size)
            .acquire_timeout(cfg.acquire_timeout)
            .connect_lazy_with(options);

        Self { pool }
    }

    /// One round-trip to prove the driver is alive.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(StoreError::Unavailable)
    }

    /// Creates the `users`/`persons` tables when absent.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for ddl in SCHEMA_DDL {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(StoreError::Unavailable)?;
        }
        info!("database schema ensured");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn person_from_row(row: &PgRow) -> Result<Person, StoreError> {
    let hair: String = row.try_get("color").map_err(StoreError::Unavailable)?;
    let country: String = row.try_get("country").map_err(StoreError::Unavailable)?;
    Ok(Person {
        id: row.try_get("id").map_err(StoreError::Unavailable)?,
        owner_id: row.try_get("owner_id").map_err(StoreError::Unavailable)?,
        name: row.try_get("name").map_err(StoreError::Unavailable)?,
        coordinates: Coordinates {
            x: row.try_get("cord_x").map_err(StoreError::Unavailable)?,
            y: row.try_get("cord_y").map_err(StoreError::Unavailable)?,
        },
        creation_date: row
            .try_get::<Option<NaiveDateTime>, _>("creation_date")
            .map_err(StoreError::Unavailable)?,
        height: row.try_get("height").map_err(StoreError::Unavailable)?,
        weight: row.try_get("weight").map_err(StoreError::Unavailable)?,
        hair_color: hair
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("hair color {hair:?}")))?,
        nationality: country
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("nationality {country:?}")))?,
        location: Location {
            x: row.try_get("location_x").map_err(StoreError::Unavailable)?,
            y: row.try_get("location_y").map_err(StoreError::Unavailable)?,
            name: row.try_get("location_name").map_err(StoreError::Unavailable)?,
        },
    })
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    Ok(UserRecord {
        id: row.try_get("id").map_err(StoreError::Unavailable)?,
        username: row.try_get("username").map_err(StoreError::Unavailable)?,
        password_hash: row.try_get("password").map_err(StoreError::Unavailable)?,
    })
}

/// `23505` is unique_violation; the rest of class 23 is some other
/// integrity constraint.
fn constraint_or_unavailable(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db)
            if db.code().is_some_and(|c| c.starts_with("23")) =>
        {
            StoreError::Constraint(e)
        },
        _ => StoreError::Unavailable(e),
    }
}

fn duplicate_or_unavailable(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::DuplicateUser
        },
        _ => StoreError::Unavailable(e),
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn find_all_persons(&self) -> Result<Vec<Person>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, cord_x, cord_y, creation_date, height, \
             weight, color, country, location_x, location_y, location_name \
             FROM persons ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;

        rows.iter().map(person_from_row).collect()
    }

    async fn save_person(&self, person: &Person) -> Result<Person, StoreError> {
        let row = sqlx::query(
            "INSERT INTO persons (owner_id, name, cord_x, cord_y, height, \
             weight, color, country, location_x, location_y, location_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING id, creation_date",
        )
        .bind(person.owner_id)
        .bind(&person.name)
        .bind(person.coordinates.x)
        .bind(person.coordinates.y)
        .bind(person.height)
        .bind(person.weight)
        .bind(person.hair_color.as_str())
        .bind(person.nationality.as_str())
        .bind(person.location.x)
        .bind(person.location.y)
        .bind(person.location.name.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(constraint_or_unavailable)?;

        let mut saved = person.clone();
        saved.id = row.try_get("id").map_err(StoreError::Unavailable)?;
        saved.creation_date = row
            .try_get::<Option<NaiveDateTime>, _>("creation_date")
            .map_err(StoreError::Unavailable)?;
        debug!(id = saved.id, "person persisted");
        Ok(saved)
    }

    async fn remove_person_by_id(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM persons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn exists_user_by_username(
        &self,
        username: &str,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?;
        Ok(row.is_some())
    }

    async fn save_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError> {
        let row = sqlx::query(
            "INSERT INTO users (username, password) VALUES ($1, $2) \
             RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_or_unavailable)?;

        Ok(UserRecord {
            id: row.try_get("id").map_err(StoreError::Unavailable)?,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }
}
