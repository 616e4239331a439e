// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Persistence gateway: the only component that talks SQL.
//!
//! Everything above works against the `Storage` seam so the full request
//! pipeline can be exercised with an in-memory double in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{person::Person, user::UserRecord};

pub mod gateway;

/// Gateway failures, tagged for the router's uniform responses. None of
/// these close a connection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database unavailable")]
    Unavailable(#[source] sqlx::Error),
    #[error("username is already taken")]
    DuplicateUser,
    #[error("invalid data")]
    Constraint(#[source] sqlx::Error),
    #[error("stored record is corrupted: {0}")]
    Corrupt(String),
}

/// The six gateway operations. Parameterised statements only; user input
/// never reaches a statement through string interpolation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// All persons, insertion order by `id`.
    async fn find_all_persons(&self) -> Result<Vec<Person>, StoreError>;

    /// Inserts `person` (its `id`/`creation_date` are ignored) and returns
    /// it with the store-assigned `id` and `creation_date`.
    async fn save_person(&self, person: &Person) -> Result<Person, StoreError>;

    /// True when a row was removed.
    async fn remove_person_by_id(&self, id: i32) -> Result<bool, StoreError>;

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    async fn exists_user_by_username(
        &self,
        username: &str,
    ) -> Result<bool, StoreError>;

    async fn save_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, StoreError>;
}
