// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Credential hashing and user registration.
//!
//! Passwords are hashed with unsalted SHA-224 so hashes already in the
//! store stay verifiable. A salted password-hashing function (argon2,
//! bcrypt, scrypt) is the upgrade path once a hash-migration story exists.

use std::sync::Arc;

use sha2::{Digest, Sha224};
use tracing::info;

use crate::{
    models::user::UserRecord,
    store::{Storage, StoreError},
};

/// Hex-encoded SHA-224 digest length.
pub const HASH_HEX_LEN: usize = 56;

/// Hashes a plaintext password to lowercase hex. Deterministic, no salt.
pub fn hash_password(plaintext: &str) -> String {
    let mut h = Sha224::new();
    h.update(plaintext.as_bytes());
    hex::encode(h.finalize())
}

/// Compares two hex digests without an early exit on the first mismatch.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verifies credentials against the user store and registers new users.
pub struct CredentialService {
    store: Arc<dyn Storage>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// True when `plaintext` hashes to the stored digest.
    pub fn verify(&self, user: &UserRecord, plaintext: &str) -> bool {
        constant_time_eq(&hash_password(plaintext), &user.password_hash)
    }

    /// Looks a user up by name; `None` when unknown.
    pub async fn find_user(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.store.find_user_by_username(username).await
    }

    /// Creates a user. Fails with `StoreError::DuplicateUser` when the
    /// username is taken.
    pub async fn register(
        &self,
        username: &str,
        plaintext: &str,
    ) -> Result<UserRecord, StoreError> {
        if self.store.exists_user_by_username(username).await? {
            return Err(StoreError::DuplicateUser);
        }
        let record = self
            .store
            .save_user(username, &hash_password(plaintext))
            .await?;
        info!(username, id = record.id, "registered new user");
        Ok(record)
    }
}
