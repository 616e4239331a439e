// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use roster_rs::{
    auth::{CredentialService, HASH_HEX_LEN, hash_password},
    store::StoreError,
};

use crate::support::MemoryStorage;

#[test]
fn hashes_are_deterministic_lowercase_hex() {
    let h = hash_password("pw");
    assert_eq!(h, hash_password("pw"));
    assert_eq!(h.len(), HASH_HEX_LEN);
    assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_ne!(h, hash_password("pW"));
}

#[tokio::test]
async fn register_then_verify() -> Result<()> {
    let auth = CredentialService::new(Arc::new(MemoryStorage::new()));

    let user = auth.register("alice", "pw").await?;
    assert_eq!(user.username, "alice");
    assert_eq!(user.password_hash, hash_password("pw"));

    let found = auth.find_user("alice").await?.expect("registered");
    assert!(auth.verify(&found, "pw"));
    assert!(!auth.verify(&found, "wrong"));
    assert!(auth.find_user("bob").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_username_is_rejected() -> Result<()> {
    let auth = CredentialService::new(Arc::new(MemoryStorage::new()));
    auth.register("alice", "pw").await?;

    let err = auth.register("alice", "other").await.expect_err("duplicate");
    assert!(matches!(err, StoreError::DuplicateUser));
    Ok(())
}
