// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// A registered user as stored in the `users` table.
///
/// `password_hash` is the lowercase-hex SHA-224 of the plaintext password;
/// the plaintext itself is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
}

/// Plaintext credentials accompanying a request. They only ever travel
/// inside a framed payload over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}
