// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::models::{person::Person, user::Credentials};

/// One client command as carried by a frame payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Request {
    /// Command name; matched case-insensitively by the router.
    pub command: String,
    /// Positional textual arguments.
    pub args: Vec<String>,
    /// Structured payloads; the router checks the command's arity before
    /// dispatch.
    pub persons: Vec<Person>,
    pub credentials: Option<Credentials>,
}

impl Request {
    pub fn new(command: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            persons: Vec::new(),
            credentials: Some(credentials),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_persons(mut self, persons: Vec<Person>) -> Self {
        self.persons = persons;
        self
    }
}

/// The server's answer to a single request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    /// Human-readable outcome; may be empty.
    pub message: String,
    /// Records returned by query commands, in collection order.
    pub persons: Vec<Person>,
    /// Non-empty only when the server wants the client to feed the contents
    /// back one line per request (`execute_script`).
    pub script: String,
}

impl Response {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn persons(persons: Vec<Person>) -> Self {
        Self { persons, ..Self::default() }
    }

    pub fn script(script: impl Into<String>) -> Self {
        Self { script: script.into(), ..Self::default() }
    }
}
