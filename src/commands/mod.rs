// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The closed set of client commands and their registry.
//!
//! A command owns the collection handle it mutates; the router owns auth
//! and arity so `execute` can assume a resolved session and enough
//! structured payloads.

use std::{collections::BTreeMap, fmt::Write, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    collection::Roster,
    models::{
        message::{Request, Response},
        user::UserRecord,
    },
    store::StoreError,
};

mod mutate;
mod query;
mod service;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserRecord,
}

impl Session {
    /// The caller's id as stored in `persons.owner_id`.
    pub fn owner_id(&self) -> i64 {
        i64::from(self.user.id)
    }
}

/// Command failure. The router renders `Display` straight into the
/// response message; the connection stays open.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("not owner")]
    NotOwner,
    #[error("{0}")]
    BadArgument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot read script file: {0}")]
    Script(#[source] std::io::Error),
}

/// Static shape of one command: its registry key, the argument names used
/// for help text, and how many structured payloads the router must attach
/// before invoking.
#[derive(Debug)]
pub struct Descriptor {
    pub name: &'static str,
    pub arg_names: &'static [&'static str],
    pub help: &'static str,
    pub required_persons: usize,
}

#[async_trait]
pub trait Command: Send + Sync {
    fn descriptor(&self) -> &'static Descriptor;

    async fn execute(
        &self,
        request: &Request,
        session: &Session,
    ) -> Result<Response, CommandError>;
}

/// Named command descriptors, keyed by lowercase name.
pub struct Registry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl Registry {
    /// Builds the full closed command set against one collection handle.
    pub fn with_commands(roster: Arc<Roster>) -> Self {
        let commands: Vec<Box<dyn Command>> = vec![
            Box::new(mutate::Add::new(roster.clone())),
            Box::new(mutate::RemoveById::new(roster.clone())),
            Box::new(mutate::RemoveFirst::new(roster.clone())),
            Box::new(mutate::RemoveGreater::new(roster.clone())),
            Box::new(mutate::Clear::new(roster.clone())),
            Box::new(query::Show::new(roster.clone())),
            Box::new(query::Head::new(roster.clone())),
            Box::new(query::SumOfHeight::new(roster.clone())),
            Box::new(query::PrintFieldDescendingHairColor::new(roster)),
            Box::new(service::Save),
            Box::new(service::ExecuteScript),
            Box::new(service::Exit),
        ];

        let mut map = BTreeMap::new();
        for cmd in commands {
            map.insert(cmd.descriptor().name, cmd);
        }
        Self { commands: map }
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<&dyn Command> {
        let key = name.to_ascii_lowercase();
        self.commands.get(key.as_str()).map(|cmd| cmd.as_ref())
    }

    /// Renders the `help` listing from the descriptors.
    pub fn help_text(&self) -> String {
        let mut out = String::from("Available commands:\n");
        for cmd in self.commands.values() {
            let d = cmd.descriptor();
            let _ = write!(&mut out, "  {}", d.name);
            for arg in d.arg_names {
                let _ = write!(&mut out, " <{arg}>");
            }
            for _ in 0..d.required_persons {
                out.push_str(" {person}");
            }
            let _ = writeln!(&mut out, " : {}", d.help);
        }
        out.push_str("  help : list available commands\n");
        out.push_str(
            "  register / login : account verbs, credentials only (not part of \
             the command set)\n",
        );
        out
    }
}
