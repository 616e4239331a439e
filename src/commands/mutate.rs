// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Commands that change the collection. Every one of them is owner-gated:
//! a caller can only remove records they created.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    collection::Roster,
    commands::{Command, CommandError, Descriptor, Session},
    models::message::{Request, Response},
};

static ADD: Descriptor = Descriptor {
    name: "add",
    arg_names: &[],
    help: "append a new person to the collection",
    required_persons: 1,
};

pub struct Add {
    roster: Arc<Roster>,
}

impl Add {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for Add {
    fn descriptor(&self) -> &'static Descriptor {
        &ADD
    }

    async fn execute(
        &self,
        request: &Request,
        session: &Session,
    ) -> Result<Response, CommandError> {
        // Client-supplied id/owner/creation date are ignored; the store
        // assigns them.
        let mut person = request.persons[0].clone();
        person.id = 0;
        person.owner_id = session.owner_id();
        person.creation_date = None;

        let saved = self.roster.add(&person).await?;
        debug!(id = saved.id, owner = saved.owner_id, "person added");
        Ok(Response::text("Person added."))
    }
}

static REMOVE_BY_ID: Descriptor = Descriptor {
    name: "remove_by_id",
    arg_names: &["id"],
    help: "remove your person with the given id",
    required_persons: 0,
};

pub struct RemoveById {
    roster: Arc<Roster>,
}

impl RemoveById {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for RemoveById {
    fn descriptor(&self) -> &'static Descriptor {
        &REMOVE_BY_ID
    }

    async fn execute(
        &self,
        request: &Request,
        session: &Session,
    ) -> Result<Response, CommandError> {
        let id: i32 = request
            .args
            .first()
            .and_then(|a| a.parse().ok())
            .ok_or_else(|| {
                CommandError::BadArgument(
                    "remove_by_id expects one integer argument".to_string(),
                )
            })?;

        let snapshot = self.roster.snapshot().await;
        let Some(target) = snapshot.iter().find(|p| p.id == id) else {
            return Ok(Response::text(format!("No person with id {id}.")));
        };
        if target.owner_id != session.owner_id() {
            return Err(CommandError::NotOwner);
        }

        // Ids are never reused, so the id-keyed removal cannot hit a
        // different record than the one just checked.
        if self.roster.remove_by_id(id).await? {
            Ok(Response::text("Person removed."))
        } else {
            Ok(Response::text(format!("No person with id {id}.")))
        }
    }
}

static REMOVE_FIRST: Descriptor = Descriptor {
    name: "remove_first",
    arg_names: &[],
    help: "remove the first person in the collection",
    required_persons: 0,
};

pub struct RemoveFirst {
    roster: Arc<Roster>,
}

impl RemoveFirst {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for RemoveFirst {
    fn descriptor(&self) -> &'static Descriptor {
        &REMOVE_FIRST
    }

    async fn execute(
        &self,
        _request: &Request,
        session: &Session,
    ) -> Result<Response, CommandError> {
        let snapshot = self.roster.snapshot().await;
        let Some(head) = snapshot.first() else {
            return Ok(Response::text("The collection is empty."));
        };
        if head.owner_id != session.owner_id() {
            return Err(CommandError::NotOwner);
        }

        if self.roster.remove_by_id(head.id).await? {
            Ok(Response::text("Person removed."))
        } else {
            Ok(Response::text("The collection is empty."))
        }
    }
}

static REMOVE_GREATER: Descriptor = Descriptor {
    name: "remove_greater",
    arg_names: &[],
    help: "remove your persons with a BMI greater than the given person",
    required_persons: 1,
};

pub struct RemoveGreater {
    roster: Arc<Roster>,
}

impl RemoveGreater {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for RemoveGreater {
    fn descriptor(&self) -> &'static Descriptor {
        &REMOVE_GREATER
    }

    async fn execute(
        &self,
        request: &Request,
        session: &Session,
    ) -> Result<Response, CommandError> {
        let reference = &request.persons[0];
        let threshold = reference.bmi();
        let owner = session.owner_id();

        let removed = self
            .roster
            .remove_where(|p| p.owner_id == owner && p.bmi() > threshold)
            .await?;
        Ok(Response::text(format!("Removed {} person(s).", removed.len())))
    }
}

static CLEAR: Descriptor = Descriptor {
    name: "clear",
    arg_names: &[],
    help: "remove every person you own",
    required_persons: 0,
};

pub struct Clear {
    roster: Arc<Roster>,
}

impl Clear {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for Clear {
    fn descriptor(&self) -> &'static Descriptor {
        &CLEAR
    }

    async fn execute(
        &self,
        _request: &Request,
        session: &Session,
    ) -> Result<Response, CommandError> {
        let owner = session.owner_id();
        let removed = self.roster.remove_where(|p| p.owner_id == owner).await?;
        Ok(Response::text(format!(
            "Removed {} of your person(s).",
            removed.len()
        )))
    }
}
