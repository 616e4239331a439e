// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Read-only commands over the collection snapshot.

use std::{fmt::Write, sync::Arc};

use async_trait::async_trait;

use crate::{
    collection::Roster,
    commands::{Command, CommandError, Descriptor, Session},
    models::message::{Request, Response},
};

static SHOW: Descriptor = Descriptor {
    name: "show",
    arg_names: &[],
    help: "list every person in the collection",
    required_persons: 0,
};

pub struct Show {
    roster: Arc<Roster>,
}

impl Show {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for Show {
    fn descriptor(&self) -> &'static Descriptor {
        &SHOW
    }

    async fn execute(
        &self,
        _request: &Request,
        _session: &Session,
    ) -> Result<Response, CommandError> {
        Ok(Response::persons(self.roster.snapshot().await))
    }
}

static HEAD: Descriptor = Descriptor {
    name: "head",
    arg_names: &[],
    help: "show the first person in the collection",
    required_persons: 0,
};

pub struct Head {
    roster: Arc<Roster>,
}

impl Head {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for Head {
    fn descriptor(&self) -> &'static Descriptor {
        &HEAD
    }

    async fn execute(
        &self,
        _request: &Request,
        _session: &Session,
    ) -> Result<Response, CommandError> {
        let snapshot = self.roster.snapshot().await;
        match snapshot.into_iter().next() {
            Some(first) => Ok(Response::persons(vec![first])),
            None => Ok(Response::text("The collection is empty.")),
        }
    }
}

static SUM_OF_HEIGHT: Descriptor = Descriptor {
    name: "sum_of_height",
    arg_names: &[],
    help: "print the sum of the height field over the collection",
    required_persons: 0,
};

pub struct SumOfHeight {
    roster: Arc<Roster>,
}

impl SumOfHeight {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for SumOfHeight {
    fn descriptor(&self) -> &'static Descriptor {
        &SUM_OF_HEIGHT
    }

    async fn execute(
        &self,
        _request: &Request,
        _session: &Session,
    ) -> Result<Response, CommandError> {
        let sum: i64 = self
            .roster
            .snapshot()
            .await
            .iter()
            .map(|p| i64::from(p.height))
            .sum();
        Ok(Response::text(format!("Sum of height: {sum}")))
    }
}

static PRINT_HAIR_COLORS: Descriptor = Descriptor {
    name: "print_field_descending_hair_color",
    arg_names: &[],
    help: "print every hair color value, descending by declaration order",
    required_persons: 0,
};

pub struct PrintFieldDescendingHairColor {
    roster: Arc<Roster>,
}

impl PrintFieldDescendingHairColor {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl Command for PrintFieldDescendingHairColor {
    fn descriptor(&self) -> &'static Descriptor {
        &PRINT_HAIR_COLORS
    }

    async fn execute(
        &self,
        _request: &Request,
        _session: &Session,
    ) -> Result<Response, CommandError> {
        let mut colors: Vec<_> = self
            .roster
            .snapshot()
            .await
            .iter()
            .map(|p| p.hair_color)
            .collect();
        colors.sort_by(|a, b| b.cmp(a));

        let mut out = String::new();
        for color in colors {
            let _ = writeln!(&mut out, "{color}");
        }
        Ok(Response::text(out))
    }
}
