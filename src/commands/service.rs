// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Commands with no collection effect: protocol-compatibility no-ops and
//! the script feeder.

use async_trait::async_trait;

use crate::{
    commands::{Command, CommandError, Descriptor, Session},
    models::message::{Request, Response},
};

static SAVE: Descriptor = Descriptor {
    name: "save",
    arg_names: &[],
    help: "no-op; every mutation is persisted immediately",
    required_persons: 0,
};

/// Kept for protocol compatibility. Persistence is write-through, so
/// there is nothing to flush.
pub struct Save;

#[async_trait]
impl Command for Save {
    fn descriptor(&self) -> &'static Descriptor {
        &SAVE
    }

    async fn execute(
        &self,
        _request: &Request,
        _session: &Session,
    ) -> Result<Response, CommandError> {
        Ok(Response::text("Nothing to do: persistence is write-through."))
    }
}

static EXECUTE_SCRIPT: Descriptor = Descriptor {
    name: "execute_script",
    arg_names: &["path"],
    help: "send back the file contents for the client to replay line by line",
    required_persons: 0,
};

pub struct ExecuteScript;

#[async_trait]
impl Command for ExecuteScript {
    fn descriptor(&self) -> &'static Descriptor {
        &EXECUTE_SCRIPT
    }

    async fn execute(
        &self,
        request: &Request,
        _session: &Session,
    ) -> Result<Response, CommandError> {
        let path = request.args.first().ok_or_else(|| {
            CommandError::BadArgument(
                "execute_script expects a file path argument".to_string(),
            )
        })?;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(CommandError::Script)?;
        Ok(Response::script(contents))
    }
}

static EXIT: Descriptor = Descriptor {
    name: "exit",
    arg_names: &[],
    help: "terminate the client session",
    required_persons: 0,
};

pub struct Exit;

#[async_trait]
impl Command for Exit {
    fn descriptor(&self) -> &'static Descriptor {
        &EXIT
    }

    async fn execute(
        &self,
        _request: &Request,
        _session: &Session,
    ) -> Result<Response, CommandError> {
        Ok(Response::text("Goodbye."))
    }
}
