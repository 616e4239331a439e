// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Request routing: credential gate, command resolution, uniform error
//! responses. Every failure past the frame codec becomes a `Response`;
//! the router never tears a connection down.

use tracing::{debug, warn};

use crate::{
    auth::CredentialService,
    commands::{Registry, Session},
    models::message::{Request, Response},
    store::StoreError,
};

const AUTH_FAILED: &str = "Authorization failed.";
const STORE_DOWN: &str = "database unavailable";

pub struct Router {
    registry: Registry,
    auth: CredentialService,
}

impl Router {
    pub fn new(registry: Registry, auth: CredentialService) -> Self {
        Self { registry, auth }
    }

    /// Resolves one request to one response.
    pub async fn route(&self, request: &Request) -> Response {
        if request.command.is_empty() {
            return Response::empty();
        }
        let name = request.command.to_ascii_lowercase();

        // Account verbs run before credential resolution: a user cannot be
        // authenticated before existing.
        match name.as_str() {
            "register" => return self.register(request).await,
            "login" => return self.login(request).await,
            _ => {},
        }

        let session = match self.authenticate(request).await {
            Ok(Some(session)) => session,
            // Uniform on purpose: never reveal whether the username or the
            // password was wrong.
            Ok(None) => return Response::text(AUTH_FAILED),
            Err(e) => {
                warn!(error = %e, "credential lookup failed");
                return Response::text(STORE_DOWN);
            },
        };

        if name == "help" {
            return Response::text(self.registry.help_text());
        }

        let Some(command) = self.registry.resolve(&name) else {
            return Response::text(format!(
                "command '{}' not found, type 'help' for help",
                request.command
            ));
        };

        if request.persons.len() < command.descriptor().required_persons {
            return Response::text("insufficient payload");
        }

        match command.execute(request, &session).await {
            Ok(response) => response,
            Err(e) => {
                debug!(command = %name, error = %e, "command failed");
                Response::text(e.to_string())
            },
        }
    }

    async fn authenticate(
        &self,
        request: &Request,
    ) -> Result<Option<Session>, StoreError> {
        let Some(creds) = request.credentials.as_ref() else {
            return Ok(None);
        };
        let Some(user) = self.auth.find_user(&creds.username).await? else {
            return Ok(None);
        };
        if !self.auth.verify(&user, &creds.password) {
            return Ok(None);
        }
        Ok(Some(Session { user }))
    }

    async fn register(&self, request: &Request) -> Response {
        let Some(creds) = request.credentials.as_ref() else {
            return Response::text("register needs a username and a password");
        };
        if creds.username.is_empty() {
            return Response::text("username must not be empty");
        }
        match self.auth.register(&creds.username, &creds.password).await {
            Ok(user) => {
                Response::text(format!("Registered user '{}'.", user.username))
            },
            Err(StoreError::DuplicateUser) => {
                Response::text(StoreError::DuplicateUser.to_string())
            },
            Err(e) => {
                warn!(error = %e, "registration failed");
                Response::text(STORE_DOWN)
            },
        }
    }

    async fn login(&self, request: &Request) -> Response {
        match self.authenticate(request).await {
            Ok(Some(session)) => Response::text(format!(
                "Authorization successful, welcome '{}'.",
                session.user.username
            )),
            Ok(None) => Response::text(AUTH_FAILED),
            Err(e) => {
                warn!(error = %e, "credential lookup failed");
                Response::text(STORE_DOWN)
            },
        }
    }
}
