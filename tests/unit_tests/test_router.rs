// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use roster_rs::{
    auth::CredentialService,
    collection::Roster,
    commands::Registry,
    models::{message::Request, user::Credentials},
    router::Router,
    store::Storage,
};

use crate::support::{MemoryStorage, draft_person};

async fn router() -> Result<(Router, Arc<Roster>)> {
    let store = Arc::new(MemoryStorage::new()) as Arc<dyn Storage>;
    let roster = Arc::new(Roster::load(store.clone()).await?);
    let registry = Registry::with_commands(roster.clone());
    let auth = CredentialService::new(store);
    Ok((Router::new(registry, auth), roster))
}

fn creds(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn empty_command_yields_empty_response() -> Result<()> {
    let (router, _) = router().await?;
    let resp = router.route(&Request::default()).await;
    assert!(resp.message.is_empty());
    assert!(resp.persons.is_empty());
    assert!(resp.script.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_and_wrong_credentials_fail_uniformly() -> Result<()> {
    let (router, roster) = router().await?;
    router.route(&Request::new("register", creds("alice", "pw"))).await;

    // Unknown user, wrong password, absent credentials: one message.
    for request in [
        Request::new("show", creds("mallory", "pw")),
        Request::new("show", creds("alice", "wrong")),
        Request { command: "show".to_string(), ..Request::default() },
    ] {
        let resp = router.route(&request).await;
        assert_eq!(resp.message, "Authorization failed.");
    }

    // A rejected add leaves the collection untouched.
    let add = Request::new("add", creds("alice", "wrong"))
        .with_persons(vec![draft_person("A", 170, 70)]);
    router.route(&add).await;
    assert!(roster.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn register_login_and_duplicate() -> Result<()> {
    let (router, _) = router().await?;

    let resp = router.route(&Request::new("register", creds("alice", "pw"))).await;
    assert_eq!(resp.message, "Registered user 'alice'.");

    let resp = router.route(&Request::new("register", creds("alice", "pw"))).await;
    assert_eq!(resp.message, "username is already taken");

    let resp = router.route(&Request::new("login", creds("alice", "pw"))).await;
    assert!(resp.message.starts_with("Authorization successful"));

    let resp = router.route(&Request::new("login", creds("alice", "nope"))).await;
    assert_eq!(resp.message, "Authorization failed.");
    Ok(())
}

#[tokio::test]
async fn unknown_command_hints_at_help() -> Result<()> {
    let (router, _) = router().await?;
    router.route(&Request::new("register", creds("alice", "pw"))).await;

    let resp = router.route(&Request::new("floop", creds("alice", "pw"))).await;
    assert_eq!(resp.message, "command 'floop' not found, type 'help' for help");
    Ok(())
}

#[tokio::test]
async fn arity_shortfall_is_rejected_before_execution() -> Result<()> {
    let (router, roster) = router().await?;
    router.route(&Request::new("register", creds("alice", "pw"))).await;

    let resp = router.route(&Request::new("add", creds("alice", "pw"))).await;
    assert_eq!(resp.message, "insufficient payload");
    assert!(roster.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn command_names_match_case_insensitively() -> Result<()> {
    let (router, _) = router().await?;
    router.route(&Request::new("register", creds("alice", "pw"))).await;

    let add = Request::new("ADD", creds("alice", "pw"))
        .with_persons(vec![draft_person("A", 170, 70)]);
    let resp = router.route(&add).await;
    assert_eq!(resp.message, "Person added.");
    Ok(())
}

#[tokio::test]
async fn help_lists_the_command_set() -> Result<()> {
    let (router, _) = router().await?;
    router.route(&Request::new("register", creds("alice", "pw"))).await;

    let resp = router.route(&Request::new("help", creds("alice", "pw"))).await;
    for name in [
        "add",
        "remove_by_id",
        "remove_first",
        "remove_greater",
        "clear",
        "show",
        "head",
        "sum_of_height",
        "print_field_descending_hair_color",
        "save",
        "execute_script",
        "exit",
    ] {
        assert!(resp.message.contains(name), "help is missing {name}");
    }
    Ok(())
}

#[tokio::test]
async fn command_failures_become_responses() -> Result<()> {
    let (router, _) = router().await?;
    router.route(&Request::new("register", creds("alice", "pw"))).await;

    let req = Request::new("remove_by_id", creds("alice", "pw"))
        .with_args(vec!["not-a-number".to_string()]);
    let resp = router.route(&req).await;
    assert_eq!(resp.message, "remove_by_id expects one integer argument");
    Ok(())
}
