// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::Result;
use roster_rs::{
    collection::Roster,
    commands::{Command, CommandError, Registry, Session},
    models::{message::Request, user::UserRecord},
    store::Storage,
};

use crate::support::{MemoryStorage, draft_person};

fn session(id: i32, name: &str) -> Session {
    Session {
        user: UserRecord {
            id,
            username: name.to_string(),
            password_hash: String::new(),
        },
    }
}

async fn registry_with_roster() -> Result<(Registry, Arc<Roster>)> {
    let store = Arc::new(MemoryStorage::new()) as Arc<dyn Storage>;
    let roster = Arc::new(Roster::load(store).await?);
    Ok((Registry::with_commands(roster.clone()), roster))
}

fn request(command: &str) -> Request {
    Request { command: command.to_string(), ..Request::default() }
}

#[tokio::test]
async fn add_stamps_owner_and_ignores_client_id() -> Result<()> {
    let (registry, roster) = registry_with_roster().await?;
    let alice = session(1, "alice");

    let mut person = draft_person("A", 170, 70);
    person.id = 999;
    person.owner_id = 42;
    let req = request("add").with_persons(vec![person]);

    let cmd = registry.resolve("add").expect("registered");
    let resp = cmd.execute(&req, &alice).await?;
    assert_eq!(resp.message, "Person added.");

    let snapshot = roster.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, 1);
    assert_eq!(snapshot[0].owner_id, 1);
    assert!(snapshot[0].creation_date.is_some());
    Ok(())
}

#[tokio::test]
async fn remove_by_id_is_owner_gated() -> Result<()> {
    let (registry, roster) = registry_with_roster().await?;
    let alice = session(1, "alice");
    let bob = session(2, "bob");

    let add = registry.resolve("add").expect("registered");
    add.execute(
        &request("add").with_persons(vec![draft_person("A", 170, 70)]),
        &alice,
    )
    .await?;

    let remove = registry.resolve("remove_by_id").expect("registered");
    let req = request("remove_by_id").with_args(vec!["1".to_string()]);

    let err = remove.execute(&req, &bob).await.expect_err("not the owner");
    assert!(matches!(err, CommandError::NotOwner));
    assert_eq!(roster.len().await, 1);

    let resp = remove.execute(&req, &alice).await?;
    assert_eq!(resp.message, "Person removed.");
    assert!(roster.is_empty().await);

    let resp = remove.execute(&req, &alice).await?;
    assert_eq!(resp.message, "No person with id 1.");
    Ok(())
}

#[tokio::test]
async fn remove_by_id_wants_an_integer() -> Result<()> {
    let (registry, _roster) = registry_with_roster().await?;
    let remove = registry.resolve("remove_by_id").expect("registered");

    let err = remove
        .execute(&request("remove_by_id"), &session(1, "alice"))
        .await
        .expect_err("missing argument");
    assert!(matches!(err, CommandError::BadArgument(_)));
    Ok(())
}

#[tokio::test]
async fn remove_first_reports_empty_collection() -> Result<()> {
    let (registry, _roster) = registry_with_roster().await?;
    let cmd = registry.resolve("remove_first").expect("registered");

    let resp = cmd.execute(&request("remove_first"), &session(1, "a")).await?;
    assert_eq!(resp.message, "The collection is empty.");
    Ok(())
}

#[tokio::test]
async fn remove_greater_uses_strict_bmi_comparison() -> Result<()> {
    let (registry, roster) = registry_with_roster().await?;
    let alice = session(1, "alice");

    let add = registry.resolve("add").expect("registered");
    // BMIs: p1 = 0.0020, p2 = 0.0036, p3 = 0.0024 (weight / height²).
    for (name, h, w) in [("P1", 200, 80), ("P2", 150, 80), ("P3", 170, 70)] {
        add.execute(
            &request("add").with_persons(vec![draft_person(name, h, w)]),
            &alice,
        )
        .await?;
    }

    let reference = draft_person("ref", 170, 70);
    let cmd = registry.resolve("remove_greater").expect("registered");
    let resp = cmd
        .execute(&request("remove_greater").with_persons(vec![reference]), &alice)
        .await?;
    assert_eq!(resp.message, "Removed 1 person(s).");

    let names: Vec<_> =
        roster.snapshot().await.into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["P1", "P3"]);
    Ok(())
}

#[tokio::test]
async fn clear_only_removes_the_callers_persons() -> Result<()> {
    let (registry, roster) = registry_with_roster().await?;
    let alice = session(1, "alice");
    let bob = session(2, "bob");

    let add = registry.resolve("add").expect("registered");
    add.execute(&request("add").with_persons(vec![draft_person("a", 170, 70)]), &alice)
        .await?;
    add.execute(&request("add").with_persons(vec![draft_person("b", 180, 90)]), &bob)
        .await?;

    let clear = registry.resolve("clear").expect("registered");
    let resp = clear.execute(&request("clear"), &alice).await?;
    assert_eq!(resp.message, "Removed 1 of your person(s).");

    let snapshot = roster.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].owner_id, 2);
    Ok(())
}

#[tokio::test]
async fn queries_over_the_snapshot() -> Result<()> {
    let (registry, _roster) = registry_with_roster().await?;
    let alice = session(1, "alice");

    let add = registry.resolve("add").expect("registered");
    let mut green = draft_person("g", 170, 70);
    green.hair_color = "GREEN".parse().expect("tag");
    let mut white = draft_person("w", 180, 90);
    white.hair_color = "WHITE".parse().expect("tag");
    for p in [green, white] {
        add.execute(&request("add").with_persons(vec![p]), &alice).await?;
    }

    let show = registry.resolve("show").expect("registered");
    let resp = show.execute(&request("show"), &alice).await?;
    assert_eq!(resp.persons.len(), 2);

    let head = registry.resolve("head").expect("registered");
    let resp = head.execute(&request("head"), &alice).await?;
    assert_eq!(resp.persons.len(), 1);
    assert_eq!(resp.persons[0].name, "g");

    let sum = registry.resolve("sum_of_height").expect("registered");
    let resp = sum.execute(&request("sum_of_height"), &alice).await?;
    assert_eq!(resp.message, "Sum of height: 350");

    let print = registry
        .resolve("print_field_descending_hair_color")
        .expect("registered");
    let resp = print
        .execute(&request("print_field_descending_hair_color"), &alice)
        .await?;
    assert_eq!(resp.message, "WHITE\nGREEN\n");
    Ok(())
}

#[tokio::test]
async fn save_is_a_noop_and_exit_acknowledges() -> Result<()> {
    let (registry, _roster) = registry_with_roster().await?;
    let alice = session(1, "alice");

    let save = registry.resolve("save").expect("registered");
    let resp = save.execute(&request("save"), &alice).await?;
    assert!(resp.message.contains("write-through"));

    let exit = registry.resolve("exit").expect("registered");
    let resp = exit.execute(&request("exit"), &alice).await?;
    assert_eq!(resp.message, "Goodbye.");
    Ok(())
}

#[tokio::test]
async fn execute_script_returns_file_contents() -> Result<()> {
    let (registry, _roster) = registry_with_roster().await?;
    let alice = session(1, "alice");

    let dir = std::env::temp_dir().join("roster-rs-script-test");
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join("script.txt");
    tokio::fs::write(&path, "show\nexit\n").await?;

    let cmd = registry.resolve("execute_script").expect("registered");
    let req = request("execute_script")
        .with_args(vec![path.to_string_lossy().into_owned()]);
    let resp = cmd.execute(&req, &alice).await?;
    assert_eq!(resp.script, "show\nexit\n");
    assert!(resp.message.is_empty());

    let err = cmd
        .execute(
            &request("execute_script").with_args(vec!["/no/such/file".to_string()]),
            &alice,
        )
        .await
        .expect_err("missing file");
    assert!(matches!(err, CommandError::Script(_)));
    Ok(())
}

#[tokio::test]
async fn registry_lookup_is_case_insensitive() -> Result<()> {
    let (registry, _roster) = registry_with_roster().await?;
    assert!(registry.resolve("SHOW").is_some());
    assert!(registry.resolve("Show").is_some());
    assert!(registry.resolve("floop").is_none());

    let help = registry.help_text();
    assert!(help.contains("remove_greater"));
    assert!(help.contains("help"));
    Ok(())
}
