// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The authoritative in-memory view of the persons table.
//!
//! Every mutation goes to the store first and is mirrored in memory only
//! after the store acknowledged it ("write-through"). Readers get cheap
//! consistent snapshots; mutations are serialised by the write half of the
//! lock. There is deliberately no `clear` primitive: bulk removal always
//! goes through `remove_where` so each row deletion is acknowledged
//! individually.

use std::{collections::HashSet, sync::Arc};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    models::person::Person,
    store::{Storage, StoreError},
};

pub struct Roster {
    store: Arc<dyn Storage>,
    inner: RwLock<Vec<Person>>,
}

impl Roster {
    /// Loads the full set from the store, insertion order by `id`.
    pub async fn load(store: Arc<dyn Storage>) -> Result<Self, StoreError> {
        let persons = store.find_all_persons().await?;
        info!(count = persons.len(), "collection loaded from store");
        Ok(Self { store, inner: RwLock::new(persons) })
    }

    /// Copy of the ordered sequence.
    pub async fn snapshot(&self) -> Vec<Person> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Appends a person. The store assigns `id` and `creation_date`; the
    /// element lands in memory only after a successful insert.
    pub async fn add(&self, person: &Person) -> Result<Person, StoreError> {
        let mut guard = self.inner.write().await;
        let saved = self.store.save_person(person).await?;
        guard.push(saved.clone());
        Ok(saved)
    }

    /// Removes the element at `index`; `None` when out of range.
    pub async fn remove_at(&self, index: usize) -> Result<Option<Person>, StoreError> {
        let mut guard = self.inner.write().await;
        let Some(target) = guard.get(index) else {
            return Ok(None);
        };
        let id = target.id;
        if !self.store.remove_person_by_id(id).await? {
            warn!(id, "row was already absent from the store");
        }
        Ok(Some(guard.remove(index)))
    }

    /// Removes the person with `id`; false when no such element.
    pub async fn remove_by_id(&self, id: i32) -> Result<bool, StoreError> {
        let mut guard = self.inner.write().await;
        let Some(index) = guard.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        if !self.store.remove_person_by_id(id).await? {
            warn!(id, "row was already absent from the store");
        }
        guard.remove(index);
        Ok(true)
    }

    /// Removes every person matching `pred`.
    ///
    /// Victims are computed from a stable snapshot and deleted from the
    /// store in ascending-id order; memory only mirrors the deletions that
    /// the store acknowledged, so a mid-batch store failure leaves the
    /// collection consistent with the table.
    pub async fn remove_where<F>(&self, pred: F) -> Result<Vec<Person>, StoreError>
    where F: Fn(&Person) -> bool {
        let mut guard = self.inner.write().await;

        let mut victims: Vec<Person> =
            guard.iter().filter(|p| pred(p)).cloned().collect();
        victims.sort_by_key(|p| p.id);

        let mut removed = Vec::with_capacity(victims.len());
        let mut failure = None;
        for victim in victims {
            match self.store.remove_person_by_id(victim.id).await {
                Ok(existed) => {
                    if !existed {
                        warn!(id = victim.id, "row was already absent from the store");
                    }
                    removed.push(victim);
                },
                Err(e) => {
                    failure = Some(e);
                    break;
                },
            }
        }

        let gone: HashSet<i32> = removed.iter().map(|p| p.id).collect();
        guard.retain(|p| !gone.contains(&p.id));

        match failure {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}
