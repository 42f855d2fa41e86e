// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Principal resolution: idempotent first login, uniqueness under races,
//! and the login -> token -> verify scenario.

use chrono::{Duration, Utc};
use goal_tracker::config::Config;
use goal_tracker::db::{Database, MemoryDb};
use goal_tracker::services::{PrincipalResolver, TokenService};
use std::collections::HashSet;
use std::sync::Arc;

mod common;
use common::github_profile;

fn resolver() -> (PrincipalResolver, Arc<MemoryDb>) {
    let db = Arc::new(MemoryDb::new());
    (PrincipalResolver::new(db.clone() as Arc<dyn Database>), db)
}

#[tokio::test]
async fn test_resolve_twice_creates_once() {
    let (resolver, db) = resolver();
    let profile = github_profile("7", "carol");

    let first = resolver.resolve(&profile).await.unwrap();
    let second = resolver.resolve(&profile).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(db.principal_count(), 1);
}

#[tokio::test]
async fn test_distinct_subjects_get_distinct_principals() {
    let (resolver, db) = resolver();

    let a = resolver.resolve(&github_profile("1", "same-name")).await.unwrap();
    let b = resolver.resolve(&github_profile("2", "same-name")).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(db.principal_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_logins_produce_one_principal() {
    let (resolver, db) = resolver();
    let resolver = Arc::new(resolver);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(&github_profile("99", "dave")).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().id);
    }

    assert_eq!(ids.len(), 1, "every racer must see the same principal");
    assert_eq!(db.principal_count(), 1);
}

#[tokio::test]
async fn test_alice_end_to_end() {
    let (resolver, db) = resolver();
    let tokens = TokenService::new(&Config::test_default().jwt_signing_key).unwrap();

    // Provider hides the email
    let created_at = Utc::now() - Duration::minutes(5);
    let alice = resolver
        .resolve_at(&github_profile("42", "alice"), created_at)
        .await
        .unwrap();
    assert_eq!(alice.email, "alice@github.local");
    assert_eq!(alice.provider, "github");
    assert_eq!(alice.provider_subject_id, "42");

    let issued = tokens.issue(&alice).unwrap();
    assert_eq!(tokens.verify(&issued.token).unwrap(), alice.id);

    // Renamed on GitHub, logs in again
    let later = Utc::now();
    let again = resolver
        .resolve_at(&github_profile("42", "alice-renamed"), later)
        .await
        .unwrap();

    assert_eq!(again.id, alice.id);
    assert_eq!(again.username, "alice-renamed");
    assert_eq!(again.last_login, later);
    assert_eq!(again.created_at, created_at);
    assert_eq!(db.principal_count(), 1);

    let stored = db.get_principal(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.last_login, later);
    assert_eq!(stored.email, "alice@github.local");
}

#[tokio::test]
async fn test_provider_email_is_used_when_present() {
    let (resolver, _) = resolver();
    let mut profile = github_profile("5", "erin");
    profile.email = Some("erin@example.com".to_string());

    let principal = resolver.resolve(&profile).await.unwrap();
    assert_eq!(principal.email, "erin@example.com");
}
