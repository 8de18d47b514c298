//! Integration tests for [`CompositionEngine`] against the in-memory
//! SQLite store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use curia_core::{
  Error,
  assignment::{AssignmentPatch, NewAssignment},
  catalog::PositionKind,
  member::{Member, MemberStatus, NewMember, PositionCache},
  store::{MemberDirectory as _, PositionStore as _},
  term::{NewTerm, TermPatch},
};
use curia_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::CompositionEngine;

type Engine = CompositionEngine<SqliteStore, SqliteStore, SqliteStore>;

async fn engine() -> (Engine, Arc<SqliteStore>) {
  let store = Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  );
  (CompositionEngine::from_shared(store.clone()), store)
}

fn term_input(name: &str, active: bool) -> NewTerm {
  let now = Utc::now();
  NewTerm {
    name:        name.into(),
    start_date:  now - Duration::days(30),
    end_date:    now + Duration::days(700),
    is_active:   active,
    description: String::new(),
  }
}

fn member_input(name: &str) -> NewMember {
  NewMember {
    full_name: name.into(),
    email:     format!("{}@example.com", name.to_lowercase()),
    status:    MemberStatus::Active,
  }
}

async fn add_member(store: &SqliteStore, name: &str) -> Member {
  store.insert_member(member_input(name)).await.unwrap()
}

// ─── Assignment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_creates_active_seat_and_refreshes_cache() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let assignment = engine
    .assign_position(
      term.term_id,
      member.member_id,
      PositionKind::President,
      None,
    )
    .await
    .unwrap();

  assert!(assignment.is_active);
  assert!(assignment.end_date.is_none());
  assert_eq!(assignment.kind, PositionKind::President);

  let cached = store.member(member.member_id).await.unwrap().unwrap();
  assert_eq!(
    cached.council,
    PositionCache::seated(PositionKind::President, assignment.assignment_id)
  );
}

#[tokio::test]
async fn assign_rejects_ordinary_membership() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let err = engine
    .assign_position(
      term.term_id,
      member.member_id,
      PositionKind::NonCouncil,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotCouncilSeat(PositionKind::NonCouncil)));
}

#[tokio::test]
async fn assign_requires_existing_term_and_member() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let err = engine
    .assign_position(
      Uuid::new_v4(),
      member.member_id,
      PositionKind::President,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TermNotFound(_)));

  let err = engine
    .assign_position(term.term_id, Uuid::new_v4(), PositionKind::President, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MemberNotFound(_)));
}

#[tokio::test]
async fn seventh_board_member_is_rejected() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();

  for i in 0..6 {
    let member = add_member(&store, &format!("Member{i}")).await;
    engine
      .assign_position(
        term.term_id,
        member.member_id,
        PositionKind::BoardMember,
        None,
      )
      .await
      .unwrap();
  }

  let overflow = add_member(&store, "Overflow").await;
  let err = engine
    .assign_position(
      term.term_id,
      overflow.member_id,
      PositionKind::BoardMember,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::CapacityExceeded { kind: PositionKind::BoardMember, capacity: 6 }
  ));

  let available = engine.available_positions(term.term_id).await.unwrap();
  assert_eq!(available[&PositionKind::BoardMember], 0);
}

#[tokio::test]
async fn one_active_seat_per_member_per_term() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  engine
    .assign_position(
      term.term_id,
      member.member_id,
      PositionKind::President,
      None,
    )
    .await
    .unwrap();

  // same member, same term, different seat
  let err = engine
    .assign_position(
      term.term_id,
      member.member_id,
      PositionKind::VicePresident,
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateActiveAssignment { .. }));
}

#[tokio::test]
async fn same_member_may_sit_in_two_terms() {
  let (engine, store) = engine().await;
  let old = engine.create_term(term_input("Old", false)).await.unwrap();
  let new = engine.create_term(term_input("New", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  engine
    .assign_position(old.term_id, member.member_id, PositionKind::Secretary, None)
    .await
    .unwrap();
  engine
    .assign_position(new.term_id, member.member_id, PositionKind::President, None)
    .await
    .unwrap();
}

#[tokio::test]
async fn concurrent_assignments_never_exceed_capacity() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();

  let mut members = Vec::new();
  for i in 0..10 {
    members.push(add_member(&store, &format!("Member{i}")).await);
  }

  let mut handles = Vec::new();
  for member in &members {
    let engine = engine.clone();
    let term_id = term.term_id;
    let member_id = member.member_id;
    handles.push(tokio::spawn(async move {
      engine
        .assign_position(term_id, member_id, PositionKind::BoardMember, None)
        .await
    }));
  }

  let mut seated = 0;
  let mut turned_away = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => seated += 1,
      Err(Error::CapacityExceeded {
        kind: PositionKind::BoardMember,
        ..
      }) => turned_away += 1,
      Err(other) => panic!("unexpected error: {other}"),
    }
  }

  assert_eq!(seated, 6);
  assert_eq!(turned_away, 4);
  assert_eq!(
    store
      .count_active(term.term_id, PositionKind::BoardMember)
      .await
      .unwrap(),
    6
  );
}

// ─── Removal ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn remove_vacates_seat_and_resets_cache() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let assignment = engine
    .assign_position(term.term_id, member.member_id, PositionKind::Treasurer, None)
    .await
    .unwrap();

  let closed = engine
    .remove_position(assignment.assignment_id)
    .await
    .unwrap()
    .unwrap();
  assert!(!closed.is_active);
  assert!(closed.end_date.is_some());

  let comp = engine.composition(term.term_id).await.unwrap();
  assert!(comp.treasurer.is_none());
  assert_eq!(comp.total_positions, 0);

  let cached = store.member(member.member_id).await.unwrap().unwrap();
  assert_eq!(cached.council, PositionCache::non_council());
}

#[tokio::test]
async fn remove_twice_is_a_noop() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let assignment = engine
    .assign_position(term.term_id, member.member_id, PositionKind::Secretary, None)
    .await
    .unwrap();

  let first = engine
    .remove_position(assignment.assignment_id)
    .await
    .unwrap();
  assert!(first.is_some());
  let end_date = first.unwrap().end_date;

  let second = engine
    .remove_position(assignment.assignment_id)
    .await
    .unwrap();
  assert!(second.is_none());

  // nothing changed on the second call
  let stored = engine.position(assignment.assignment_id).await.unwrap();
  assert!(!stored.is_active);
  assert_eq!(stored.end_date, end_date);
}

#[tokio::test]
async fn remove_unknown_position_errors() {
  let (engine, _store) = engine().await;
  let err = engine.remove_position(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::PositionNotFound(_)));
}

#[tokio::test]
async fn removed_seat_can_be_filled_again() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let alice = add_member(&store, "Alice").await;
  let bob = add_member(&store, "Bob").await;

  let first = engine
    .assign_position(term.term_id, alice.member_id, PositionKind::President, None)
    .await
    .unwrap();
  engine.remove_position(first.assignment_id).await.unwrap();

  // a fresh record is created; the old one stays closed
  let second = engine
    .assign_position(term.term_id, bob.member_id, PositionKind::President, None)
    .await
    .unwrap();
  assert_ne!(first.assignment_id, second.assignment_id);

  let history = engine.member_history(alice.member_id).await.unwrap();
  assert_eq!(history.len(), 1);
  assert!(!history[0].is_active);
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_position_extends_tenure() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let assignment = engine
    .assign_position(term.term_id, member.member_id, PositionKind::Secretary, None)
    .await
    .unwrap();

  let new_end = Utc::now() + Duration::days(365);
  let updated = engine
    .update_position(assignment.assignment_id, AssignmentPatch {
      end_date: Some(new_end),
      ..Default::default()
    })
    .await
    .unwrap();

  assert!(updated.is_active);
  assert_eq!(updated.end_date.unwrap().timestamp(), new_end.timestamp());
}

#[tokio::test]
async fn update_position_kind_change_revalidates_capacity() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let alice = add_member(&store, "Alice").await;
  let bob = add_member(&store, "Bob").await;

  engine
    .assign_position(term.term_id, alice.member_id, PositionKind::President, None)
    .await
    .unwrap();
  let board = engine
    .assign_position(term.term_id, bob.member_id, PositionKind::BoardMember, None)
    .await
    .unwrap();

  let err = engine
    .update_position(board.assignment_id, AssignmentPatch {
      kind: Some(PositionKind::President),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::CapacityExceeded { kind: PositionKind::President, .. }
  ));
}

#[tokio::test]
async fn update_position_kind_change_rewrites_cache() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let assignment = engine
    .assign_position(
      term.term_id,
      member.member_id,
      PositionKind::BoardMember,
      None,
    )
    .await
    .unwrap();

  let updated = engine
    .update_position(assignment.assignment_id, AssignmentPatch {
      kind: Some(PositionKind::Treasurer),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.kind, PositionKind::Treasurer);

  let cached = store.member(member.member_id).await.unwrap().unwrap();
  assert_eq!(cached.council.kind, PositionKind::Treasurer);
}

// ─── Composition & availability ──────────────────────────────────────────────

#[tokio::test]
async fn composition_seats_every_role() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();

  let singles = [
    PositionKind::President,
    PositionKind::VicePresident,
    PositionKind::Treasurer,
    PositionKind::Secretary,
  ];
  for (i, kind) in singles.into_iter().enumerate() {
    let member = add_member(&store, &format!("Officer{i}")).await;
    engine
      .assign_position(term.term_id, member.member_id, kind, None)
      .await
      .unwrap();
  }
  for i in 0..6 {
    let member = add_member(&store, &format!("Board{i}")).await;
    engine
      .assign_position(
        term.term_id,
        member.member_id,
        PositionKind::BoardMember,
        None,
      )
      .await
      .unwrap();
  }

  let comp = engine.composition(term.term_id).await.unwrap();
  assert!(comp.president.is_some());
  assert!(comp.vice_president.is_some());
  assert!(comp.treasurer.is_some());
  assert!(comp.secretary.is_some());
  assert_eq!(comp.board_members.len(), 6);
  assert_eq!(comp.total_positions, 10);
  assert!(comp.vacancies().is_empty());
}

#[tokio::test]
async fn availability_tracks_assignments() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();

  let fresh = engine.available_positions(term.term_id).await.unwrap();
  assert_eq!(fresh[&PositionKind::President], 1);
  assert_eq!(fresh[&PositionKind::BoardMember], 6);
  assert_eq!(fresh.len(), 5);

  let member = add_member(&store, "Alice").await;
  engine
    .assign_position(term.term_id, member.member_id, PositionKind::President, None)
    .await
    .unwrap();

  assert!(
    !engine
      .validate_position_availability(term.term_id, PositionKind::President)
      .await
      .unwrap()
  );
  assert!(
    engine
      .validate_position_availability(term.term_id, PositionKind::Secretary)
      .await
      .unwrap()
  );
  assert!(
    engine
      .validate_position_availability(term.term_id, PositionKind::NonCouncil)
      .await
      .unwrap()
  );
}

#[tokio::test]
async fn detail_snapshot_skips_unresolved_members() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();

  let alice = add_member(&store, "Alice").await;
  let bob = add_member(&store, "Bob").await;
  engine
    .assign_position(term.term_id, alice.member_id, PositionKind::President, None)
    .await
    .unwrap();
  engine
    .assign_position(
      term.term_id,
      bob.member_id,
      PositionKind::BoardMember,
      None,
    )
    .await
    .unwrap();

  // a seat whose member was purged from the directory
  store
    .insert_assignment(NewAssignment {
      member_id:  Uuid::new_v4(),
      term_id:    term.term_id,
      kind:       PositionKind::Treasurer,
      start_date: Utc::now(),
    })
    .await
    .unwrap();

  let detail = engine
    .composition_with_details(term.term_id)
    .await
    .unwrap();
  assert_eq!(detail.term_name, "Council");
  assert!(detail.president.is_some());
  assert_eq!(detail.board_members.len(), 1);
  assert!(detail.treasurer.is_none());
  assert_eq!(detail.total_positions, 2);
}

#[tokio::test]
async fn detail_snapshot_keeps_history_but_prefers_active_occupants() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let alice = add_member(&store, "Alice").await;
  let bob = add_member(&store, "Bob").await;

  let first = engine
    .assign_position(term.term_id, alice.member_id, PositionKind::President, None)
    .await
    .unwrap();
  engine.remove_position(first.assignment_id).await.unwrap();
  engine
    .assign_position(term.term_id, bob.member_id, PositionKind::President, None)
    .await
    .unwrap();

  let detail = engine
    .composition_with_details(term.term_id)
    .await
    .unwrap();
  let president = detail.president.unwrap();
  assert_eq!(president.member.member_id, bob.member_id);
  assert!(president.assignment.is_active);
  assert_eq!(detail.total_positions, 2);
}

// ─── Member history & cache reconciliation ───────────────────────────────────

#[tokio::test]
async fn member_history_spans_terms_newest_first() {
  let (engine, store) = engine().await;
  let old = engine.create_term(term_input("Old", false)).await.unwrap();
  let new = engine.create_term(term_input("New", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let past = engine
    .assign_position(
      old.term_id,
      member.member_id,
      PositionKind::BoardMember,
      Some(Utc::now() - Duration::days(900)),
    )
    .await
    .unwrap();
  engine.remove_position(past.assignment_id).await.unwrap();

  let current = engine
    .assign_position(new.term_id, member.member_id, PositionKind::President, None)
    .await
    .unwrap();

  let history = engine.member_history(member.member_id).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].assignment_id, current.assignment_id);
  assert_eq!(history[1].assignment_id, past.assignment_id);
}

#[tokio::test]
async fn reconcile_repairs_a_corrupted_cache() {
  let (engine, store) = engine().await;
  let term = engine.create_term(term_input("Council", true)).await.unwrap();
  let member = add_member(&store, "Alice").await;

  let assignment = engine
    .assign_position(term.term_id, member.member_id, PositionKind::Treasurer, None)
    .await
    .unwrap();

  // simulate drift from a partial failure
  store
    .set_position_cache(member.member_id, PositionCache::non_council())
    .await
    .unwrap();

  let repaired = engine
    .reconcile_member_cache(member.member_id)
    .await
    .unwrap();
  assert_eq!(
    repaired.council,
    PositionCache::seated(PositionKind::Treasurer, assignment.assignment_id)
  );
}

#[tokio::test]
async fn reconcile_without_assignments_clears_the_cache() {
  let (engine, store) = engine().await;
  let member = add_member(&store, "Alice").await;

  store
    .set_position_cache(
      member.member_id,
      PositionCache::seated(PositionKind::President, Uuid::new_v4()),
    )
    .await
    .unwrap();

  let repaired = engine
    .reconcile_member_cache(member.member_id)
    .await
    .unwrap();
  assert_eq!(repaired.council, PositionCache::non_council());
}

// ─── Term lifecycle ──────────────────────────────────────────────────────────

#[tokio::test]
async fn creating_an_active_term_displaces_the_previous_one() {
  let (engine, _store) = engine().await;
  let first = engine.create_term(term_input("First", true)).await.unwrap();
  let second = engine.create_term(term_input("Second", true)).await.unwrap();

  let all = engine.list_terms().await.unwrap();
  let active: Vec<_> = all.iter().filter(|t| t.is_active).collect();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].term_id, second.term_id);

  assert!(!engine.term(first.term_id).await.unwrap().is_active);
}

#[tokio::test]
async fn activate_term_is_exclusive() {
  let (engine, _store) = engine().await;
  let first = engine.create_term(term_input("First", true)).await.unwrap();
  let second = engine.create_term(term_input("Second", false)).await.unwrap();

  engine.activate_term(second.term_id).await.unwrap();

  assert_eq!(
    engine.active_term().await.unwrap().term_id,
    second.term_id
  );
  assert!(!engine.term(first.term_id).await.unwrap().is_active);

  let err = engine.activate_term(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::TermNotFound(_)));
}

#[tokio::test]
async fn update_term_patch_can_activate_exclusively() {
  let (engine, _store) = engine().await;
  engine.create_term(term_input("First", true)).await.unwrap();
  let second = engine.create_term(term_input("Second", false)).await.unwrap();

  let updated = engine
    .update_term(second.term_id, TermPatch {
      is_active: Some(true),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(updated.is_active);

  let all = engine.list_terms().await.unwrap();
  assert_eq!(all.iter().filter(|t| t.is_active).count(), 1);
}

#[tokio::test]
async fn deactivate_term_leaves_no_active_term() {
  let (engine, _store) = engine().await;
  let term = engine.create_term(term_input("Only", true)).await.unwrap();

  engine.deactivate_term(term.term_id).await.unwrap();

  let err = engine.active_term().await.unwrap_err();
  assert!(matches!(err, Error::NoActiveTerm));
}

#[tokio::test]
async fn create_term_validates_input() {
  let (engine, _store) = engine().await;

  let err = engine
    .create_term(NewTerm {
      name: "  ".into(),
      ..term_input("x", false)
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidTerm(_)));

  let now = Utc::now();
  let err = engine
    .create_term(NewTerm {
      name:        "Backwards".into(),
      start_date:  now,
      end_date:    now - Duration::days(1),
      is_active:   false,
      description: String::new(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidTerm(_)));
}
