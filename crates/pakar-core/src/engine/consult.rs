//! The consultation orchestrator.
//!
//! ```text
//! Validating ──▶ Scoring ──▶ Resolved ──▶ Persisting ──▶ Done
//!     │              └─────▶ NoMatch ──────────────────▶ Done
//!     └──▶ Rejected
//! ```
//!
//! Exactly one consultation record is written per resolved consultation and
//! none otherwise. Store faults abort the consultation; the engine never
//! retries them.
//!
//! [`evaluate`] covers everything up to `Resolved`/`NoMatch` and only reads.
//! [`persist`] is the single write. Callers that bound a consultation in time
//! bound `evaluate` and let `persist` finish.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  consultation::{ConsultationRecord, NewConsultationRecord},
  engine::{ResolutionPolicy, RuleMatch, RuleSnapshot, Selection, SelectionError},
  store::ConsultationStore,
};

/// Where a consultation is in its lifecycle; recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
  Validating,
  Scoring,
  Resolved,
  NoMatch,
  Persisting,
  Done,
  Rejected,
}

/// The outcome of a consultation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Consultation {
  /// At least one rule matched; `record` has been persisted.
  Resolved {
    record:  ConsultationRecord,
    /// The contributing rules, in result order. Aligned with
    /// `record.recommendations`.
    matches: Vec<RuleMatch>,
  },
  /// No rule matched. Nothing was persisted.
  NoMatch,
}

/// Why a consultation did not run to completion.
#[derive(Debug, Error)]
pub enum ConsultError<E> {
  #[error("invalid input: {0}")]
  InvalidInput(#[from] SelectionError),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("repository fault: {0}")]
  Repository(#[source] E),
}

/// A consultation that has been validated and scored but not yet persisted.
///
/// Produced by [`evaluate`] and turned into a [`Consultation`] by [`persist`].
/// Nothing has been written while a value of this type exists, so dropping
/// it abandons the consultation cleanly.
#[derive(Debug, Clone)]
pub enum Evaluation {
  Matched {
    subject_id: Uuid,
    selection:  Selection,
    matches:    Vec<RuleMatch>,
  },
  NoMatch,
}

/// Run one consultation for `subject_id` with the selected characteristic
/// ids: [`evaluate`] followed by [`persist`].
pub async fn consult<S>(
  store: &S,
  policy: &ResolutionPolicy,
  subject_id: Uuid,
  selected: Vec<Uuid>,
) -> Result<Consultation, ConsultError<S::Error>>
where
  S: ConsultationStore,
{
  let evaluation = evaluate(store, policy, subject_id, selected).await?;
  persist(store, evaluation).await
}

/// Validate the selection and score it against the subject's rule base.
///
/// The selection is validated before the store is touched. Characteristic ids
/// that do not exist are accepted; they simply never match. Only reads happen
/// here, so a caller may abandon the future at any point.
pub async fn evaluate<S>(
  store: &S,
  policy: &ResolutionPolicy,
  subject_id: Uuid,
  selected: Vec<Uuid>,
) -> Result<Evaluation, ConsultError<S::Error>>
where
  S: ConsultationStore,
{
  tracing::debug!(%subject_id, phase = %Phase::Validating, "consultation started");

  let selection = Selection::new(selected).inspect_err(|e| {
    tracing::debug!(%subject_id, phase = %Phase::Rejected, error = %e, "selection rejected");
  })?;

  let subject = store
    .find_subject(subject_id)
    .await
    .map_err(ConsultError::Repository)?
    .ok_or_else(|| {
      tracing::debug!(%subject_id, phase = %Phase::Rejected, "subject not found");
      ConsultError::SubjectNotFound(subject_id)
    })?;

  let scope = policy.scope(&subject);
  let entries = store
    .list_rules(scope)
    .await
    .map_err(ConsultError::Repository)?;
  let snapshot = RuleSnapshot::new(scope, entries);
  tracing::debug!(
    %subject_id,
    phase = %Phase::Scoring,
    rules = snapshot.len(),
    selected = selection.len(),
    "scoring rule base",
  );

  let matches = policy.resolve(&snapshot, &selection);
  if matches.is_empty() {
    tracing::info!(%subject_id, phase = %Phase::NoMatch, "no rule matched");
    return Ok(Evaluation::NoMatch);
  }
  tracing::debug!(%subject_id, phase = %Phase::Resolved, matched = matches.len());
  Ok(Evaluation::Matched { subject_id, selection, matches })
}

/// Write the record for a matched evaluation. A `NoMatch` writes nothing.
///
/// Once started the write should be driven to completion: dropping this
/// future after the store has accepted the record leaves the record in place.
pub async fn persist<S>(
  store: &S,
  evaluation: Evaluation,
) -> Result<Consultation, ConsultError<S::Error>>
where
  S: ConsultationStore,
{
  let Evaluation::Matched { subject_id, selection, matches } = evaluation else {
    return Ok(Consultation::NoMatch);
  };

  tracing::debug!(%subject_id, phase = %Phase::Persisting);
  let record = store
    .record_consultation(NewConsultationRecord {
      subject_id,
      selected: selection.into_ordered(),
      recommendations: matches.iter().map(|m| m.recommendation_id).collect(),
    })
    .await
    .map_err(ConsultError::Repository)?;

  tracing::info!(
    %subject_id,
    record_id = %record.record_id,
    phase = %Phase::Done,
    recommendations = record.recommendations.len(),
    "consultation resolved",
  );
  Ok(Consultation::Resolved { record, matches })
}

#[cfg(test)]
mod tests {
  use std::{
    collections::BTreeSet,
    num::NonZeroUsize,
    sync::{
      Mutex,
      atomic::{AtomicBool, AtomicUsize, Ordering},
    },
  };

  use chrono::{Duration, Utc};

  use super::*;
  use crate::{
    rule::{Rule, RuleEntry, RuleScope},
    status::Status,
    store::StoreError,
    subject::Subject,
  };

  // ─── In-memory store ───────────────────────────────────────────────────────

  #[derive(Debug, Error)]
  #[error("store unavailable")]
  struct Unavailable;

  impl StoreError for Unavailable {
    fn domain(&self) -> Option<&crate::Error> { None }
  }

  #[derive(Default)]
  struct MemoryStore {
    subjects:   Vec<Subject>,
    rules:      Vec<RuleEntry>,
    records:    Mutex<Vec<ConsultationRecord>>,
    reads:      AtomicUsize,
    fail_read:  AtomicBool,
    fail_write: AtomicBool,
    /// Delay applied to `list_rules`, i.e. during scoring.
    stall:      Option<std::time::Duration>,
  }

  impl MemoryStore {
    fn subject(&mut self, category_id: Uuid) -> Uuid {
      let subject = Subject {
        subject_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        category_id,
        name: "subject".into(),
        created_at: Utc::now(),
      };
      let id = subject.subject_id;
      self.subjects.push(subject);
      id
    }

    fn rule(&mut self, category_id: Uuid, antecedent: &[Uuid], consequent: Uuid) {
      let created_at = Utc::now() + Duration::seconds(self.rules.len() as i64);
      self.rules.push(RuleEntry {
        rule:              Rule {
          rule_id: Uuid::new_v4(),
          code: format!("R{}", self.rules.len()),
          antecedent: antecedent.iter().copied().collect::<BTreeSet<_>>(),
          consequent,
          category_id: Some(category_id),
          created_at,
          updated_at: created_at,
        },
        consequent_status: Status::Active,
      });
    }

    fn record_count(&self) -> usize { self.records.lock().unwrap().len() }
  }

  impl ConsultationStore for MemoryStore {
    type Error = Unavailable;

    async fn find_subject(&self, id: Uuid) -> Result<Option<Subject>, Unavailable> {
      self.reads.fetch_add(1, Ordering::SeqCst);
      if self.fail_read.load(Ordering::SeqCst) {
        return Err(Unavailable);
      }
      Ok(self.subjects.iter().find(|s| s.subject_id == id).cloned())
    }

    async fn list_rules(&self, scope: RuleScope) -> Result<Vec<RuleEntry>, Unavailable> {
      self.reads.fetch_add(1, Ordering::SeqCst);
      if let Some(stall) = self.stall {
        tokio::time::sleep(stall).await;
      }
      Ok(self.rules.iter().filter(|e| scope.admits(&e.rule)).cloned().collect())
    }

    async fn record_consultation(
      &self,
      input: NewConsultationRecord,
    ) -> Result<ConsultationRecord, Unavailable> {
      if self.fail_write.load(Ordering::SeqCst) {
        return Err(Unavailable);
      }
      let record = ConsultationRecord {
        record_id:       Uuid::new_v4(),
        subject_id:      input.subject_id,
        selected:        input.selected,
        recommendations: input.recommendations,
        created_at:      Utc::now(),
      };
      self.records.lock().unwrap().push(record.clone());
      Ok(record)
    }
  }

  fn ids<const N: usize>() -> [Uuid; N] { std::array::from_fn(|_| Uuid::new_v4()) }

  fn quorum() -> ResolutionPolicy {
    ResolutionPolicy::quorum_ranked(NonZeroUsize::new(3).unwrap())
  }

  /// R1{if:[A,B,C], then:X}, R2{if:[A], then:Y}
  fn example() -> (MemoryStore, Uuid, [Uuid; 5]) {
    let [a, b, c, x, y] = ids();
    let category = Uuid::new_v4();
    let mut store = MemoryStore::default();
    let subject = store.subject(category);
    store.rule(category, &[a, b, c], x);
    store.rule(category, &[a], y);
    (store, subject, [a, b, c, x, y])
  }

  // ─── Tests ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn best_match_persists_one_record() {
    let (store, subject, [a, b, _, x, _]) = example();

    let outcome = consult(&store, &ResolutionPolicy::BestMatch, subject, vec![b, a])
      .await
      .unwrap();

    let Consultation::Resolved { record, matches } = outcome else {
      panic!("expected a resolved consultation");
    };
    assert_eq!(record.recommendations, vec![x]);
    assert_eq!(record.selected, vec![b, a]);
    assert_eq!(record.subject_id, subject);
    assert_eq!(matches.len(), 1);
    assert_eq!(store.record_count(), 1);
  }

  #[tokio::test]
  async fn quorum_returns_ranked_list() {
    let (store, subject, [a, b, _, x, y]) = example();

    let outcome = consult(&store, &quorum(), subject, vec![a, b]).await.unwrap();

    let Consultation::Resolved { record, .. } = outcome else {
      panic!("expected a resolved consultation");
    };
    assert_eq!(record.recommendations, vec![x, y]);
    assert_eq!(store.record_count(), 1);
  }

  #[tokio::test]
  async fn quorum_only_considers_subject_category() {
    let [a, x] = ids();
    let mut store = MemoryStore::default();
    let subject = store.subject(Uuid::new_v4());
    store.rule(Uuid::new_v4(), &[a], x);

    let outcome = consult(&store, &quorum(), subject, vec![a]).await.unwrap();
    assert_eq!(outcome, Consultation::NoMatch);

    let outcome = consult(&store, &ResolutionPolicy::BestMatch, subject, vec![a])
      .await
      .unwrap();
    assert!(matches!(outcome, Consultation::Resolved { .. }));
  }

  #[tokio::test]
  async fn no_match_persists_nothing() {
    let (store, subject, _) = example();
    let [z] = ids();

    for policy in [ResolutionPolicy::BestMatch, quorum()] {
      let outcome = consult(&store, &policy, subject, vec![z]).await.unwrap();
      assert_eq!(outcome, Consultation::NoMatch);
    }
    assert_eq!(store.record_count(), 0);
  }

  #[tokio::test]
  async fn empty_selection_never_reaches_the_store() {
    let (store, subject, _) = example();

    let err = consult(&store, &ResolutionPolicy::BestMatch, subject, vec![])
      .await
      .unwrap_err();

    assert!(matches!(err, ConsultError::InvalidInput(SelectionError::Empty)));
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    assert_eq!(store.record_count(), 0);
  }

  #[tokio::test]
  async fn duplicate_selection_is_invalid() {
    let (store, subject, [a, ..]) = example();
    let err = consult(&store, &ResolutionPolicy::BestMatch, subject, vec![a, a])
      .await
      .unwrap_err();
    assert!(matches!(err, ConsultError::InvalidInput(SelectionError::Duplicate(id)) if id == a));
  }

  #[tokio::test]
  async fn unknown_subject_is_reported() {
    let (store, _, [a, ..]) = example();
    let missing = Uuid::new_v4();
    let err = consult(&store, &ResolutionPolicy::BestMatch, missing, vec![a])
      .await
      .unwrap_err();
    assert!(matches!(err, ConsultError::SubjectNotFound(id) if id == missing));
    assert_eq!(store.record_count(), 0);
  }

  #[tokio::test]
  async fn write_fault_aborts_without_record() {
    let (store, subject, [a, ..]) = example();
    store.fail_write.store(true, Ordering::SeqCst);

    let err = consult(&store, &ResolutionPolicy::BestMatch, subject, vec![a])
      .await
      .unwrap_err();
    assert!(matches!(err, ConsultError::Repository(Unavailable)));
    assert_eq!(store.record_count(), 0);
  }

  #[tokio::test]
  async fn read_fault_aborts_without_record() {
    let (store, subject, [a, ..]) = example();
    store.fail_read.store(true, Ordering::SeqCst);

    let err = consult(&store, &ResolutionPolicy::BestMatch, subject, vec![a])
      .await
      .unwrap_err();
    assert!(matches!(err, ConsultError::Repository(Unavailable)));
    assert_eq!(store.record_count(), 0);
  }

  #[tokio::test]
  async fn abandoned_evaluation_writes_nothing() {
    let (mut store, subject, [a, ..]) = example();
    store.stall = Some(std::time::Duration::from_secs(5));

    let pending = evaluate(&store, &ResolutionPolicy::BestMatch, subject, vec![a]);
    let elapsed = tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
    assert!(elapsed.is_err());
    assert_eq!(store.record_count(), 0);
  }

  #[tokio::test]
  async fn evaluate_only_reads() {
    let (store, subject, [a, _, _, x, _]) = example();

    let evaluation = evaluate(&store, &ResolutionPolicy::BestMatch, subject, vec![a])
      .await
      .unwrap();
    assert!(matches!(&evaluation, Evaluation::Matched { matches, .. } if matches.len() == 1));
    assert_eq!(store.record_count(), 0);

    let Consultation::Resolved { record, .. } = persist(&store, evaluation).await.unwrap() else {
      panic!("expected a resolved consultation");
    };
    // Tie on one match each; the older rule wins.
    assert_eq!(record.recommendations, vec![x]);
    assert_eq!(store.record_count(), 1);

    assert_eq!(persist(&store, Evaluation::NoMatch).await.unwrap(), Consultation::NoMatch);
    assert_eq!(store.record_count(), 1);
  }

  #[tokio::test]
  async fn repeated_consultations_agree() {
    let (store, subject, [a, b, ..]) = example();
    let mut seen = Vec::new();
    for _ in 0..3 {
      let Consultation::Resolved { record, .. } =
        consult(&store, &ResolutionPolicy::BestMatch, subject, vec![a, b])
          .await
          .unwrap()
      else {
        panic!("expected a resolved consultation");
      };
      seen.push(record.recommendations);
    }
    assert!(seen.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.record_count(), 3);
  }
}
