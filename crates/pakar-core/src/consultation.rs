//! Consultation records: the immutable history of past consultations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One finished consultation. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationRecord {
  pub record_id:       Uuid,
  pub subject_id:      Uuid,
  /// Selected characteristic ids, in the order the caller gave them.
  pub selected:        Vec<Uuid>,
  /// Resolved recommendation ids, in result order.
  pub recommendations: Vec<Uuid>,
  /// Server-assigned timestamp.
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::ConsultationStore::record_consultation`].
/// `record_id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConsultationRecord {
  pub subject_id:      Uuid,
  pub selected:        Vec<Uuid>,
  pub recommendations: Vec<Uuid>,
}

/// Parameters for [`crate::store::KnowledgeStore::list_consultations`].
/// Results are always newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsultationQuery {
  pub subject_id: Option<Uuid>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}
