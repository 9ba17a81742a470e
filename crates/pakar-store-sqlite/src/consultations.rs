//! Subjects and the consultation records written against them.

use pakar_core::{
  Error as CoreError,
  consultation::{ConsultationQuery, ConsultationRecord, NewConsultationRecord},
  subject::{NewSubject, Subject, SubjectFilter},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  catalog::{category_exists, exists},
  encode::{
    CONSULTATION_COLUMNS, RawConsultation, RawSubject, SUBJECT_COLUMNS, encode_dt,
    encode_ids, encode_uuid, now,
  },
  store::{Checked, SqliteStore},
};

/// Page size used when a history query gives no limit.
const DEFAULT_PAGE: usize = 100;

// ─── Subjects ────────────────────────────────────────────────────────────────

impl SqliteStore {
  pub(crate) async fn insert_subject(&self, input: NewSubject) -> Result<Subject> {
    let input = input.normalized()?;
    let subject = Subject {
      subject_id:  Uuid::new_v4(),
      user_id:     input.user_id,
      category_id: input.category_id,
      name:        input.name,
      created_at:  now(),
    };

    let id_str = encode_uuid(subject.subject_id);
    let user_id = subject.user_id;
    let user_str = encode_uuid(user_id);
    let category_id = subject.category_id;
    let category_str = encode_uuid(category_id);
    let name = subject.name.clone();
    let at_str = encode_dt(subject.created_at);

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !category_exists(&tx, &category_str)? {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }
        if exists(
          &tx,
          "SELECT 1 FROM subjects WHERE user_id = ?1 AND category_id = ?2",
          rusqlite::params![user_str, category_str],
        )? {
          return Ok(Err(CoreError::SubjectExists { user_id, category_id }));
        }
        tx.execute(
          "INSERT INTO subjects (subject_id, user_id, category_id, name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_str, category_str, name, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    checked?;

    Ok(subject)
  }

  pub(crate) async fn fetch_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"),
              rusqlite::params![id_str],
              RawSubject::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSubject::into_subject).transpose()
  }

  pub(crate) async fn fetch_subjects(&self, filter: SubjectFilter) -> Result<Vec<Subject>> {
    let user_str = filter.user_id.map(encode_uuid);
    let category_str = filter.category_id.map(encode_uuid);
    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBJECT_COLUMNS} FROM subjects
           WHERE (?1 IS NULL OR user_id = ?1)
             AND (?2 IS NULL OR category_id = ?2)
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, category_str], RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  pub(crate) async fn modify_subject(&self, id: Uuid, input: NewSubject) -> Result<Subject> {
    let input = input.normalized()?;
    let id_str = encode_uuid(id);
    let user_id = input.user_id;
    let user_str = encode_uuid(user_id);
    let category_id = input.category_id;
    let category_str = encode_uuid(category_id);
    let name = input.name;

    let checked: Checked<RawSubject> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM subjects WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )? {
          return Ok(Err(CoreError::SubjectNotFound(id)));
        }
        if !category_exists(&tx, &category_str)? {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }
        if exists(
          &tx,
          "SELECT 1 FROM subjects
           WHERE user_id = ?1 AND category_id = ?2 AND subject_id != ?3",
          rusqlite::params![user_str, category_str, id_str],
        )? {
          return Ok(Err(CoreError::SubjectExists { user_id, category_id }));
        }
        tx.execute(
          "UPDATE subjects SET user_id = ?2, category_id = ?3, name = ?4
           WHERE subject_id = ?1",
          rusqlite::params![id_str, user_str, category_str, name],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE subject_id = ?1"),
          rusqlite::params![id_str],
          RawSubject::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    let subject = checked?.into_subject()?;
    tracing::debug!(subject = %id, category = %subject.category_id, "subject updated");
    Ok(subject)
  }

  /// Delete a subject and every consultation record written against it.
  pub(crate) async fn remove_subject(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let (deleted, records): (usize, usize) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let records = tx.execute(
          "DELETE FROM consultations WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?;
        let deleted =
          tx.execute("DELETE FROM subjects WHERE subject_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok((deleted, records))
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::SubjectNotFound(id).into());
    }
    tracing::debug!(subject = %id, records, "subject deleted");
    Ok(())
  }
}

// ─── Consultation records ────────────────────────────────────────────────────

impl SqliteStore {
  pub(crate) async fn insert_consultation(
    &self,
    input: NewConsultationRecord,
  ) -> Result<ConsultationRecord> {
    let record = ConsultationRecord {
      record_id:       Uuid::new_v4(),
      subject_id:      input.subject_id,
      selected:        input.selected,
      recommendations: input.recommendations,
      created_at:      now(),
    };

    let id_str = encode_uuid(record.record_id);
    let subject_id = record.subject_id;
    let subject_str = encode_uuid(subject_id);
    let selected_json = encode_ids(&record.selected)?;
    let recommendations_json = encode_ids(&record.recommendations)?;
    let at_str = encode_dt(record.created_at);

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM subjects WHERE subject_id = ?1",
          rusqlite::params![subject_str],
        )? {
          return Ok(Err(CoreError::SubjectNotFound(subject_id)));
        }
        tx.execute(
          "INSERT INTO consultations
             (record_id, subject_id, selected_json, recommendations_json, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, subject_str, selected_json, recommendations_json, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    checked?;

    Ok(record)
  }

  pub(crate) async fn fetch_consultation(
    &self,
    id: Uuid,
  ) -> Result<Option<ConsultationRecord>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawConsultation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE record_id = ?1"),
              rusqlite::params![id_str],
              RawConsultation::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawConsultation::into_record).transpose()
  }

  pub(crate) async fn fetch_consultations(
    &self,
    query: ConsultationQuery,
  ) -> Result<Vec<ConsultationRecord>> {
    let subject_str = query.subject_id.map(encode_uuid);
    let limit = i64::try_from(query.limit.unwrap_or(DEFAULT_PAGE)).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX);

    let raws: Vec<RawConsultation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONSULTATION_COLUMNS} FROM consultations
           WHERE (?1 IS NULL OR subject_id = ?1)
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str, limit, offset], RawConsultation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawConsultation::into_record).collect()
  }

  pub(crate) async fn remove_consultation(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM consultations WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::ConsultationNotFound(id).into());
    }
    Ok(())
  }
}
