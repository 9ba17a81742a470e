//! Categories, characteristics and recommendations.
//!
//! Every check that guards a write (unique codes, parent existence, cycle
//! detection, referencing rules) runs in the same transaction as the write.

use pakar_core::{
  EntityKind,
  category::{Category, CategoryTree, NewCategory},
  characteristic::{Characteristic, NewCharacteristic},
  recommendation::{NewRecommendation, Recommendation},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CATEGORY_COLUMNS, CHARACTERISTIC_COLUMNS, RECOMMENDATION_COLUMNS, RawCategory,
    RawCharacteristic, RawRecommendation, encode_dt, encode_status, encode_uuid, now,
    read_opt_uuid, read_uuid,
  },
  store::{Checked, SqliteStore},
};

use pakar_core::{Error as CoreError, status::Status};

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Whether `sql` yields at least one row.
pub(crate) fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params, |_| Ok(())).optional()?.is_some())
}

pub(crate) fn category_exists(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<bool> {
  exists(
    conn,
    "SELECT 1 FROM categories WHERE category_id = ?1",
    rusqlite::params![id],
  )
}

fn load_tree(conn: &rusqlite::Connection) -> rusqlite::Result<CategoryTree> {
  let mut stmt = conn.prepare("SELECT category_id, parent_id FROM categories")?;
  let edges = stmt
    .query_map([], |row| Ok((read_uuid(row, 0)?, read_opt_uuid(row, 1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(CategoryTree::from_edges(edges))
}

fn duplicate(entity: EntityKind, key: &str) -> CoreError {
  CoreError::Duplicate { entity, key: key.to_owned() }
}

// ─── Categories ──────────────────────────────────────────────────────────────

impl SqliteStore {
  pub(crate) async fn insert_category(&self, input: NewCategory) -> Result<Category> {
    let input = input.normalized()?;
    let at = now();
    let category = Category {
      category_id: Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      parent_id:   input.parent_id,
      created_at:  at,
      updated_at:  at,
    };

    let id = category.category_id;
    let parent = category.parent_id;
    let id_str = encode_uuid(id);
    let parent_str = parent.map(encode_uuid);
    let name = category.name.clone();
    let description = category.description.clone();
    let at_str = encode_dt(at);

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if exists(&tx, "SELECT 1 FROM categories WHERE name = ?1", rusqlite::params![name])? {
          return Ok(Err(duplicate(EntityKind::Category, &name)));
        }
        if let Err(e) = load_tree(&tx)?.check_parent(id, parent) {
          return Ok(Err(e));
        }
        tx.execute(
          "INSERT INTO categories (category_id, name, description, parent_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, name, description, parent_str, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    checked?;

    Ok(category)
  }

  pub(crate) async fn fetch_category(&self, id: Uuid) -> Result<Option<Category>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = ?1"),
              rusqlite::params![id_str],
              RawCategory::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCategory::into_category).transpose()
  }

  pub(crate) async fn fetch_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawCategory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawCategory::into_category).collect()
  }

  pub(crate) async fn modify_category(
    &self,
    id: Uuid,
    input: NewCategory,
  ) -> Result<Category> {
    let input = input.normalized()?;
    let id_str = encode_uuid(id);
    let parent = input.parent_id;
    let parent_str = parent.map(encode_uuid);
    let name = input.name;
    let description = input.description;
    let at_str = encode_dt(now());

    let checked: Checked<RawCategory> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !category_exists(&tx, &id_str)? {
          return Ok(Err(CoreError::CategoryNotFound(id)));
        }
        if exists(
          &tx,
          "SELECT 1 FROM categories WHERE name = ?1 AND category_id != ?2",
          rusqlite::params![name, id_str],
        )? {
          return Ok(Err(duplicate(EntityKind::Category, &name)));
        }
        if let Err(e) = load_tree(&tx)?.check_parent(id, parent) {
          return Ok(Err(e));
        }
        tx.execute(
          "UPDATE categories SET name = ?2, description = ?3, parent_id = ?4, updated_at = ?5
           WHERE category_id = ?1",
          rusqlite::params![id_str, name, description, parent_str, at_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE category_id = ?1"),
          rusqlite::params![id_str],
          RawCategory::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    checked?.into_category()
  }

  pub(crate) async fn remove_category(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !category_exists(&tx, &id_str)? {
          return Ok(Err(CoreError::CategoryNotFound(id)));
        }
        let references: i64 = tx.query_row(
          "SELECT (SELECT COUNT(*) FROM categories      WHERE parent_id   = ?1)
                + (SELECT COUNT(*) FROM characteristics WHERE category_id = ?1)
                + (SELECT COUNT(*) FROM recommendations WHERE category_id = ?1)
                + (SELECT COUNT(*) FROM rules           WHERE category_id = ?1)
                + (SELECT COUNT(*) FROM subjects        WHERE category_id = ?1)",
          rusqlite::params![id_str],
          |row| row.get(0),
        )?;
        if references > 0 {
          return Ok(Err(CoreError::CategoryInUse(id)));
        }
        tx.execute("DELETE FROM categories WHERE category_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    Ok(checked?)
  }
}

// ─── Characteristics ─────────────────────────────────────────────────────────

impl SqliteStore {
  pub(crate) async fn insert_characteristic(
    &self,
    input: NewCharacteristic,
  ) -> Result<Characteristic> {
    let input = input.normalized()?;
    let at = now();
    let characteristic = Characteristic {
      characteristic_id: Uuid::new_v4(),
      code:              input.code,
      question:          input.question,
      category_id:       input.category_id,
      status:            Status::Active,
      created_at:        at,
      updated_at:        at,
    };

    let id_str = encode_uuid(characteristic.characteristic_id);
    let category_id = characteristic.category_id;
    let category_str = encode_uuid(category_id);
    let code = characteristic.code.clone();
    let question = characteristic.question.clone();
    let status_str = encode_status(characteristic.status);
    let at_str = encode_dt(at);

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !category_exists(&tx, &category_str)? {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }
        if exists(&tx, "SELECT 1 FROM characteristics WHERE code = ?1", rusqlite::params![code])? {
          return Ok(Err(duplicate(EntityKind::Characteristic, &code)));
        }
        tx.execute(
          "INSERT INTO characteristics
             (characteristic_id, code, question, category_id, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, code, question, category_str, status_str, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    checked?;

    Ok(characteristic)
  }

  pub(crate) async fn fetch_characteristic(
    &self,
    id: Uuid,
  ) -> Result<Option<Characteristic>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawCharacteristic> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CHARACTERISTIC_COLUMNS} FROM characteristics
                 WHERE characteristic_id = ?1 AND status = 'active'"
              ),
              rusqlite::params![id_str],
              RawCharacteristic::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCharacteristic::into_characteristic).transpose()
  }

  pub(crate) async fn fetch_characteristics(
    &self,
    category_id: Option<Uuid>,
  ) -> Result<Vec<Characteristic>> {
    let category_str = category_id.map(encode_uuid);
    let raws: Vec<RawCharacteristic> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHARACTERISTIC_COLUMNS} FROM characteristics
           WHERE status = 'active' AND (?1 IS NULL OR category_id = ?1)
           ORDER BY code"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![category_str], RawCharacteristic::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawCharacteristic::into_characteristic).collect()
  }

  pub(crate) async fn modify_characteristic(
    &self,
    id: Uuid,
    input: NewCharacteristic,
  ) -> Result<Characteristic> {
    let input = input.normalized()?;
    let id_str = encode_uuid(id);
    let category_id = input.category_id;
    let category_str = encode_uuid(category_id);
    let code = input.code;
    let question = input.question;
    let at_str = encode_dt(now());

    let checked: Checked<RawCharacteristic> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM characteristics WHERE characteristic_id = ?1 AND status = 'active'",
          rusqlite::params![id_str],
        )? {
          return Ok(Err(CoreError::CharacteristicNotFound(id)));
        }
        if !category_exists(&tx, &category_str)? {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }
        if exists(
          &tx,
          "SELECT 1 FROM characteristics WHERE code = ?1 AND characteristic_id != ?2",
          rusqlite::params![code, id_str],
        )? {
          return Ok(Err(duplicate(EntityKind::Characteristic, &code)));
        }
        tx.execute(
          "UPDATE characteristics SET code = ?2, question = ?3, category_id = ?4, updated_at = ?5
           WHERE characteristic_id = ?1",
          rusqlite::params![id_str, code, question, category_str, at_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {CHARACTERISTIC_COLUMNS} FROM characteristics WHERE characteristic_id = ?1"),
          rusqlite::params![id_str],
          RawCharacteristic::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    checked?.into_characteristic()
  }

  pub(crate) async fn soft_delete_characteristic(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(now());

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM characteristics WHERE characteristic_id = ?1 AND status = 'active'",
          rusqlite::params![id_str],
        )? {
          return Ok(Err(CoreError::CharacteristicNotFound(id)));
        }
        let referenced_by: Option<String> = tx
          .query_row(
            "SELECT r.code FROM rule_antecedents a
             JOIN rules r ON r.rule_id = a.rule_id
             WHERE a.characteristic_id = ?1
             ORDER BY r.created_at, r.rowid
             LIMIT 1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        if let Some(rule_code) = referenced_by {
          return Ok(Err(CoreError::InUse {
            entity: EntityKind::Characteristic,
            id,
            rule_code,
          }));
        }
        tx.execute(
          "UPDATE characteristics SET status = 'deleted', updated_at = ?2
           WHERE characteristic_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    Ok(checked?)
  }
}

// ─── Recommendations ─────────────────────────────────────────────────────────

impl SqliteStore {
  pub(crate) async fn insert_recommendation(
    &self,
    input: NewRecommendation,
  ) -> Result<Recommendation> {
    let input = input.normalized()?;
    let at = now();
    let recommendation = Recommendation {
      recommendation_id: Uuid::new_v4(),
      code:              input.code,
      name:              input.name,
      description:       input.description,
      category_id:       input.category_id,
      status:            Status::Active,
      created_at:        at,
      updated_at:        at,
    };

    let id_str = encode_uuid(recommendation.recommendation_id);
    let category_id = recommendation.category_id;
    let category_str = encode_uuid(category_id);
    let code = recommendation.code.clone();
    let name = recommendation.name.clone();
    let description = recommendation.description.clone();
    let status_str = encode_status(recommendation.status);
    let at_str = encode_dt(at);

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !category_exists(&tx, &category_str)? {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }
        if exists(&tx, "SELECT 1 FROM recommendations WHERE code = ?1", rusqlite::params![code])? {
          return Ok(Err(duplicate(EntityKind::Recommendation, &code)));
        }
        tx.execute(
          "INSERT INTO recommendations
             (recommendation_id, code, name, description, category_id, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![id_str, code, name, description, category_str, status_str, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    checked?;

    Ok(recommendation)
  }

  pub(crate) async fn fetch_recommendation(
    &self,
    id: Uuid,
  ) -> Result<Option<Recommendation>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawRecommendation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations
                 WHERE recommendation_id = ?1 AND status = 'active'"
              ),
              rusqlite::params![id_str],
              RawRecommendation::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRecommendation::into_recommendation).transpose()
  }

  pub(crate) async fn fetch_recommendations(
    &self,
    category_id: Option<Uuid>,
  ) -> Result<Vec<Recommendation>> {
    let category_str = category_id.map(encode_uuid);
    let raws: Vec<RawRecommendation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECOMMENDATION_COLUMNS} FROM recommendations
           WHERE status = 'active' AND (?1 IS NULL OR category_id = ?1)
           ORDER BY code"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![category_str], RawRecommendation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRecommendation::into_recommendation).collect()
  }

  pub(crate) async fn modify_recommendation(
    &self,
    id: Uuid,
    input: NewRecommendation,
  ) -> Result<Recommendation> {
    let input = input.normalized()?;
    let id_str = encode_uuid(id);
    let category_id = input.category_id;
    let category_str = encode_uuid(category_id);
    let code = input.code;
    let name = input.name;
    let description = input.description;
    let at_str = encode_dt(now());

    let checked: Checked<RawRecommendation> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM recommendations WHERE recommendation_id = ?1 AND status = 'active'",
          rusqlite::params![id_str],
        )? {
          return Ok(Err(CoreError::RecommendationNotFound(id)));
        }
        if !category_exists(&tx, &category_str)? {
          return Ok(Err(CoreError::CategoryNotFound(category_id)));
        }
        if exists(
          &tx,
          "SELECT 1 FROM recommendations WHERE code = ?1 AND recommendation_id != ?2",
          rusqlite::params![code, id_str],
        )? {
          return Ok(Err(duplicate(EntityKind::Recommendation, &code)));
        }
        tx.execute(
          "UPDATE recommendations
           SET code = ?2, name = ?3, description = ?4, category_id = ?5, updated_at = ?6
           WHERE recommendation_id = ?1",
          rusqlite::params![id_str, code, name, description, category_str, at_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations WHERE recommendation_id = ?1"),
          rusqlite::params![id_str],
          RawRecommendation::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    checked?.into_recommendation()
  }

  pub(crate) async fn soft_delete_recommendation(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(now());

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM recommendations WHERE recommendation_id = ?1 AND status = 'active'",
          rusqlite::params![id_str],
        )? {
          return Ok(Err(CoreError::RecommendationNotFound(id)));
        }
        let referenced_by: Option<String> = tx
          .query_row(
            "SELECT code FROM rules WHERE consequent_id = ?1
             ORDER BY created_at, rowid LIMIT 1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        if let Some(rule_code) = referenced_by {
          return Ok(Err(CoreError::InUse {
            entity: EntityKind::Recommendation,
            id,
            rule_code,
          }));
        }
        tx.execute(
          "UPDATE recommendations SET status = 'deleted', updated_at = ?2
           WHERE recommendation_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    Ok(checked?)
  }
}
