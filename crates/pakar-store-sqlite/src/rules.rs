//! Rules and their antecedent sets.

use std::collections::HashMap;

use pakar_core::{
  EntityKind, Error as CoreError,
  rule::{NewRule, Rule, RuleEntry, ValidRule},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  catalog::{category_exists, exists},
  encode::{RawRule, encode_dt, encode_uuid, now},
  store::{Checked, SqliteStore},
};

const RULE_SELECT: &str = "
  SELECT r.rule_id, r.code, r.consequent_id, r.category_id, r.created_at, r.updated_at,
         c.status
  FROM rules r
  JOIN recommendations c ON c.recommendation_id = r.consequent_id";

fn raw_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRule> {
  Ok(RawRule {
    rule_id:           row.get(0)?,
    code:              row.get(1)?,
    consequent_id:     row.get(2)?,
    category_id:       row.get(3)?,
    created_at:        row.get(4)?,
    updated_at:        row.get(5)?,
    consequent_status: row.get(6)?,
    antecedent:        Vec::new(),
  })
}

fn load_antecedent(
  conn: &rusqlite::Connection,
  rule_id: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare_cached(
    "SELECT characteristic_id FROM rule_antecedents WHERE rule_id = ?1",
  )?;
  let ids = stmt
    .query_map(rusqlite::params![rule_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(ids)
}

/// Check every entity `rule` refers to, and that its code is free.
/// `own_id` excludes the rule being updated from the uniqueness check.
fn check_references(
  conn: &rusqlite::Connection,
  rule: &ValidRule,
  own_id: Option<&str>,
) -> rusqlite::Result<Checked<()>> {
  for id in &rule.antecedent {
    if !exists(
      conn,
      "SELECT 1 FROM characteristics WHERE characteristic_id = ?1 AND status = 'active'",
      rusqlite::params![encode_uuid(*id)],
    )? {
      return Ok(Err(CoreError::CharacteristicNotFound(*id)));
    }
  }
  if !exists(
    conn,
    "SELECT 1 FROM recommendations WHERE recommendation_id = ?1 AND status = 'active'",
    rusqlite::params![encode_uuid(rule.consequent)],
  )? {
    return Ok(Err(CoreError::RecommendationNotFound(rule.consequent)));
  }
  if let Some(category_id) = rule.category_id
    && !category_exists(conn, &encode_uuid(category_id))?
  {
    return Ok(Err(CoreError::CategoryNotFound(category_id)));
  }
  if exists(
    conn,
    "SELECT 1 FROM rules WHERE code = ?1 AND rule_id != ?2",
    rusqlite::params![rule.code, own_id.unwrap_or("")],
  )? {
    return Ok(Err(CoreError::Duplicate {
      entity: EntityKind::Rule,
      key:    rule.code.clone(),
    }));
  }
  Ok(Ok(()))
}

fn write_antecedent(
  conn: &rusqlite::Connection,
  rule_id: &str,
  rule: &ValidRule,
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare_cached(
    "INSERT INTO rule_antecedents (rule_id, characteristic_id) VALUES (?1, ?2)",
  )?;
  for id in &rule.antecedent {
    stmt.execute(rusqlite::params![rule_id, encode_uuid(*id)])?;
  }
  Ok(())
}

impl SqliteStore {
  pub(crate) async fn insert_rule(&self, input: NewRule) -> Result<Rule> {
    let valid = input.validate()?;
    let at = now();
    let rule = Rule {
      rule_id:     Uuid::new_v4(),
      code:        valid.code.clone(),
      antecedent:  valid.antecedent.clone(),
      consequent:  valid.consequent,
      category_id: valid.category_id,
      created_at:  at,
      updated_at:  at,
    };

    let id_str = encode_uuid(rule.rule_id);
    let at_str = encode_dt(at);

    let checked: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Err(e) = check_references(&tx, &valid, None)? {
          return Ok(Err(e));
        }
        tx.execute(
          "INSERT INTO rules (rule_id, code, consequent_id, category_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![
            id_str,
            valid.code,
            encode_uuid(valid.consequent),
            valid.category_id.map(encode_uuid),
            at_str,
          ],
        )?;
        write_antecedent(&tx, &id_str, &valid)?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    checked?;

    tracing::debug!(rule = %rule.code, specificity = rule.specificity(), "rule created");
    Ok(rule)
  }

  pub(crate) async fn fetch_rule(&self, id: Uuid) -> Result<Option<Rule>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawRule> = self
      .conn
      .call(move |conn| {
        let Some(mut raw) = conn
          .query_row(
            &format!("{RULE_SELECT} WHERE r.rule_id = ?1"),
            rusqlite::params![id_str],
            raw_rule,
          )
          .optional()?
        else {
          return Ok(None);
        };
        raw.antecedent = load_antecedent(conn, &raw.rule_id)?;
        Ok(Some(raw))
      })
      .await?;
    raw.map(RawRule::into_rule).transpose()
  }

  /// Rules with their consequent status, in snapshot order: ascending
  /// `created_at`, then insertion order.
  pub(crate) async fn fetch_rule_entries(
    &self,
    category_id: Option<Uuid>,
  ) -> Result<Vec<RuleEntry>> {
    let category_str = category_id.map(encode_uuid);
    let raws: Vec<RawRule> = self
      .conn
      .call(move |conn| {
        // One transaction so the rule list and the antecedents agree.
        let tx = conn.transaction()?;
        let mut raws = {
          let mut stmt = tx.prepare(&format!(
            "{RULE_SELECT}
             WHERE (?1 IS NULL OR r.category_id = ?1)
             ORDER BY r.created_at, r.rowid"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![category_str], raw_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        let mut antecedents: HashMap<String, Vec<String>> = HashMap::new();
        {
          let mut stmt = tx.prepare(
            "SELECT a.rule_id, a.characteristic_id
             FROM rule_antecedents a
             JOIN rules r ON r.rule_id = a.rule_id
             WHERE (?1 IS NULL OR r.category_id = ?1)",
          )?;
          let pairs = stmt.query_map(rusqlite::params![category_str], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
          })?;
          for pair in pairs {
            let (rule_id, characteristic_id) = pair?;
            antecedents.entry(rule_id).or_default().push(characteristic_id);
          }
        }
        tx.commit()?;

        for raw in &mut raws {
          raw.antecedent = antecedents.remove(&raw.rule_id).unwrap_or_default();
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawRule::into_entry).collect()
  }

  /// Replace every editable field of a rule. `created_at`, and with it the
  /// rule's position in snapshot order, is kept.
  pub(crate) async fn modify_rule(&self, id: Uuid, input: NewRule) -> Result<Rule> {
    let valid = input.validate()?;
    let id_str = encode_uuid(id);
    let at_str = encode_dt(now());

    let checked: Checked<RawRule> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "SELECT 1 FROM rules WHERE rule_id = ?1", rusqlite::params![id_str])? {
          return Ok(Err(CoreError::RuleNotFound(id)));
        }
        if let Err(e) = check_references(&tx, &valid, Some(&id_str))? {
          return Ok(Err(e));
        }
        tx.execute(
          "UPDATE rules SET code = ?2, consequent_id = ?3, category_id = ?4, updated_at = ?5
           WHERE rule_id = ?1",
          rusqlite::params![
            id_str,
            valid.code,
            encode_uuid(valid.consequent),
            valid.category_id.map(encode_uuid),
            at_str,
          ],
        )?;
        tx.execute("DELETE FROM rule_antecedents WHERE rule_id = ?1", rusqlite::params![id_str])?;
        write_antecedent(&tx, &id_str, &valid)?;

        let mut raw = tx.query_row(
          &format!("{RULE_SELECT} WHERE r.rule_id = ?1"),
          rusqlite::params![id_str],
          raw_rule,
        )?;
        raw.antecedent = load_antecedent(&tx, &id_str)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    checked?.into_rule()
  }

  pub(crate) async fn remove_rule(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let deleted: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM rule_antecedents WHERE rule_id = ?1", rusqlite::params![id_str])?;
        let n = tx.execute("DELETE FROM rules WHERE rule_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(n)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::RuleNotFound(id).into());
    }
    Ok(())
  }
}
