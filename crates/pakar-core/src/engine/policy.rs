//! Resolution policies: reducing scored rules to a consultation result.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  engine::{RuleSnapshot, Score, Selection, score},
  rule::RuleScope,
  subject::Subject,
};

/// How many recommendations quorum-ranked resolution returns by default.
pub const DEFAULT_QUORUM_LIMIT: NonZeroUsize = NonZeroUsize::new(3).unwrap();

fn default_quorum_limit() -> NonZeroUsize { DEFAULT_QUORUM_LIMIT }

/// The matching policy of a deployment. Chosen by configuration, never per
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionPolicy {
  /// The single rule with the most antecedent characteristics selected.
  ///
  /// Rules concluding a deleted recommendation are skipped. Ties go to the
  /// rule that comes first in the snapshot.
  #[default]
  BestMatch,

  /// Every rule of the subject's category whose antecedent is more than half
  /// selected, most specific first, at most `limit` of them.
  QuorumRanked {
    #[serde(default = "default_quorum_limit")]
    limit: NonZeroUsize,
  },
}

/// A rule that contributed to a consultation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
  pub rule_id:           Uuid,
  pub rule_code:         String,
  pub recommendation_id: Uuid,
  #[serde(flatten)]
  pub score:             Score,
}

impl ResolutionPolicy {
  pub fn quorum_ranked(limit: NonZeroUsize) -> Self {
    Self::QuorumRanked { limit }
  }

  /// Which rules a consultation for `subject` reads.
  pub fn scope(&self, subject: &Subject) -> RuleScope {
    match self {
      Self::BestMatch => RuleScope::All,
      Self::QuorumRanked { .. } => RuleScope::Category(subject.category_id),
    }
  }

  /// Resolve `selection` against `snapshot`. An empty result means no rule
  /// matched.
  pub fn resolve(
    &self,
    snapshot: &RuleSnapshot,
    selection: &Selection,
  ) -> Vec<RuleMatch> {
    match self {
      Self::BestMatch => best_match(snapshot, selection).into_iter().collect(),
      Self::QuorumRanked { limit } => {
        quorum_ranked(snapshot, selection, limit.get())
      }
    }
  }
}

fn best_match(snapshot: &RuleSnapshot, selection: &Selection) -> Option<RuleMatch> {
  let mut best: Option<(Score, &crate::rule::RuleEntry)> = None;
  for entry in snapshot.iter() {
    if !entry.consequent_status.is_active() {
      continue;
    }
    let Some(score) = score(&entry.rule, selection) else {
      continue;
    };
    if score.match_count == 0 {
      continue;
    }
    // Strictly greater: an equal score never displaces an earlier rule.
    if best.is_none_or(|(b, _)| score.match_count > b.match_count) {
      best = Some((score, entry));
    }
  }
  best.map(|(score, entry)| RuleMatch {
    rule_id: entry.rule.rule_id,
    rule_code: entry.rule.code.clone(),
    recommendation_id: entry.rule.consequent,
    score,
  })
}

fn quorum_ranked(
  snapshot: &RuleSnapshot,
  selection: &Selection,
  limit: usize,
) -> Vec<RuleMatch> {
  let mut fired: Vec<RuleMatch> = snapshot
    .iter()
    .filter_map(|entry| {
      let score = score(&entry.rule, selection)?;
      score.has_quorum().then(|| RuleMatch {
        rule_id: entry.rule.rule_id,
        rule_code: entry.rule.code.clone(),
        recommendation_id: entry.rule.consequent,
        score,
      })
    })
    .collect();

  // `sort_by` is stable, so equally specific rules keep snapshot order.
  fired.sort_by(|a, b| b.score.specificity.cmp(&a.score.specificity));
  fired.truncate(limit);
  fired
}
