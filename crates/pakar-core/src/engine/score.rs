//! Scoring one rule against a selection.

use serde::{Deserialize, Serialize};

use crate::{engine::Selection, rule::Rule};

/// How a rule relates to a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
  /// Antecedent characteristics present in the selection.
  pub match_count: usize,
  /// Size of the antecedent.
  pub specificity: usize,
}

impl Score {
  /// Strict majority of the antecedent is satisfied.
  pub fn has_quorum(&self) -> bool { 2 * self.match_count > self.specificity }
}

/// Score `rule` against `selection`.
///
/// Returns `None` for a rule with an empty antecedent; such a rule can never
/// fire. Iterates whichever side is smaller and probes the other.
pub fn score(rule: &Rule, selection: &Selection) -> Option<Score> {
  let specificity = rule.antecedent.len();
  if specificity == 0 {
    return None;
  }
  let match_count = if specificity <= selection.len() {
    rule.antecedent.iter().filter(|id| selection.contains(*id)).count()
  } else {
    selection.iter().filter(|id| rule.antecedent.contains(*id)).count()
  };
  Some(Score { match_count, specificity })
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn rule(antecedent: &[Uuid]) -> Rule {
    let now = Utc::now();
    Rule {
      rule_id:     Uuid::new_v4(),
      code:        "R".into(),
      antecedent:  antecedent.iter().copied().collect::<BTreeSet<_>>(),
      consequent:  Uuid::new_v4(),
      category_id: None,
      created_at:  now,
      updated_at:  now,
    }
  }

  fn ids(n: usize) -> Vec<Uuid> { (0..n).map(|_| Uuid::new_v4()).collect() }

  #[test]
  fn counts_only_antecedent_members() {
    let c = ids(5);
    let r = rule(&c[..3]);
    let s = Selection::new(vec![c[0], c[1], c[4]]).unwrap();
    assert_eq!(score(&r, &s), Some(Score { match_count: 2, specificity: 3 }));
  }

  #[test]
  fn both_iteration_directions_agree() {
    let c = ids(6);
    let small = Selection::new(vec![c[1]]).unwrap();
    let large = Selection::new(c.clone()).unwrap();
    let r = rule(&c[..4]);
    assert_eq!(score(&r, &small).unwrap().match_count, 1);
    assert_eq!(score(&r, &large).unwrap().match_count, 4);
  }

  #[test]
  fn match_count_is_bounded() {
    let c = ids(8);
    for a in 1..=c.len() {
      for s in 1..=c.len() {
        let r = rule(&c[..a]);
        // Offset the selection so overlap varies.
        let sel = Selection::new(c[c.len() - s..].to_vec()).unwrap();
        let sc = score(&r, &sel).unwrap();
        assert!(sc.match_count <= a.min(s));
        assert_eq!(sc.specificity, a);
      }
    }
  }

  #[test]
  fn empty_antecedent_is_not_scored() {
    let s = Selection::new(ids(2)).unwrap();
    assert_eq!(score(&rule(&[]), &s), None);
  }

  #[test]
  fn quorum_is_strict_majority() {
    let q = |match_count, specificity| {
      Score { match_count, specificity }.has_quorum()
    };
    assert!(q(1, 1));
    assert!(!q(0, 1));
    assert!(!q(2, 4));
    assert!(q(3, 4));
    assert!(q(2, 3));
    assert!(!q(1, 2));
  }
}
