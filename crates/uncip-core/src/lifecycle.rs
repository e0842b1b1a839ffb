//! Alert status lifecycle.
//!
//! An alert starts `active` and may move once, to `resolved` or
//! `cancelled`. Both are terminal: nothing leads back to `active`.
//! Repeating the transition an alert already went through is a no-op that
//! leaves its timestamps alone.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  record::{AlertRecord, AlertStatus},
};

/// What a requested status change did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// The status changed and the matching timestamp was set.
  Applied,
  /// The alert was already in the requested terminal state.
  Unchanged,
}

/// Validate a status change without touching any record.
pub fn check(from: AlertStatus, to: AlertStatus) -> Result<Transition> {
  use AlertStatus::*;
  match (from, to) {
    (Active, Resolved | Cancelled) => Ok(Transition::Applied),
    (Resolved, Resolved) | (Cancelled, Cancelled) => Ok(Transition::Unchanged),
    _ => Err(Error::InvalidTransition { from, to }),
  }
}

/// Move `alert` to `to`, stamping `resolved_at` / `cancelled_at` with `at`.
pub fn apply(
  alert: &mut AlertRecord,
  to: AlertStatus,
  at: DateTime<Utc>,
) -> Result<Transition> {
  let outcome = check(alert.status, to)?;
  if outcome == Transition::Applied {
    alert.status = to;
    alert.updated_at = at;
    match to {
      AlertStatus::Resolved => alert.resolved_at = Some(at),
      AlertStatus::Cancelled => alert.cancelled_at = Some(at),
      AlertStatus::Active => {}
    }
  }
  Ok(outcome)
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use uuid::Uuid;

  use super::*;

  fn active_alert() -> AlertRecord {
    let now = Utc::now();
    AlertRecord {
      id:                 Uuid::new_v4(),
      child_id:           Uuid::new_v4(),
      status:             AlertStatus::Active,
      alert_type:         Some("missing".into()),
      legacy_type:        Some("missing".into()),
      description:        None,
      last_seen_location: None,
      created_by:         "p1".into(),
      created_at:         now,
      updated_at:         now,
      resolved_at:        None,
      cancelled_at:       None,
    }
  }

  #[test]
  fn resolve_sets_timestamp() {
    let mut alert = active_alert();
    let at = Utc::now();
    assert_eq!(apply(&mut alert, AlertStatus::Resolved, at).unwrap(), Transition::Applied);
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert_eq!(alert.resolved_at, Some(at));
    assert_eq!(alert.cancelled_at, None);
  }

  #[test]
  fn resolving_twice_keeps_first_timestamp() {
    let mut alert = active_alert();
    let first = Utc::now();
    apply(&mut alert, AlertStatus::Resolved, first).unwrap();

    let later = first + Duration::minutes(5);
    assert_eq!(apply(&mut alert, AlertStatus::Resolved, later).unwrap(), Transition::Unchanged);
    assert_eq!(alert.status, AlertStatus::Resolved);
    assert_eq!(alert.resolved_at, Some(first));
    assert_eq!(alert.updated_at, first);
  }

  #[test]
  fn cancel_sets_timestamp() {
    let mut alert = active_alert();
    let at = Utc::now();
    apply(&mut alert, AlertStatus::Cancelled, at).unwrap();
    assert_eq!(alert.status, AlertStatus::Cancelled);
    assert_eq!(alert.cancelled_at, Some(at));
  }

  #[test]
  fn terminal_states_do_not_reopen() {
    for terminal in [AlertStatus::Resolved, AlertStatus::Cancelled] {
      assert!(matches!(
        check(terminal, AlertStatus::Active),
        Err(Error::InvalidTransition { to: AlertStatus::Active, .. })
      ));
    }
  }

  #[test]
  fn resolved_cannot_become_cancelled() {
    assert!(check(AlertStatus::Resolved, AlertStatus::Cancelled).is_err());
    assert!(check(AlertStatus::Cancelled, AlertStatus::Resolved).is_err());
  }

  #[test]
  fn active_to_active_is_invalid() {
    assert!(check(AlertStatus::Active, AlertStatus::Active).is_err());
  }
}
