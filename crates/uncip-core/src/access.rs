//! Role and ownership rules for child and alert records.
//!
//! Child rules, first match wins:
//!
//! | Role        | read | create | update | delete |
//! |-------------|------|--------|--------|--------|
//! | admin       | yes  | yes    | yes    | yes    |
//! | authority   | yes  | no     | yes    | no     |
//! | school      | same school | no | same school | no |
//! | parent      | owner | yes   | owner  | owner  |
//! | community   | no   | no     | no     | no     |
//!
//! "Owner" means `parent_id` equals the subject or the subject is listed in
//! `guardians`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  principal::{Principal, Role},
  record::{AlertRecord, AlertStatus, ChildRecord, NewChild, Ownership, add_guardian},
  store::SafetyStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
  Read,
  Create,
  Update,
  Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny,
}

impl Decision {
  fn from_bool(allowed: bool) -> Self {
    if allowed { Self::Allow } else { Self::Deny }
  }

  pub fn is_allowed(self) -> bool { self == Self::Allow }

  /// `Ok(())` on allow, [`Error::Forbidden`] on deny.
  pub fn require(self) -> Result<()> {
    match self {
      Self::Allow => Ok(()),
      Self::Deny => Err(Error::Forbidden),
    }
  }
}

/// Tunables for rules whose intended behaviour is still undecided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EvaluatorPolicy {
  /// Let a parent raise an alert when named only in `parent_id`. Off by
  /// default: alert creation consults `guardians` alone.
  #[serde(default)]
  pub alert_create_honors_parent_id: bool,
}

/// Decides whether a principal may act on a child or alert record.
///
/// Rule checks over a record already in hand are pure. Checks that need the
/// store (the duplicate-alert scan, resolving an alert's child) return
/// [`Error::StoreUnavailable`] when the read fails.
pub struct AccessControlEvaluator<S> {
  store:  Arc<S>,
  policy: EvaluatorPolicy,
}

impl<S> Clone for AccessControlEvaluator<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), policy: self.policy }
  }
}

impl<S> AccessControlEvaluator<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self::with_policy(store, EvaluatorPolicy::default())
  }

  pub fn with_policy(store: Arc<S>, policy: EvaluatorPolicy) -> Self {
    Self { store, policy }
  }

  pub fn policy(&self) -> EvaluatorPolicy { self.policy }

  /// Decide `op` on an existing child record.
  pub fn can_access_child(
    &self,
    principal: &Principal,
    op: Operation,
    child: &ChildRecord,
  ) -> Decision {
    let decision = child_rule(
      principal,
      op,
      &child.ownership(),
      child.school_id.as_deref(),
    );
    tracing::debug!(
      subject = %principal.subject_id,
      role = %principal.role,
      ?op,
      child = %child.id,
      ?decision,
      "child access evaluated"
    );
    decision
  }

  /// Decide whether the principal may create a child record at all.
  pub fn can_create_child(&self, principal: &Principal) -> Decision {
    child_rule(principal, Operation::Create, &Ownership::default(), None)
  }

  /// Decide whether the principal may raise an alert about `child`.
  ///
  /// Admins and authorities may alert on any child. Parents must appear in
  /// the legacy `guardians` array; `parent_id` only counts when
  /// [`EvaluatorPolicy::alert_create_honors_parent_id`] is set.
  pub fn can_create_alert(
    &self,
    principal: &Principal,
    child: &ChildRecord,
  ) -> Decision {
    let ownership = child.ownership();
    let decision = match principal.role {
      Role::Admin | Role::Authority => Decision::Allow,
      Role::Parent if self.policy.alert_create_honors_parent_id => {
        Decision::from_bool(ownership.contains(&principal.subject_id))
      }
      Role::Parent => {
        Decision::from_bool(ownership.has_member(&principal.subject_id))
      }
      Role::School | Role::Community => Decision::Deny,
    };
    tracing::debug!(
      subject = %principal.subject_id,
      role = %principal.role,
      child = %child.id,
      ?decision,
      "alert creation evaluated"
    );
    decision
  }

  /// Resolving or cancelling an alert needs update rights on its child.
  pub fn can_transition_alert(
    &self,
    principal: &Principal,
    child: &ChildRecord,
  ) -> Decision {
    self.can_access_child(principal, Operation::Update, child)
  }

  /// Stamp a parent's ownership onto child data about to be created.
  ///
  /// For a parent, `parent_id` becomes the subject and the subject is added
  /// to `guardians` (created if absent, de-duplicated), so readers of either
  /// encoding see the new owner. Other roles supply ownership explicitly and
  /// the data is returned unchanged.
  pub fn apply_ownership_on_create(
    &self,
    mut child: NewChild,
    principal: &Principal,
  ) -> NewChild {
    if principal.role == Role::Parent {
      child.parent_id = Some(principal.subject_id.clone());
      add_guardian(&mut child.guardians, &principal.subject_id);
    }
    child
  }
}

impl<S> AccessControlEvaluator<S>
where
  S: SafetyStore,
{
  /// True if the child already has an active alert whose `alert_type` or
  /// legacy `type` equals `alert_type`.
  pub async fn check_duplicate_active_alert(
    &self,
    child_id: Uuid,
    alert_type: &str,
  ) -> Result<bool> {
    let active = self
      .store
      .alerts_for_child(child_id, Some(AlertStatus::Active))
      .await
      .map_err(Error::from_store)?;
    Ok(active.iter().any(|a| a.is_active() && a.matches_type(alert_type)))
  }

  /// Alerts carry no owner field; read access is decided on the child.
  pub async fn can_read_alert(
    &self,
    principal: &Principal,
    alert: &AlertRecord,
  ) -> Result<Decision> {
    let child = self
      .store
      .get_child(alert.child_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::ChildNotFound(alert.child_id))?;
    Ok(self.can_access_child(principal, Operation::Read, &child))
  }
}

fn child_rule(
  principal: &Principal,
  op: Operation,
  ownership: &Ownership,
  school_id: Option<&str>,
) -> Decision {
  match principal.role {
    Role::Admin => Decision::Allow,
    Role::Authority => {
      Decision::from_bool(matches!(op, Operation::Read | Operation::Update))
    }
    Role::School => {
      let same_school = match (principal.school_id.as_deref(), school_id) {
        (Some(mine), Some(theirs)) => mine == theirs,
        _ => false,
      };
      Decision::from_bool(
        same_school && matches!(op, Operation::Read | Operation::Update),
      )
    }
    Role::Parent => match op {
      Operation::Create => Decision::Allow,
      Operation::Read | Operation::Update | Operation::Delete => {
        Decision::from_bool(ownership.contains(&principal.subject_id))
      }
    },
    Role::Community => Decision::Deny,
  }
}
