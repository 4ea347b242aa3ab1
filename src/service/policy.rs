use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::{found, EngineResult, VacationEngine};
use crate::directory::Directory;
use crate::error::RuleViolation;
use crate::model::grant::GrantStatus;
use crate::model::policy::{NewPolicy, Policy};
use crate::repository::{VacationStore, VacationTx};
use crate::vacation::ledger::normalize_amount;
use crate::vacation::rules::validate_new_policy;

impl<S: VacationStore, D: Directory> VacationEngine<S, D> {
    #[instrument(skip(self, new), fields(name = %new.name, method = %new.grant_method))]
    pub async fn create_policy(&self, new: NewPolicy, now: NaiveDateTime) -> EngineResult<Policy> {
        validate_new_policy(&new)?;
        let mut policy = new.into_policy(now);
        policy.grant_amount = policy.grant_amount.map(normalize_amount);

        let mut tx = self.store.begin().await?;
        policy.id = tx.insert_policy(&policy).await?;
        tx.commit().await?;

        info!(policy_id = policy.id, "Policy created");
        Ok(policy)
    }

    pub async fn get_policy(&self, policy_id: u64) -> EngineResult<Policy> {
        let mut tx = self.store.begin().await?;
        found(tx.get_policy(policy_id).await?, "policy", policy_id)
    }

    /// Policies that have not been deleted.
    pub async fn list_policies(&self) -> EngineResult<Vec<Policy>> {
        let mut tx = self.store.begin().await?;
        let mut policies = tx.list_policies().await?;
        policies.retain(|p| !p.deleted);
        Ok(policies)
    }

    /// Soft-deletes the policy and revokes its still-active grants.
    /// Returns how many grants were revoked.
    #[instrument(skip(self))]
    pub async fn delete_policy(&self, policy_id: u64) -> EngineResult<usize> {
        let mut tx = self.store.begin().await?;
        let policy = found(tx.get_policy(policy_id).await?, "policy", policy_id)?;
        if !policy.deletable {
            return Err(RuleViolation::PolicyNotDeletable.into());
        }
        if policy.deleted {
            return Err(RuleViolation::PolicyAlreadyDeleted.into());
        }
        tx.mark_policy_deleted(policy_id).await?;

        // exhausted grants stay ACTIVE with nothing left to revoke
        let mut revoked = 0;
        for mut grant in tx.active_grants_for_policy(policy_id).await? {
            if grant.remaining > Decimal::ZERO {
                grant.status = GrantStatus::Revoked;
                tx.update_grant(&grant).await?;
                revoked += 1;
            }
        }
        tx.commit().await?;

        info!(policy_id, revoked, "Policy deleted");
        Ok(revoked)
    }
}
