use chrono::NaiveDate;

use super::{found, EngineResult, VacationEngine};
use crate::directory::Directory;
use crate::model::approval::Approval;
use crate::model::grant::Grant;
use crate::model::usage::Usage;
use crate::repository::{VacationStore, VacationTx};
use crate::vacation::stats::{self, BalanceSummary, GrantHistory, UsageSummary};
use crate::vacation::workflow::actionable_for;

impl<S: VacationStore, D: Directory> VacationEngine<S, D> {
    pub async fn balance_summary(&self, user_id: u64, today: NaiveDate) -> EngineResult<Vec<BalanceSummary>> {
        let mut tx = self.store.begin().await?;
        let grants = tx.grants_for_user(user_id).await?;
        Ok(stats::balance_summary(&grants, today))
    }

    pub async fn usage_summary(&self, user_id: u64, year: i32) -> EngineResult<Vec<UsageSummary>> {
        let mut tx = self.store.begin().await?;
        let usages = tx.usages_for_user(user_id).await?;
        Ok(stats::usage_summary(&usages, year))
    }

    pub async fn grant_history(&self, grant_id: u64) -> EngineResult<GrantHistory> {
        let mut tx = self.store.begin().await?;
        let grant = found(tx.read_grant(grant_id).await?, "grant", grant_id)?;
        let deductions = tx.deductions_for_grant(grant_id).await?;
        Ok(GrantHistory { grant, deductions })
    }

    /// Approvals waiting on `approver_id` whose turn has come.
    pub async fn pending_approvals(&self, approver_id: u64) -> EngineResult<Vec<Approval>> {
        let mut tx = self.store.begin().await?;
        let mut actionable = Vec::new();
        for pending in tx.pending_approvals_for(approver_id).await? {
            let undecided = tx
                .read_grant(pending.grant_id)
                .await?
                .is_some_and(|g| g.status.is_undecided());
            if !undecided {
                continue;
            }
            let chain = tx.read_approvals_for_grant(pending.grant_id).await?;
            if actionable_for(&chain, approver_id).iter().any(|a| a.id == pending.id) {
                actionable.push(pending);
            }
        }
        Ok(actionable)
    }

    pub async fn list_grants(&self, user_id: u64) -> EngineResult<Vec<Grant>> {
        let mut tx = self.store.begin().await?;
        tx.grants_for_user(user_id).await
    }

    pub async fn get_grant(&self, grant_id: u64) -> EngineResult<Grant> {
        let mut tx = self.store.begin().await?;
        found(tx.read_grant(grant_id).await?, "grant", grant_id)
    }

    /// Active usages, newest first.
    pub async fn list_usages(&self, user_id: u64) -> EngineResult<Vec<Usage>> {
        let mut tx = self.store.begin().await?;
        tx.usages_for_user(user_id).await
    }

    pub async fn get_usage(&self, usage_id: u64) -> EngineResult<Usage> {
        let mut tx = self.store.begin().await?;
        found(tx.read_usage(usage_id).await?, "usage", usage_id)
    }

    pub async fn approvals_for_grant(&self, grant_id: u64) -> EngineResult<Vec<Approval>> {
        let mut tx = self.store.begin().await?;
        found(tx.read_grant(grant_id).await?, "grant", grant_id)?;
        tx.read_approvals_for_grant(grant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::usage::{UsageUnit, UseVacation};
    use crate::repository::memory::RowLock;
    use crate::service::testkit::{at, date, engine, manual_grant, manual_policy};
    use rust_decimal_macros::dec;

    #[actix_web::test]
    async fn history_drops_cancelled_usages() {
        let (engine, _) = engine();
        let now = at(date(2025, 1, 2), 9);
        let policy = engine.create_policy(manual_policy("ANNUAL", None), now).await.unwrap();
        let grant = manual_grant(&engine, 1, policy.id, dec!(10), date(2025, 12, 31), now).await;

        let mut ids = Vec::new();
        for day in [2, 3] {
            let receipt = engine
                .use_vacation(
                    UseVacation {
                        user_id: 1,
                        leave_type: "ANNUAL".into(),
                        unit: UsageUnit::Day,
                        start_at: at(date(2025, 6, day), 9),
                        end_at: at(date(2025, 6, day), 18),
                        description: String::new(),
                    },
                    now,
                )
                .await
                .unwrap();
            ids.push(receipt.usage.id);
        }
        engine.cancel_vacation_usage(ids[0], now).await.unwrap();

        let history = engine.grant_history(grant.id).await.unwrap();
        assert_eq!(history.grant.remaining, dec!(9));
        assert_eq!(history.deductions.len(), 1);
        assert_eq!(history.deductions[0].usage_id, ids[1]);

        let usage = engine.usage_summary(1, 2025).await.unwrap();
        assert_eq!(usage[0].used, dec!(1));
        assert_eq!(usage[0].usage_count, 1);
        assert_eq!(engine.list_usages(1).await.unwrap().len(), 1);
        assert!(engine.get_usage(ids[0]).await.unwrap().deleted);
    }

    #[actix_web::test]
    async fn projections_take_no_row_locks() {
        let (engine, store) = engine();
        let now = at(date(2025, 1, 2), 9);
        let policy = engine.create_policy(manual_policy("ANNUAL", None), now).await.unwrap();
        let grant = manual_grant(&engine, 1, policy.id, dec!(5), date(2025, 12, 31), now).await;
        let usage = UseVacation {
            user_id: 1,
            leave_type: "ANNUAL".into(),
            unit: UsageUnit::Day,
            start_at: at(date(2025, 6, 2), 9),
            end_at: at(date(2025, 6, 2), 18),
            description: String::new(),
        };
        let usage_id = engine.use_vacation(usage, now).await.unwrap().usage.id;
        store.take_locks().await;

        assert_eq!(engine.grant_history(grant.id).await.unwrap().deductions.len(), 1);
        assert_eq!(engine.get_grant(grant.id).await.unwrap().remaining, dec!(4));
        assert_eq!(engine.get_usage(usage_id).await.unwrap().id, usage_id);
        assert!(engine.approvals_for_grant(grant.id).await.unwrap().is_empty());
        assert!(engine.pending_approvals(2).await.unwrap().is_empty());
        assert!(store.take_locks().await.is_empty());

        engine.cancel_vacation_usage(usage_id, now).await.unwrap();
        assert_eq!(
            store.take_locks().await,
            vec![RowLock::Usage(usage_id), RowLock::Grant(grant.id)]
        );
    }
}
