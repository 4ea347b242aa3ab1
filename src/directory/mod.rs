//! Data the engine needs from the surrounding HR platform: user working
//! hours and country, holiday calendars and the department-head chain.

mod cached;
#[cfg(test)]
pub mod fixed;
mod mysql;

pub use cached::CachedDirectory;
pub use mysql::MySqlDirectory;

use chrono::NaiveDate;

use crate::error::VacationError;
use crate::model::directory::{ApproverCandidate, Holiday, UserProfile};

#[allow(async_fn_in_trait)]
pub trait Directory {
    /// Fails with not-found for unknown or deleted users.
    async fn get_user(&self, user_id: u64) -> Result<UserProfile, VacationError>;

    /// Holidays of every kind dated within `[start, end]`.
    async fn list_holidays(
        &self,
        country_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Holiday>, VacationError>;

    /// Heads of the user's department and its ancestors, most local first.
    async fn approver_chain(&self, user_id: u64) -> Result<Vec<ApproverCandidate>, VacationError>;
}
