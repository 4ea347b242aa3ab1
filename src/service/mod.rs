//! Transactional engine operations.
//!
//! Every public method opens one store transaction, performs all of its
//! reads and writes through it and commits once at the end. Any error
//! before the commit drops the transaction, so nothing it wrote survives.
//! "Now" and "today" are always passed in by the caller.

mod approval;
mod ledger;
mod plan;
mod policy;
mod scheduler;
mod stats;
#[cfg(test)]
pub(crate) mod testkit;

pub use approval::VacationRequestDetail;
pub use ledger::UsageReceipt;
pub use scheduler::SchedulerReport;

use crate::directory::Directory;
use crate::error::VacationError;
use crate::repository::VacationStore;

pub type EngineResult<T> = Result<T, VacationError>;

pub struct VacationEngine<S, D> {
    store: S,
    directory: D,
}

impl<S: VacationStore, D: Directory> VacationEngine<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }
}

/// Turns a missing row into a not-found error.
fn found<T>(row: Option<T>, entity: &'static str, id: impl ToString) -> EngineResult<T> {
    row.ok_or_else(|| VacationError::not_found(entity, id))
}
