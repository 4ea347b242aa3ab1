pub mod approval;
pub mod grant;
pub mod plan;
pub mod policy;
pub mod scheduler;
pub mod stats;
pub mod usage;

use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::directory::{CachedDirectory, MySqlDirectory};
use crate::repository::mysql::MySqlStore;
use crate::service::VacationEngine;

/// The engine as wired in production.
pub type Engine = VacationEngine<MySqlStore, CachedDirectory<MySqlDirectory>>;

/// Wall clock of the server; the engine itself never reads it.
pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Whose records to read; defaults to the caller. HR/Admin only for
    /// other users.
    #[schema(example = 1000)]
    pub user_id: Option<u64>,
}
