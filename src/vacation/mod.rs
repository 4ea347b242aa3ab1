//! Pure rules of the vacation engine. Nothing in here touches storage or
//! reads the clock; "now" is always passed in.

pub mod calendar;
pub mod ledger;
pub mod recurrence;
pub mod rules;
pub mod stats;
pub mod workflow;
