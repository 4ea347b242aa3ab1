pub mod approval;
pub mod directory;
pub mod grant;
pub mod plan;
pub mod policy;
pub mod role;
pub mod usage;
