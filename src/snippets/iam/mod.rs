//! IAM snippets: roles, service accounts and keys, project allow policy,
//! and v2 deny policies.

pub mod deny;
pub mod keys;
pub mod models;
pub mod policy;
pub mod roles;
pub mod service_accounts;

pub use deny::*;
pub use keys::*;
pub use policy::*;
pub use roles::*;
pub use service_accounts::*;
