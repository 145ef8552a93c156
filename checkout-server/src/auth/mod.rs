//! Request identity: which store, and which shopper

pub mod actor;
pub mod tenant;

pub use actor::{Actor, Claims, Role, SESSION_HEADER, create_token, resolve_actor};
pub use tenant::{TENANT_HEADER, Tenant, resolve_tenant};
