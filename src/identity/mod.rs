//! Session identity, local credential persistence and route authorization.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod credential;
mod token_store;
mod session;
mod authorizer;

pub use principal::{Identity, RoleFlags};
pub use credential::Credential;
pub use token_store::{
    FileStorage, MemoryStorage, StorageBackend, StoredSession, TokenStore,
    ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY,
};
pub use session::{BearerGrant, SessionManager, SessionPhase, SessionStatus};
pub use authorizer::{AccessGate, Decision, Requirement, Route};
