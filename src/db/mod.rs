//! Database layer.
//!
//! `FirestoreDb` is the production store; `MemoryDb` backs local development
//! and tests. Every goal operation takes the owner explicitly so that no
//! lookup can be issued without the ownership filter.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Goal, Principal};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Principals, keyed by `{provider}:{subject_id}`
    pub const PRINCIPALS: &str = "principals";
    /// Goals, keyed by goal ID
    pub const GOALS: &str = "goals";
}

/// In-place edit applied by [`Database::update_goal_with`].
///
/// May run more than once when a concurrent writer forces a retry, so it must
/// only touch the goal it is handed.
pub type GoalMutation<'a> = &'a (dyn Fn(&mut Goal) -> Result<(), AppError> + Send + Sync);

/// Storage operations used by the identity subsystem and the goal handlers.
#[async_trait]
pub trait Database: Send + Sync {
    // ─── Principal Operations ────────────────────────────────────

    /// Look up a principal by provider identity.
    async fn find_principal(
        &self,
        provider: &str,
        subject_id: &str,
    ) -> Result<Option<Principal>, AppError>;

    /// Look up a principal by local ID.
    async fn get_principal(&self, principal_id: &str) -> Result<Option<Principal>, AppError>;

    /// Insert a principal if its `(provider, subject_id)` is unused.
    ///
    /// Returns `false` when another record already holds that identity.
    async fn create_principal(&self, principal: &Principal) -> Result<bool, AppError>;

    /// Overwrite an existing principal (same identity key, same ID).
    async fn update_principal(&self, principal: &Principal) -> Result<(), AppError>;

    // ─── Goal Operations ─────────────────────────────────────────

    async fn insert_goal(&self, goal: &Goal) -> Result<(), AppError>;

    /// Fetch a goal matching both `goal_id` and `owner_id`.
    async fn find_goal(&self, owner_id: &str, goal_id: &str) -> Result<Option<Goal>, AppError>;

    /// All goals owned by `owner_id`, newest first.
    async fn list_goals(&self, owner_id: &str) -> Result<Vec<Goal>, AppError>;

    /// Atomically load the goal matching both IDs, apply `mutate`, and store it.
    ///
    /// Returns `None` if no such goal exists. An error from `mutate` aborts
    /// without writing. Concurrent mutations of the same goal never overwrite
    /// each other, and a goal deleted meanwhile is not recreated.
    async fn update_goal_with(
        &self,
        owner_id: &str,
        goal_id: &str,
        mutate: GoalMutation<'_>,
    ) -> Result<Option<Goal>, AppError>;

    /// Delete a goal matching both IDs. Returns whether anything was deleted.
    async fn delete_goal(&self, owner_id: &str, goal_id: &str) -> Result<bool, AppError>;
}
