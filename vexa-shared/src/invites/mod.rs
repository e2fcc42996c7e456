/// Team invitations with single-use, expiring codes
///
/// An invitation is stored under a random UUID together with the SHA-256
/// digest of an 8-character code. The plaintext code only ever leaves the
/// server inside the accept link handed to the inviter. Redeeming needs both
/// the ID and the code; a correct code consumes the invitation, a wrong code
/// leaves it in place.
///
/// # Backends
///
/// - [`MemoryInviteStore`]: process-local map, for development and tests
/// - [`RedisInviteStore`]: `SET EX` with the TTL, shared between API instances
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vexa_shared::invites::{Invitations, MemoryInviteStore};
/// use vexa_shared::models::team_member::TeamRole;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let invitations = Invitations::new(Arc::new(MemoryInviteStore::new()), 86_400);
///
/// let issued = invitations.issue(1, 42, TeamRole::Member).await?;
/// let accepted = invitations.redeem(issued.invite_id, &issued.code).await?;
/// assert_eq!(accepted.user_id, 42);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::team_member::TeamRole;

mod memory;
mod redis_store;

pub use self::memory::MemoryInviteStore;
pub use self::redis_store::{RedisConfig, RedisInviteStore, DEFAULT_COMMAND_TIMEOUT_SECS};

/// Length of the plaintext invitation code
pub const CODE_LENGTH: usize = 8;

/// Letters, digits and URL-safe specials
const CODE_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.~";

/// Invitation errors
#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    /// Unknown, expired or already used
    #[error("Invitation not found or expired")]
    NotFound,

    /// The code does not match; the invitation is kept
    #[error("Invalid invitation code")]
    InvalidCode,

    #[error("Invitation store error: {0}")]
    Backend(String),

    #[error("Invitation encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A stored, not yet accepted invitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvite {
    pub team_id: i32,
    pub user_id: i32,
    pub role: TeamRole,

    /// Hex SHA-256 of the code
    pub code_hash: String,

    pub expires_at: DateTime<Utc>,
}

impl PendingInvite {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// What the inviter receives after issuing an invitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedInvite {
    pub invite_id: Uuid,

    /// Plaintext code; not recoverable from the store
    pub code: String,

    pub expires_at: DateTime<Utc>,
}

/// Keyed storage for pending invitations
///
/// Implementations must never return an entry past its `expires_at`, and
/// `remove` must report `true` to exactly one caller per entry.
#[async_trait]
pub trait InviteStore: Send + Sync {
    async fn put(&self, id: Uuid, invite: &PendingInvite) -> Result<(), InviteError>;

    async fn get(&self, id: Uuid) -> Result<Option<PendingInvite>, InviteError>;

    async fn remove(&self, id: Uuid) -> Result<bool, InviteError>;
}

/// Issues and redeems invitations on top of an [`InviteStore`]
#[derive(Clone)]
pub struct Invitations {
    store: Arc<dyn InviteStore>,
    ttl_secs: i64,
}

impl Invitations {
    pub fn new(store: Arc<dyn InviteStore>, ttl_secs: i64) -> Self {
        Self { store, ttl_secs }
    }

    /// Creates a pending invitation and returns its ID and plaintext code
    pub async fn issue(
        &self,
        team_id: i32,
        user_id: i32,
        role: TeamRole,
    ) -> Result<IssuedInvite, InviteError> {
        let invite_id = Uuid::new_v4();
        let code = generate_code();
        let expires_at = Utc::now() + Duration::seconds(self.ttl_secs);

        let pending = PendingInvite {
            team_id,
            user_id,
            role,
            code_hash: hash_code(&code),
            expires_at,
        };
        self.store.put(invite_id, &pending).await?;

        tracing::info!(%invite_id, team_id, user_id, role = %role, "Issued team invitation");

        Ok(IssuedInvite {
            invite_id,
            code,
            expires_at,
        })
    }

    /// Verifies `code` and consumes the invitation
    ///
    /// # Errors
    ///
    /// - `InviteError::NotFound` if the invitation is unknown, expired or was
    ///   consumed concurrently
    /// - `InviteError::InvalidCode` if the code does not match (the invitation
    ///   stays redeemable)
    pub async fn redeem(&self, invite_id: Uuid, code: &str) -> Result<PendingInvite, InviteError> {
        let pending = self
            .store
            .get(invite_id)
            .await?
            .filter(|p| !p.is_expired(Utc::now()))
            .ok_or(InviteError::NotFound)?;

        if hash_code(code) != pending.code_hash {
            tracing::warn!(%invite_id, "Invitation code mismatch");
            return Err(InviteError::InvalidCode);
        }

        if !self.store.remove(invite_id).await? {
            return Err(InviteError::NotFound);
        }

        Ok(pending)
    }

    /// Puts back an invitation that was redeemed but could not be applied
    pub async fn restore(&self, invite_id: Uuid, pending: &PendingInvite) -> Result<(), InviteError> {
        self.store.put(invite_id, pending).await
    }
}

/// Generates a random invitation code of [`CODE_LENGTH`] characters
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();

    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Hex-encoded SHA-256 digest of a code
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitations(ttl_secs: i64) -> Invitations {
        Invitations::new(Arc::new(MemoryInviteStore::new()), ttl_secs)
    }

    #[test]
    fn test_generate_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.bytes().all(|b| CODE_CHARSET.contains(&b)));
        assert_ne!(generate_code(), generate_code());
    }

    #[test]
    fn test_hash_code_is_sha256_hex() {
        let hash = hash_code("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_issue_and_redeem() {
        let invitations = invitations(3600);
        let issued = invitations.issue(3, 9, TeamRole::Editor).await.unwrap();

        let pending = invitations.redeem(issued.invite_id, &issued.code).await.unwrap();
        assert_eq!(pending.team_id, 3);
        assert_eq!(pending.user_id, 9);
        assert_eq!(pending.role, TeamRole::Editor);
        assert_eq!(pending.code_hash, hash_code(&issued.code));
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let invitations = invitations(3600);
        let issued = invitations.issue(1, 2, TeamRole::Member).await.unwrap();

        invitations.redeem(issued.invite_id, &issued.code).await.unwrap();
        let second = invitations.redeem(issued.invite_id, &issued.code).await;
        assert!(matches!(second, Err(InviteError::NotFound)));
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_invitation() {
        let invitations = invitations(3600);
        let issued = invitations.issue(1, 2, TeamRole::Member).await.unwrap();

        let wrong = invitations.redeem(issued.invite_id, "nottheone").await;
        assert!(matches!(wrong, Err(InviteError::InvalidCode)));

        assert!(invitations.redeem(issued.invite_id, &issued.code).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_invitation_not_redeemable() {
        let invitations = invitations(0);
        let issued = invitations.issue(1, 2, TeamRole::Member).await.unwrap();

        let result = invitations.redeem(issued.invite_id, &issued.code).await;
        assert!(matches!(result, Err(InviteError::NotFound)));
    }

    #[tokio::test]
    async fn test_invitations_are_independent() {
        let invitations = invitations(3600);
        let first = invitations.issue(1, 2, TeamRole::Member).await.unwrap();
        let second = invitations.issue(1, 3, TeamRole::Viewer).await.unwrap();

        // Codes are bound to their own invitation
        let crossed = invitations.redeem(second.invite_id, &first.code).await;
        assert!(matches!(crossed, Err(InviteError::InvalidCode)));

        assert_eq!(
            invitations.redeem(first.invite_id, &first.code).await.unwrap().user_id,
            2
        );
        assert_eq!(
            invitations.redeem(second.invite_id, &second.code).await.unwrap().user_id,
            3
        );
    }

    #[tokio::test]
    async fn test_restore_makes_invitation_redeemable_again() {
        let invitations = invitations(3600);
        let issued = invitations.issue(1, 2, TeamRole::Member).await.unwrap();

        let pending = invitations.redeem(issued.invite_id, &issued.code).await.unwrap();
        invitations.restore(issued.invite_id, &pending).await.unwrap();

        assert!(invitations.redeem(issued.invite_id, &issued.code).await.is_ok());
    }
}
