//! Chat-platform adapter port.
//!
//! Everything the reconciler needs from the chat platform, and nothing
//! more. The concrete client library (gateway connection, rate limiting,
//! REST calls) lives behind this trait.

use async_trait::async_trait;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// PLATFORM VALUE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// A guild member as seen by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Platform user id.
    pub user_id: String,
    /// Whether the account is a bot. Bots are never verified.
    pub is_bot: bool,
    /// Role ids the member currently holds.
    pub role_ids: Vec<String>,
}

impl Member {
    /// Whether the member currently holds `role_id`.
    #[must_use]
    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|r| r == role_id)
    }
}

/// A guild role as seen by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Platform role id.
    pub id: String,
    /// Role display name.
    pub name: String,
    /// Role color.
    pub color: u32,
}

/// A presence snapshot for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Actively online.
    Online,
    /// Online but idle.
    Idle,
    /// Online with do-not-disturb set.
    DoNotDisturb,
    /// Offline.
    Offline,
    /// Online but invisible (reported as offline by most platforms).
    Invisible,
    /// The platform has no presence data for this member.
    Unknown,
}

impl Presence {
    /// Whether this presence counts as active for verification
    /// prioritization.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Online | Self::Idle | Self::DoNotDisturb)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLATFORM PORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Port for chat-platform roster reads and role mutations.
///
/// All mutations must be safe to repeat: adding a role a member already
/// holds and removing one they lack are both no-ops at the adapter.
#[async_trait]
pub trait GuildPlatform: Send + Sync {
    /// List members of a guild, up to `limit` (0 = adapter default).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform call fails.
    async fn list_members(&self, guild_id: &str, limit: usize) -> Result<Vec<Member>>;

    /// Get the role ids a single member holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the member cannot be fetched.
    async fn member_roles(&self, guild_id: &str, user_id: &str) -> Result<Vec<String>>;

    /// Get all roles defined in a guild.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform call fails.
    async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>>;

    /// Create a role. Not idempotent on name collisions — callers
    /// serialize by name via the lock manager and re-check with
    /// [`guild_roles`](Self::guild_roles) first.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    async fn create_role(&self, guild_id: &str, name: &str, color: u32) -> Result<Role>;

    /// Delete a role.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    async fn delete_role(&self, guild_id: &str, role_id: &str) -> Result<()>;

    /// Grant a role to a member. Granting an already-held role is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails.
    async fn add_member_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<()>;

    /// Revoke a role from a member. Revoking an unheld role is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails.
    async fn remove_member_role(&self, guild_id: &str, user_id: &str, role_id: &str)
        -> Result<()>;

    /// List the guild ids the bot account is a member of.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform call fails.
    async fn list_guilds(&self) -> Result<Vec<String>>;

    /// Read a presence snapshot for one member.
    ///
    /// Adapters return [`Presence::Unknown`] rather than an error when
    /// the platform simply has no data.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform call fails.
    async fn presence(&self, guild_id: &str, user_id: &str) -> Result<Presence>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
