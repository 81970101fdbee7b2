//! Store traits: the persistence collaborators of the realtime engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chathub_core::result::AppResult;
use chathub_core::types::{CallId, GroupId, MessageId, UserId};
use chathub_entity::call::{CallSession, CallTransition};
use chathub_entity::group::{Group, GroupMembership};
use chathub_entity::message::{Message, MessageStatus, NewMessage};

/// Message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persist a new message in `sent` state.
    async fn create(&self, new: NewMessage) -> AppResult<Message>;

    /// Find a message by id.
    async fn find_by_id(&self, id: MessageId) -> AppResult<Option<Message>>;

    /// Move a message's status forward to `next`.
    ///
    /// Returns the updated row, or `None` when the message was already at
    /// or past `next`. Never regresses.
    async fn advance_status(
        &self,
        id: MessageId,
        next: MessageStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Message>>;

    /// Mark every `sent` direct message from `sender_id` to `recipient_id`
    /// as delivered. Returns the rows that changed.
    async fn deliver_conversation(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>>;

    /// Move one member's receipt of a group message forward to `next`.
    ///
    /// Group messages keep a receipt per member instead of a single
    /// status. Returns `false` when the member's receipt was already at or
    /// past `next`.
    async fn record_group_receipt(
        &self,
        message_id: MessageId,
        user_id: UserId,
        next: MessageStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Call session persistence with compare-and-transition updates.
#[async_trait]
pub trait CallStore: Send + Sync + 'static {
    /// Persist a new session unless either participant already has an
    /// active one.
    ///
    /// The check and the insert are atomic with respect to other calls to
    /// this method. Fails with `Conflict` when the caller or the recipient
    /// is busy.
    async fn create_if_idle(&self, session: &CallSession) -> AppResult<CallSession>;

    /// Find a session by id.
    async fn find_by_id(&self, id: CallId) -> AppResult<Option<CallSession>>;

    /// A `calling` or `connected` session the user takes part in, if any.
    async fn find_active_for_user(&self, user_id: UserId) -> AppResult<Option<CallSession>>;

    /// Apply `transition` only while the session is in `transition.from`.
    ///
    /// Returns `None` when another transition got there first.
    async fn transition(
        &self,
        id: CallId,
        transition: &CallTransition,
    ) -> AppResult<Option<CallSession>>;

    /// Sessions still `calling` that were created before `cutoff`.
    async fn find_ringing_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<CallSession>>;

    /// Sessions `connected` whose `started_at` is before `cutoff`.
    async fn find_connected_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<CallSession>>;
}

/// Group and membership persistence. Never cached by callers.
#[async_trait]
pub trait GroupStore: Send + Sync + 'static {
    /// Find a group by id.
    async fn find_by_id(&self, id: GroupId) -> AppResult<Option<Group>>;

    /// Whether the user currently belongs to the group.
    async fn is_active_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool>;

    /// All current members of the group.
    async fn active_members(&self, group_id: GroupId) -> AppResult<Vec<UserId>>;

    /// Groups the user currently belongs to.
    async fn groups_of(&self, user_id: UserId) -> AppResult<Vec<GroupId>>;

    /// Activate (or re-activate) a membership.
    async fn join(
        &self,
        group_id: GroupId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<GroupMembership>;

    /// Deactivate a membership. Returns `false` if the user was not active.
    async fn leave(&self, group_id: GroupId, user_id: UserId, at: DateTime<Utc>) -> AppResult<bool>;

    /// Record the time of the latest group message.
    async fn touch_last_message_at(&self, group_id: GroupId, at: DateTime<Utc>) -> AppResult<()>;
}

/// Read-only view of users and their contact lists.
#[async_trait]
pub trait DirectoryStore: Send + Sync + 'static {
    /// Whether the user exists.
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool>;

    /// Users in `user_id`'s contact list.
    async fn contacts_of(&self, user_id: UserId) -> AppResult<Vec<UserId>>;
}

/// Push device registry.
#[async_trait]
pub trait DeviceStore: Send + Sync + 'static {
    /// Push tokens of the user's active devices.
    async fn active_push_tokens(&self, user_id: UserId) -> AppResult<Vec<String>>;
}

/// The full set of stores handed to the realtime engine.
#[derive(Clone)]
pub struct Stores {
    /// Messages.
    pub messages: Arc<dyn MessageStore>,
    /// Call sessions.
    pub calls: Arc<dyn CallStore>,
    /// Groups and memberships.
    pub groups: Arc<dyn GroupStore>,
    /// Users and contacts.
    pub directory: Arc<dyn DirectoryStore>,
    /// Push devices.
    pub devices: Arc<dyn DeviceStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish()
    }
}

impl Stores {
    /// Use one object for every store.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: MessageStore + CallStore + GroupStore + DirectoryStore + DeviceStore,
    {
        Self {
            messages: store.clone(),
            calls: store.clone(),
            groups: store.clone(),
            directory: store.clone(),
            devices: store,
        }
    }
}
