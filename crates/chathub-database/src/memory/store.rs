//! DashMap-backed implementation of every store trait.
//!
//! Per-key updates go through `get_mut`, which holds the shard lock for
//! the duration of the check and the write. That gives the call and
//! message transitions the same compare-and-set behaviour as the
//! conditional `UPDATE` statements in the PostgreSQL repositories.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use tracing::debug;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, DeviceId, GroupId, MessageId, UserId};
use chathub_entity::call::{CallSession, CallTransition};
use chathub_entity::device::Device;
use chathub_entity::group::{Group, GroupMembership};
use chathub_entity::message::{Message, MessageStatus, NewMessage};

use crate::store::{CallStore, DeviceStore, DirectoryStore, GroupStore, MessageStore};

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, String>,
    contacts: DashMap<UserId, Vec<UserId>>,
    groups: DashMap<GroupId, Group>,
    memberships: DashMap<(GroupId, UserId), GroupMembership>,
    messages: DashMap<MessageId, Message>,
    group_receipts: DashMap<(MessageId, UserId), MessageStatus>,
    calls: DashMap<CallId, CallSession>,
    devices: DashMap<DeviceId, Device>,
    fail_writes: AtomicBool,
    failing_calls: DashSet<CallId>,
    call_creation: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return its id.
    pub fn add_user(&self, username: &str) -> UserId {
        let id = UserId::new();
        self.users.insert(id, username.to_string());
        id
    }

    /// Username of a registered user.
    pub fn username(&self, user_id: UserId) -> Option<String> {
        self.users.get(&user_id).map(|u| u.value().clone())
    }

    /// Put `a` and `b` in each other's contact lists.
    pub fn add_contacts(&self, a: UserId, b: UserId) {
        for (owner, contact) in [(a, b), (b, a)] {
            let mut list = self.contacts.entry(owner).or_default();
            if !list.contains(&contact) {
                list.push(contact);
            }
        }
    }

    /// Create a group whose initial members are `members`.
    pub fn create_group(&self, name: &str, created_by: UserId, members: &[UserId]) -> GroupId {
        let now = Utc::now();
        let id = GroupId::new();
        self.groups.insert(
            id,
            Group {
                id,
                name: name.to_string(),
                created_by,
                last_message_at: None,
                created_at: now,
            },
        );
        for member in members {
            self.memberships
                .insert((id, *member), GroupMembership::joined(id, *member, now));
        }
        id
    }

    /// Register an active push device for the user.
    pub fn add_device(&self, user_id: UserId, push_token: &str) -> DeviceId {
        let id = DeviceId::new();
        self.devices.insert(
            id,
            Device {
                id,
                user_id,
                push_token: push_token.to_string(),
                platform: "test".to_string(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Make every subsequent write fail with a persistence error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make transitions of one call session fail with a persistence error.
    pub fn fail_call_transitions(&self, call_id: CallId) {
        self.failing_calls.insert(call_id);
    }

    /// Snapshot of all stored messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        let mut all: Vec<Message> = self.messages.iter().map(|m| m.value().clone()).collect();
        all.sort_by_key(|m| (m.created_at, m.id));
        all
    }

    /// Insert a session as-is, bypassing the state machine.
    pub fn insert_call(&self, session: CallSession) {
        self.calls.insert(session.id, session);
    }

    fn check_write(&self, what: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::persistence(format!("Failed to {what}: store unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, new: NewMessage) -> AppResult<Message> {
        self.check_write("create message")?;
        let message = Message::from_new(new, Utc::now());
        self.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> AppResult<Option<Message>> {
        Ok(self.messages.get(&id).map(|m| m.value().clone()))
    }

    async fn advance_status(
        &self,
        id: MessageId,
        next: MessageStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Message>> {
        self.check_write("update message status")?;
        let Some(mut message) = self.messages.get_mut(&id) else {
            return Ok(None);
        };
        if !message.status.can_advance_to(next) {
            return Ok(None);
        }
        message.status = next;
        message.delivered_at.get_or_insert(at);
        if next == MessageStatus::Read {
            message.read_at = Some(at);
        }
        Ok(Some(message.clone()))
    }

    async fn deliver_conversation(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        self.check_write("mark conversation delivered")?;
        let mut changed = Vec::new();
        for mut message in self.messages.iter_mut() {
            if message.sender_id == sender_id
                && message.recipient_id == Some(recipient_id)
                && message.status == MessageStatus::Sent
            {
                message.status = MessageStatus::Delivered;
                message.delivered_at = Some(at);
                changed.push(message.clone());
            }
        }
        changed.sort_by_key(|m| (m.created_at, m.id));
        debug!(count = changed.len(), "Conversation marked delivered");
        Ok(changed)
    }

    async fn record_group_receipt(
        &self,
        message_id: MessageId,
        user_id: UserId,
        next: MessageStatus,
        _at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.check_write("record group receipt")?;
        let mut status = self
            .group_receipts
            .entry((message_id, user_id))
            .or_insert(MessageStatus::Sent);
        if !status.can_advance_to(next) {
            return Ok(false);
        }
        *status = next;
        Ok(true)
    }
}

#[async_trait]
impl CallStore for MemoryStore {
    async fn create_if_idle(&self, session: &CallSession) -> AppResult<CallSession> {
        self.check_write("create call")?;
        let _guard = self
            .call_creation
            .lock()
            .map_err(|_| AppError::internal("Call creation lock poisoned"))?;

        let busy = |user_id: UserId| {
            self.calls
                .iter()
                .any(|c| c.involves(user_id) && !c.status.is_terminal())
        };
        if busy(session.caller_id) {
            return Err(AppError::conflict("Caller is already in a call"));
        }
        if busy(session.recipient_id) {
            return Err(AppError::conflict("Recipient is busy"));
        }

        self.calls.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn find_by_id(&self, id: CallId) -> AppResult<Option<CallSession>> {
        Ok(self.calls.get(&id).map(|c| c.value().clone()))
    }

    async fn find_active_for_user(&self, user_id: UserId) -> AppResult<Option<CallSession>> {
        Ok(self
            .calls
            .iter()
            .filter(|c| c.involves(user_id) && !c.status.is_terminal())
            .max_by_key(|c| c.created_at)
            .map(|c| c.value().clone()))
    }

    async fn transition(
        &self,
        id: CallId,
        transition: &CallTransition,
    ) -> AppResult<Option<CallSession>> {
        self.check_write("transition call")?;
        if self.failing_calls.contains(&id) {
            return Err(AppError::persistence(format!("Failed to transition call {id}")));
        }
        let Some(mut session) = self.calls.get_mut(&id) else {
            return Ok(None);
        };
        if session.status != transition.from {
            return Ok(None);
        }
        session.apply(transition);
        Ok(Some(session.clone()))
    }

    async fn find_ringing_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<CallSession>> {
        Ok(self
            .calls
            .iter()
            .filter(|c| {
                c.status == chathub_entity::call::CallStatus::Calling && c.created_at < cutoff
            })
            .map(|c| c.value().clone())
            .collect())
    }

    async fn find_connected_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<CallSession>> {
        Ok(self
            .calls
            .iter()
            .filter(|c| {
                c.status == chathub_entity::call::CallStatus::Connected
                    && c.started_at.is_some_and(|s| s < cutoff)
            })
            .map(|c| c.value().clone())
            .collect())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn find_by_id(&self, id: GroupId) -> AppResult<Option<Group>> {
        Ok(self.groups.get(&id).map(|g| g.value().clone()))
    }

    async fn is_active_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<bool> {
        Ok(self
            .memberships
            .get(&(group_id, user_id))
            .is_some_and(|m| m.is_active))
    }

    async fn active_members(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        let mut members: Vec<UserId> = self
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id && m.is_active)
            .map(|m| m.user_id)
            .collect();
        members.sort();
        Ok(members)
    }

    async fn groups_of(&self, user_id: UserId) -> AppResult<Vec<GroupId>> {
        let mut groups: Vec<GroupId> = self
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active)
            .map(|m| m.group_id)
            .collect();
        groups.sort();
        Ok(groups)
    }

    async fn join(
        &self,
        group_id: GroupId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<GroupMembership> {
        self.check_write("join group")?;
        let mut membership = self
            .memberships
            .entry((group_id, user_id))
            .or_insert_with(|| GroupMembership::joined(group_id, user_id, at));
        if !membership.is_active {
            *membership = GroupMembership::joined(group_id, user_id, at);
        }
        Ok(membership.clone())
    }

    async fn leave(&self, group_id: GroupId, user_id: UserId, at: DateTime<Utc>) -> AppResult<bool> {
        self.check_write("leave group")?;
        match self.memberships.get_mut(&(group_id, user_id)) {
            Some(mut membership) if membership.is_active => {
                membership.is_active = false;
                membership.left_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_last_message_at(&self, group_id: GroupId, at: DateTime<Utc>) -> AppResult<()> {
        self.check_write("update last_message_at")?;
        if let Some(mut group) = self.groups.get_mut(&group_id) {
            if group.last_message_at.is_none_or(|prev| prev < at) {
                group.last_message_at = Some(at);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn user_exists(&self, user_id: UserId) -> AppResult<bool> {
        Ok(self.users.contains_key(&user_id))
    }

    async fn contacts_of(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        Ok(self
            .contacts
            .get(&user_id)
            .map(|c| c.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn active_push_tokens(&self, user_id: UserId) -> AppResult<Vec<String>> {
        Ok(self
            .devices
            .iter()
            .filter(|d| d.user_id == user_id && d.is_active)
            .map(|d| d.push_token.clone())
            .collect())
    }
}
