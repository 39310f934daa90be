//! Authoritative chat state: connections, usernames and group membership.
//!
//! [`ChatRoom`] is the plain state machine. [`Registry`] wraps it in a single
//! async mutex shared by every connection task, so each transition commits
//! completely before any other task observes the state. Broadcasts are queued
//! on the members' bounded outboxes inside the same critical section, so every
//! member sees group changes in commit order; the socket writes happen later
//! in each connection's writer task.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::{
    Mutex,
    mpsc::{self, error::TrySendError},
};

use crate::error::Conflict;
use crate::message::Response;

pub type ConnectionId = u64;

/// Responses a connection may have queued before broadcasts to it are dropped.
pub const OUTBOX_CAPACITY: usize = 128;

/// Outbound queue of a connection, drained by that connection's writer task.
pub type Outbox = mpsc::Sender<Response>;
pub type Inbox = mpsc::Receiver<Response>;

pub fn outbox_channel() -> (Outbox, Inbox) {
    mpsc::channel(OUTBOX_CAPACITY)
}

/// Outcome of queueing one broadcast response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The member's outbox is full; this response was dropped for it.
    Lagging,
    /// The member's writer has gone away.
    Closed,
}

#[derive(Debug, Clone)]
struct Session {
    username: String,
    group: String,
    outbox: Outbox,
}

impl Session {
    fn signed_in(&self) -> bool {
        !self.username.is_empty()
    }

    fn in_group(&self) -> bool {
        !self.group.is_empty()
    }
}

/// A group member captured for fan-out.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: ConnectionId,
    pub username: String,
    pub outbox: Outbox,
}

impl Member {
    /// Queues a response for this member without waiting for room.
    pub fn deliver(&self, response: Response) -> Delivery {
        match self.outbox.try_send(response) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Lagging,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// Snapshot of one group's members, ordered by connection id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Vec<Member>,
}

impl Roster {
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.iter().any(|member| member.id == id)
    }

    /// Comma-joined usernames, leaving out `exclude` when it is a member.
    pub fn names_excluding(&self, exclude: Option<ConnectionId>) -> String {
        self.members
            .iter()
            .filter(|member| Some(member.id) != exclude)
            .map(|member| member.username.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Default)]
pub struct ChatRoom {
    sessions: BTreeMap<ConnectionId, Session>,
    groups: BTreeMap<String, BTreeSet<ConnectionId>>,
}

impl ChatRoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh, signed-out session. Reconnecting an id resets it.
    pub fn connect(&mut self, id: ConnectionId, outbox: Outbox) {
        self.disconnect(id);
        self.sessions.insert(
            id,
            Session {
                username: String::new(),
                group: String::new(),
                outbox,
            },
        );
    }

    /// Purges the session and any membership still attached to it.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let Some(session) = self.sessions.remove(&id) else {
            return false;
        };
        if session.in_group() {
            self.remove_member(&session.group, id);
        }
        true
    }

    pub fn sign_in(&mut self, id: ConnectionId, username: &str) -> Result<String, Conflict> {
        let session = self.sessions.get(&id).ok_or(Conflict::UnknownConnection)?;
        if session.signed_in() {
            return Err(Conflict::AlreadySignedIn);
        }
        // Compared against every session, so an empty name always collides
        // with the caller's own signed-out session.
        if self.sessions.values().any(|other| other.username == username) {
            return Err(Conflict::UsernameCollision);
        }

        self.session_mut(id)?.username = username.to_string();
        Ok(format!("Sign in as {username}."))
    }

    pub fn sign_out(&mut self, id: ConnectionId) -> Result<String, Conflict> {
        let session = self.session_mut(id)?;
        if !session.signed_in() {
            return Err(Conflict::NotSignedIn);
        }
        if session.in_group() {
            return Err(Conflict::StillInGroup);
        }
        session.username.clear();
        Ok("Sign out successful.".to_string())
    }

    pub fn join(&mut self, id: ConnectionId, group: &str) -> Result<String, Conflict> {
        let session = self.session_mut(id)?;
        if !session.signed_in() {
            return Err(Conflict::NotSignedIn);
        }
        if session.in_group() {
            return Err(Conflict::AlreadyInGroup);
        }
        if group.is_empty() {
            return Err(Conflict::EmptyGroupName);
        }

        session.group = group.to_string();
        self.groups.entry(group.to_string()).or_default().insert(id);
        Ok(format!("Join group {group}."))
    }

    pub fn leave(&mut self, id: ConnectionId) -> Result<String, Conflict> {
        let session = self.session_mut(id)?;
        if !session.signed_in() {
            return Err(Conflict::NotSignedIn);
        }
        if !session.in_group() {
            return Err(Conflict::NotInGroup);
        }

        let group = std::mem::take(&mut session.group);
        self.remove_member(&group, id);
        Ok("Leave group successful.".to_string())
    }

    /// Checks that `id` may chat. The chat body itself is composed by the caller.
    pub fn send(&self, id: ConnectionId) -> Result<String, Conflict> {
        let session = self.sessions.get(&id).ok_or(Conflict::UnknownConnection)?;
        if !session.signed_in() {
            return Err(Conflict::NotSignedIn);
        }
        if !session.in_group() {
            return Err(Conflict::NotInGroup);
        }
        Ok(String::new())
    }

    pub fn username_of(&self, id: ConnectionId) -> Option<&str> {
        self.sessions.get(&id).map(|session| session.username.as_str())
    }

    pub fn group_of(&self, id: ConnectionId) -> Option<&str> {
        self.sessions
            .get(&id)
            .filter(|session| session.in_group())
            .map(|session| session.group.as_str())
    }

    /// Members of the group `id` currently belongs to; empty when it has none.
    pub fn members_of(&self, id: ConnectionId) -> Roster {
        match self.group_of(id) {
            Some(group) => self.roster_of_group(group),
            None => Roster::default(),
        }
    }

    pub fn member_names_excluding(&self, id: ConnectionId, exclude: Option<ConnectionId>) -> String {
        self.members_of(id).names_excluding(exclude)
    }

    pub fn roster_of_group(&self, group: &str) -> Roster {
        let members = self
            .groups
            .get(group)
            .into_iter()
            .flatten()
            .filter_map(|id| {
                self.sessions.get(id).map(|session| Member {
                    id: *id,
                    username: session.username.clone(),
                    outbox: session.outbox.clone(),
                })
            })
            .collect();
        Roster { members }
    }

    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    fn session_mut(&mut self, id: ConnectionId) -> Result<&mut Session, Conflict> {
        self.sessions.get_mut(&id).ok_or(Conflict::UnknownConnection)
    }

    fn remove_member(&mut self, group: &str, id: ConnectionId) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(&id);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let mut seen = std::collections::HashSet::new();
        for session in self.sessions.values().filter(|s| s.signed_in()) {
            assert!(seen.insert(&session.username), "duplicate username {}", session.username);
        }

        for (id, session) in &self.sessions {
            let memberships: Vec<&String> = self
                .groups
                .iter()
                .filter(|(_, members)| members.contains(id))
                .map(|(name, _)| name)
                .collect();
            if session.in_group() {
                assert!(session.signed_in(), "connection {id} grouped while signed out");
                assert_eq!(memberships, vec![&session.group]);
            } else {
                assert!(memberships.is_empty(), "connection {id} in {memberships:?}");
            }
        }

        for (name, members) in &self.groups {
            assert!(!members.is_empty(), "empty group {name} kept");
            assert!(members.iter().all(|id| self.sessions.contains_key(id)));
        }
    }
}

/// Result of [`Registry::release`].
#[derive(Debug)]
pub struct Release {
    /// Members remaining in the group that was left.
    pub left: Result<Roster, Conflict>,
    pub signed_out: Result<(), Conflict>,
    /// Whether a session was still registered.
    pub removed: bool,
}

/// Shared, lock-guarded handle to the [`ChatRoom`].
///
/// Every method takes the lock once, so each call is one atomic transition.
/// Methods that feed a broadcast hand the audience to a `notify` callback
/// while that same lock is held. Callbacks must only queue responses.
#[derive(Clone, Default)]
pub struct Registry {
    room: Arc<Mutex<ChatRoom>>,
    next_id: Arc<AtomicU64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id for a newly accepted connection and connects it.
    pub async fn register(&self, outbox: Outbox) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.room.lock().await.connect(id, outbox);
        id
    }

    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        self.room.lock().await.disconnect(id)
    }

    pub async fn sign_in(&self, id: ConnectionId, username: &str) -> Result<String, Conflict> {
        self.room.lock().await.sign_in(id, username)
    }

    pub async fn sign_out(&self, id: ConnectionId) -> Result<String, Conflict> {
        self.room.lock().await.sign_out(id)
    }

    /// Joins `group`; `notify` gets the group's members including the joiner.
    pub async fn join<F>(
        &self,
        id: ConnectionId,
        group: &str,
        notify: F,
    ) -> Result<(String, Roster), Conflict>
    where
        F: FnOnce(&Roster),
    {
        let mut room = self.room.lock().await;
        let description = room.join(id, group)?;
        let roster = room.roster_of_group(group);
        notify(&roster);
        Ok((description, roster))
    }

    /// Leaves the current group; `notify` gets the members that remain in it.
    pub async fn leave<F>(&self, id: ConnectionId, notify: F) -> Result<(String, Roster), Conflict>
    where
        F: FnOnce(&Roster),
    {
        let mut room = self.room.lock().await;
        let group = room.group_of(id).map(str::to_string);
        let description = room.leave(id)?;
        let remaining = group
            .map(|group| room.roster_of_group(&group))
            .unwrap_or_default();
        notify(&remaining);
        Ok((description, remaining))
    }

    /// Authorizes a chat message; `notify` gets the sender's username and
    /// the audience.
    pub async fn send<F>(&self, id: ConnectionId, notify: F) -> Result<(String, Roster), Conflict>
    where
        F: FnOnce(&str, &Roster),
    {
        let room = self.room.lock().await;
        room.send(id)?;
        let username = room.username_of(id).unwrap_or_default().to_string();
        let roster = room.members_of(id);
        notify(&username, &roster);
        Ok((username, roster))
    }

    /// Implicit leave then sign-out for a departing connection, followed by
    /// removal of its session, all under one lock. Calling it again is a no-op.
    /// `notify` runs only when a group was left.
    pub async fn release<F>(&self, id: ConnectionId, notify: F) -> Release
    where
        F: FnOnce(&Roster),
    {
        let mut room = self.room.lock().await;
        let group = room.group_of(id).map(str::to_string);
        let left = room
            .leave(id)
            .map(|_| group.map(|group| room.roster_of_group(&group)).unwrap_or_default());
        if let Ok(remaining) = &left {
            notify(remaining);
        }
        let signed_out = room.sign_out(id).map(|_| ());
        let removed = room.disconnect(id);
        Release {
            left,
            signed_out,
            removed,
        }
    }

    pub async fn members_of(&self, id: ConnectionId) -> Roster {
        self.room.lock().await.members_of(id)
    }

    pub async fn member_names_excluding(
        &self,
        id: ConnectionId,
        exclude: Option<ConnectionId>,
    ) -> String {
        self.room.lock().await.member_names_excluding(id, exclude)
    }

    pub async fn username_of(&self, id: ConnectionId) -> Option<String> {
        self.room.lock().await.username_of(id).map(str::to_string)
    }

    pub async fn connection_count(&self) -> usize {
        self.room.lock().await.connection_count()
    }

    pub async fn group_names(&self) -> Vec<String> {
        self.room.lock().await.group_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Status;
    use proptest::prelude::*;

    fn outbox() -> (Outbox, Inbox) {
        outbox_channel()
    }

    fn quiet(_: &Roster) {}

    fn room_with(ids: &[ConnectionId]) -> ChatRoom {
        let mut room = ChatRoom::new();
        for id in ids {
            room.connect(*id, outbox().0);
        }
        room
    }

    #[test]
    fn sign_in_rejects_username_collision() {
        let mut room = room_with(&[1, 2]);
        assert_eq!(room.sign_in(1, "alice"), Ok("Sign in as alice.".into()));
        assert_eq!(room.sign_in(2, "alice"), Err(Conflict::UsernameCollision));
        assert_eq!(room.sign_in(2, "Alice"), Ok("Sign in as Alice.".into()));
    }

    #[test]
    fn sign_in_rejects_unknown_and_repeated() {
        let mut room = room_with(&[1]);
        assert_eq!(room.sign_in(9, "alice"), Err(Conflict::UnknownConnection));
        room.sign_in(1, "alice").unwrap();
        assert_eq!(room.sign_in(1, "bob"), Err(Conflict::AlreadySignedIn));
    }

    #[test]
    fn empty_username_is_refused() {
        let mut room = room_with(&[1]);
        assert_eq!(room.sign_in(1, ""), Err(Conflict::UsernameCollision));
        assert_eq!(room.username_of(1), Some(""));
    }

    #[test]
    fn sign_out_requires_leaving_group_first() {
        let mut room = room_with(&[1]);
        assert_eq!(room.sign_out(1), Err(Conflict::NotSignedIn));
        room.sign_in(1, "alice").unwrap();
        room.join(1, "g1").unwrap();
        assert_eq!(room.sign_out(1), Err(Conflict::StillInGroup));
        room.leave(1).unwrap();
        assert_eq!(room.sign_out(1), Ok("Sign out successful.".into()));
        // The name is free again.
        assert_eq!(room.sign_in(1, "alice"), Ok("Sign in as alice.".into()));
    }

    #[test]
    fn join_requires_sign_in_and_single_group() {
        let mut room = room_with(&[1]);
        assert_eq!(room.join(1, "g1"), Err(Conflict::NotSignedIn));
        room.sign_in(1, "alice").unwrap();
        assert_eq!(room.join(1, ""), Err(Conflict::EmptyGroupName));
        assert_eq!(room.join(1, "g1"), Ok("Join group g1.".into()));
        assert_eq!(room.join(1, "g2"), Err(Conflict::AlreadyInGroup));
        assert_eq!(room.group_names(), vec!["g1".to_string()]);
    }

    #[test]
    fn last_leave_deletes_group() {
        let mut room = room_with(&[1, 2]);
        room.sign_in(1, "alice").unwrap();
        room.sign_in(2, "bob").unwrap();
        room.join(1, "g1").unwrap();
        room.join(2, "g1").unwrap();

        room.leave(1).unwrap();
        assert_eq!(room.member_names_excluding(2, None), "bob");
        room.leave(2).unwrap();
        assert!(room.group_names().is_empty());
        assert_eq!(room.leave(2), Err(Conflict::NotInGroup));
        room.assert_consistent();
    }

    #[test]
    fn send_requires_group() {
        let mut room = room_with(&[1]);
        assert_eq!(room.send(1), Err(Conflict::NotSignedIn));
        room.sign_in(1, "alice").unwrap();
        assert_eq!(room.send(1), Err(Conflict::NotInGroup));
        room.join(1, "g1").unwrap();
        assert_eq!(room.send(1), Ok(String::new()));
    }

    #[test]
    fn member_names_skip_excluded_connection() {
        let mut room = room_with(&[1, 2, 3]);
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            room.sign_in(id, name).unwrap();
            room.join(id, "g1").unwrap();
        }
        assert_eq!(room.member_names_excluding(1, None), "alice,bob,carol");
        assert_eq!(room.member_names_excluding(1, Some(2)), "alice,carol");
        assert_eq!(room.member_names_excluding(1, Some(42)), "alice,bob,carol");
    }

    #[test]
    fn members_of_ungrouped_connection_is_empty() {
        let room = room_with(&[1]);
        assert!(room.members_of(1).is_empty());
        assert!(room.members_of(7).is_empty());
    }

    #[test]
    fn disconnect_purges_membership() {
        let mut room = room_with(&[1, 2]);
        room.sign_in(1, "alice").unwrap();
        room.sign_in(2, "bob").unwrap();
        room.join(1, "g1").unwrap();
        room.join(2, "g1").unwrap();

        assert!(room.disconnect(1));
        assert!(!room.disconnect(1));
        assert_eq!(room.member_names_excluding(2, None), "bob");
        assert_eq!(room.sign_in(1, "alice"), Err(Conflict::UnknownConnection));
        room.assert_consistent();
    }

    #[test]
    fn cleanup_path_is_idempotent() {
        let mut room = room_with(&[1]);
        room.sign_in(1, "alice").unwrap();
        room.join(1, "g1").unwrap();

        assert!(room.leave(1).is_ok());
        assert!(room.sign_out(1).is_ok());
        assert_eq!(room.leave(1), Err(Conflict::NotSignedIn));
        assert_eq!(room.sign_out(1), Err(Conflict::NotSignedIn));
        room.assert_consistent();
    }

    #[tokio::test]
    async fn registry_join_returns_roster_with_joiner() {
        let registry = Registry::new();
        let alice = registry.register(outbox().0).await;
        let bob = registry.register(outbox().0).await;
        registry.sign_in(alice, "alice").await.unwrap();
        registry.sign_in(bob, "bob").await.unwrap();

        let (_, roster) = registry.join(alice, "g1", quiet).await.unwrap();
        assert_eq!(roster.names_excluding(None), "alice");
        let (_, roster) = registry.join(bob, "g1", quiet).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.names_excluding(Some(alice)), "bob");
        assert_eq!(roster.names_excluding(Some(bob)), "alice");
    }

    #[tokio::test]
    async fn registry_leave_returns_remaining_members() {
        let registry = Registry::new();
        let alice = registry.register(outbox().0).await;
        let bob = registry.register(outbox().0).await;
        registry.sign_in(alice, "alice").await.unwrap();
        registry.sign_in(bob, "bob").await.unwrap();
        registry.join(alice, "g1", quiet).await.unwrap();
        registry.join(bob, "g1", quiet).await.unwrap();

        let (description, remaining) = registry.leave(alice, quiet).await.unwrap();
        assert_eq!(description, "Leave group successful.");
        assert!(!remaining.contains(alice));
        assert!(remaining.contains(bob));

        let (_, remaining) = registry.leave(bob, quiet).await.unwrap();
        assert!(remaining.is_empty());
        assert!(registry.group_names().await.is_empty());
    }

    #[tokio::test]
    async fn release_is_atomic_and_repeatable() {
        let registry = Registry::new();
        let alice = registry.register(outbox().0).await;
        let bob = registry.register(outbox().0).await;
        registry.sign_in(alice, "alice").await.unwrap();
        registry.sign_in(bob, "bob").await.unwrap();
        registry.join(alice, "g1", quiet).await.unwrap();
        registry.join(bob, "g1", quiet).await.unwrap();

        let first = registry.release(alice, quiet).await;
        let remaining = first.left.unwrap();
        assert_eq!(remaining.names_excluding(None), "bob");
        assert_eq!(first.signed_out, Ok(()));
        assert!(first.removed);

        let second = registry.release(alice, quiet).await;
        assert_eq!(second.left.unwrap_err(), Conflict::UnknownConnection);
        assert_eq!(second.signed_out, Err(Conflict::UnknownConnection));
        assert!(!second.removed);
        assert_eq!(registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn notify_runs_only_for_committed_transitions() {
        let registry = Registry::new();
        let alice = registry.register(outbox().0).await;
        let mut calls = 0;

        assert!(registry.join(alice, "g1", |_| calls += 1).await.is_err());
        assert!(registry.send(alice, |_, _| calls += 1).await.is_err());
        registry.sign_in(alice, "alice").await.unwrap();
        registry
            .join(alice, "g1", |roster| {
                calls += 1;
                assert_eq!(roster.names_excluding(None), "alice");
            })
            .await
            .unwrap();
        registry
            .send(alice, |username, roster| {
                calls += 1;
                assert_eq!(username, "alice");
                assert!(roster.contains(alice));
            })
            .await
            .unwrap();
        assert_eq!(calls, 2);

        let release = registry.release(alice, |remaining| {
            calls += 1;
            assert!(remaining.is_empty());
        });
        assert!(release.await.removed);
        assert!(!registry.release(alice, |_| calls += 1).await.removed);
        assert_eq!(calls, 3);
    }

    #[test]
    fn full_outbox_reports_lagging_member() {
        let (outbox, mut inbox) = outbox();
        let member = Member {
            id: 1,
            username: "alice".into(),
            outbox,
        };
        for _ in 0..OUTBOX_CAPACITY {
            assert_eq!(member.deliver(Response::new(Status::Chat, "x")), Delivery::Queued);
        }
        assert_eq!(member.deliver(Response::new(Status::Chat, "y")), Delivery::Lagging);

        assert!(inbox.try_recv().is_ok());
        assert_eq!(member.deliver(Response::new(Status::Chat, "z")), Delivery::Queued);
        drop(inbox);
        assert_eq!(member.deliver(Response::new(Status::Chat, "z")), Delivery::Closed);
    }

    #[tokio::test]
    async fn concurrent_sign_ins_admit_one_owner_per_name() {
        let registry = Registry::new();
        let mut ids = Vec::new();
        for _ in 0..32 {
            ids.push(registry.register(outbox().0).await);
        }

        let tasks: Vec<_> = ids
            .iter()
            .map(|id| {
                let registry = registry.clone();
                let id = *id;
                tokio::spawn(async move { registry.sign_in(id, "alice").await.is_ok() })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        SignIn(ConnectionId, &'static str),
        SignOut(ConnectionId),
        Join(ConnectionId, &'static str),
        Leave(ConnectionId),
        Disconnect(ConnectionId),
        Connect(ConnectionId),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        let id = 1u64..5;
        let name = proptest::sample::select(vec!["alice", "bob", "carol", ""]);
        let group = proptest::sample::select(vec!["g1", "g2", ""]);
        prop_oneof![
            (id.clone(), name).prop_map(|(id, name)| Op::SignIn(id, name)),
            id.clone().prop_map(Op::SignOut),
            (id.clone(), group).prop_map(|(id, group)| Op::Join(id, group)),
            id.clone().prop_map(Op::Leave),
            id.clone().prop_map(Op::Disconnect),
            id.prop_map(Op::Connect),
        ]
    }

    proptest! {
        #[test]
        fn any_operation_sequence_keeps_registry_consistent(
            ops in proptest::collection::vec(arb_op(), 0..64),
        ) {
            let mut room = room_with(&[1, 2, 3, 4]);
            for op in ops {
                match op {
                    Op::SignIn(id, name) => { let _ = room.sign_in(id, name); }
                    Op::SignOut(id) => { let _ = room.sign_out(id); }
                    Op::Join(id, group) => { let _ = room.join(id, group); }
                    Op::Leave(id) => { let _ = room.leave(id); }
                    Op::Disconnect(id) => { room.disconnect(id); }
                    Op::Connect(id) => room.connect(id, outbox().0),
                }
                room.assert_consistent();
            }
        }
    }
}
