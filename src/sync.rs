//! Group task-list synchronization.
//!
//! A [`GroupHub`] holds the authoritative task list of every group and the
//! set of connected members. Replacing a group's list persists it and then
//! rebroadcasts it to every member, sender included.
//!
//! # Architecture
//!
//! ```text
//! client ── join / leave / replace ──► GroupHub ──► KeyValueStore
//!                                          │
//!                   tasks-updated ◄────────┴────► every member of the group
//! ```
//!
//! Each group sits behind its own mutex, so replacements for one group are
//! serialized (and broadcast in processing order) while different groups
//! proceed independently. Concurrent replacements are last-write-wins at
//! whole-list granularity.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::Task;
use crate::store::{self, KeyValueStore};

pub type ClientId = Uuid;

/// Frames a client sends over the sync channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinGroup {
        #[serde(rename = "groupId")]
        group_id: String,
    },
    LeaveGroup {
        #[serde(rename = "groupId")]
        group_id: String,
    },
    UpdateTasks {
        #[serde(rename = "groupId")]
        group_id: String,
        tasks: Vec<Task>,
    },
}

/// Frames the coordinator pushes to members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    TasksUpdated {
        #[serde(rename = "groupId")]
        group_id: String,
        tasks: Vec<Task>,
    },
}

/// Group ids are 1..=64 characters of `[A-Za-z0-9_-]`.
pub fn valid_group_id(id: &str) -> bool {
    store::valid_segment(id)
}

/// Sending half of one connected client.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ClientId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

#[derive(Debug, Default)]
struct Group {
    tasks: Vec<Task>,
    members: BTreeMap<ClientId, mpsc::UnboundedSender<ServerMessage>>,
}

impl Group {
    // Deliver to every member, dropping members whose connection is gone.
    fn broadcast(&mut self, group_id: &str) {
        let msg = ServerMessage::TasksUpdated {
            group_id: group_id.to_string(),
            tasks: self.tasks.clone(),
        };
        self.members.retain(|_, tx| tx.send(msg.clone()).is_ok());
    }
}

pub struct GroupHub {
    store: Arc<dyn KeyValueStore>,
    groups: RwLock<HashMap<String, Arc<Mutex<Group>>>>,
}

impl GroupHub {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection. Messages for it arrive on the returned receiver.
    pub fn connect(&self) -> (ClientHandle, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ClientHandle { id: Uuid::new_v4(), tx };
        tracing::debug!(client = %handle.id, "client connected");
        (handle, rx)
    }

    /// Add the client to the group and send it the current list (even if empty).
    /// A client whose connection is already gone is not added.
    pub fn join(&self, client: &ClientHandle, group_id: &str) {
        let group = self.group(group_id);
        let mut group = group.lock();

        let snapshot = ServerMessage::TasksUpdated {
            group_id: group_id.to_string(),
            tasks: group.tasks.clone(),
        };
        if client.tx.send(snapshot).is_err() {
            tracing::warn!(client = %client.id, group = group_id, "join from closed connection");
            return;
        }
        group.members.insert(client.id, client.tx.clone());
        tracing::info!(client = %client.id, group = group_id, members = group.members.len(), "joined group");
    }

    /// Remove the client from the group. The group's list is retained.
    pub fn leave(&self, client_id: ClientId, group_id: &str) {
        let Some(group) = self.groups.read().get(group_id).cloned() else {
            return;
        };
        let mut group = group.lock();
        if group.members.remove(&client_id).is_some() {
            tracing::info!(client = %client_id, group = group_id, members = group.members.len(), "left group");
        }
    }

    /// Replace the group's list wholesale, persist it, then broadcast it.
    /// Returns the list as committed.
    ///
    /// A failed write is logged; the in-memory list and the broadcast still
    /// go ahead since the sync channel has no error path back to clients.
    pub fn replace_tasks(&self, group_id: &str, tasks: Vec<Task>) -> Vec<Task> {
        let group = self.group(group_id);
        let mut group = group.lock();

        if let Err(e) = store::save_json(self.store.as_ref(), &store::group_key(group_id), &tasks) {
            tracing::error!(group = group_id, error = %e, "failed to persist group tasks");
        }
        group.tasks = tasks;
        group.broadcast(group_id);
        tracing::info!(
            group = group_id,
            tasks = group.tasks.len(),
            members = group.members.len(),
            "group tasks replaced"
        );
        group.tasks.clone()
    }

    /// Current authoritative list of a group. Groups not held in memory are
    /// read from the store without being cached.
    pub fn tasks(&self, group_id: &str) -> Vec<Task> {
        let cached = self.groups.read().get(group_id).cloned();
        match cached {
            Some(group) => group.lock().tasks.clone(),
            None => self.load_tasks(group_id),
        }
    }

    pub fn member_count(&self, group_id: &str) -> usize {
        self.groups
            .read()
            .get(group_id)
            .map(|g| g.lock().members.len())
            .unwrap_or(0)
    }

    /// Apply one inbound frame from `client`. Frames naming an invalid group
    /// id are logged and dropped.
    pub fn handle(&self, client: &ClientHandle, msg: ClientMessage) {
        match msg {
            ClientMessage::JoinGroup { group_id } if valid_group_id(&group_id) => self.join(client, &group_id),
            ClientMessage::LeaveGroup { group_id } => self.leave(client.id, &group_id),
            ClientMessage::UpdateTasks { group_id, tasks } if valid_group_id(&group_id) => {
                self.replace_tasks(&group_id, tasks);
            }
            ClientMessage::JoinGroup { group_id } | ClientMessage::UpdateTasks { group_id, .. } => {
                tracing::warn!(client = %client.id, group = %group_id, "ignoring invalid group id");
            }
        }
    }

    /// Drop the client from every group it is a member of.
    pub fn disconnect(&self, client_id: ClientId) {
        let groups: Vec<_> = self.groups.read().values().cloned().collect();
        for group in groups {
            group.lock().members.remove(&client_id);
        }
        tracing::debug!(client = %client_id, "client disconnected");
    }

    // Fetch or lazily load a group. A group seen for the first time is read
    // from the store, so lists survive restarts and empty membership.
    fn group(&self, group_id: &str) -> Arc<Mutex<Group>> {
        if let Some(g) = self.groups.read().get(group_id) {
            return g.clone();
        }

        let mut groups = self.groups.write();
        groups
            .entry(group_id.to_string())
            .or_insert_with(|| {
                let tasks = self.load_tasks(group_id);
                Arc::new(Mutex::new(Group { tasks, members: BTreeMap::new() }))
            })
            .clone()
    }

    fn load_tasks(&self, group_id: &str) -> Vec<Task> {
        match store::load_json::<Vec<Task>>(self.store.as_ref(), &store::group_key(group_id)) {
            Ok(tasks) => tasks.unwrap_or_default(),
            Err(e) => {
                tracing::error!(group = group_id, error = %e, "failed to load group tasks");
                Vec::new()
            }
        }
    }
}
