//! In-memory search backend.
//!
//! Keeps indices, documents and alias memberships in process memory and logs
//! every capability call it receives. Reads go through the same scroll path a
//! cluster adapter would use, and writes only become visible to reads after
//! [`Backend::refresh_index`], so migrations behave the way they do against a
//! near-real-time search cluster.

use super::scroll::{scroll_each, ScrollClient, ScrollPage};
use super::{Backend, Visitor};
use crate::config::ScrollConfig;
use crate::document::Document;
use crate::error::BackendError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Capability operations, used to filter the call log and script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    IndicesExist,
    CreateIndex,
    Index,
    ForEach,
    AddAlias,
    RemoveAlias,
    GetAlias,
    RefreshIndex,
}

impl std::fmt::Display for BackendOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendOp::IndicesExist => write!(f, "indices_exist"),
            BackendOp::CreateIndex => write!(f, "create_index"),
            BackendOp::Index => write!(f, "index"),
            BackendOp::ForEach => write!(f, "for_each"),
            BackendOp::AddAlias => write!(f, "add_alias"),
            BackendOp::RemoveAlias => write!(f, "remove_alias"),
            BackendOp::GetAlias => write!(f, "get_alias"),
            BackendOp::RefreshIndex => write!(f, "refresh_index"),
        }
    }
}

/// A recorded capability call and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `indices_exist(names)`.
    IndicesExist { names: Vec<String> },
    /// `create_index(name, settings)`.
    CreateIndex { name: String, settings: Value },
    /// `index(document)`.
    Index { document: Document },
    /// `for_each(query, indices, types, _)`.
    ForEach {
        query: Value,
        indices: Vec<String>,
        types: Vec<String>,
    },
    /// `add_alias(alias, indices)`.
    AddAlias { alias: String, indices: Vec<String> },
    /// `remove_alias(alias, indices)`.
    RemoveAlias { alias: String, indices: Vec<String> },
    /// `get_alias(alias)`.
    GetAlias { alias: String },
    /// `refresh_index(name)`.
    RefreshIndex { name: String },
}

impl BackendCall {
    /// The operation this call invoked.
    pub fn op(&self) -> BackendOp {
        match self {
            BackendCall::IndicesExist { .. } => BackendOp::IndicesExist,
            BackendCall::CreateIndex { .. } => BackendOp::CreateIndex,
            BackendCall::Index { .. } => BackendOp::Index,
            BackendCall::ForEach { .. } => BackendOp::ForEach,
            BackendCall::AddAlias { .. } => BackendOp::AddAlias,
            BackendCall::RemoveAlias { .. } => BackendOp::RemoveAlias,
            BackendCall::GetAlias { .. } => BackendOp::GetAlias,
            BackendCall::RefreshIndex { .. } => BackendOp::RefreshIndex,
        }
    }
}

#[derive(Debug)]
struct StoredIndex {
    settings: Value,
    /// Latest state, including unrefreshed writes.
    documents: Vec<Document>,
    /// What searches see; replaced on refresh.
    searchable: Vec<Document>,
}

impl StoredIndex {
    fn new(settings: Value) -> Self {
        Self {
            settings,
            documents: Vec::new(),
            searchable: Vec::new(),
        }
    }

    fn upsert(&mut self, document: Document) {
        let existing = document.id.as_deref().and_then(|id| {
            self.documents
                .iter()
                .position(|d| d.same_key(&document.doc_type, id))
        });
        match existing {
            Some(pos) => self.documents[pos] = document,
            None => self.documents.push(document),
        }
    }

    fn refresh(&mut self) {
        self.searchable = self.documents.clone();
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    indices: BTreeMap<String, StoredIndex>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    scrolls: HashMap<String, VecDeque<Document>>,
    next_scroll_id: u64,
    next_doc_id: u64,
}

impl MemoryState {
    /// Resolve index and alias names to concrete index names, in order, without duplicates.
    fn resolve(&self, names: &[&str]) -> Result<Vec<String>, BackendError> {
        let mut resolved: Vec<String> = Vec::new();
        for name in names {
            let targets: Vec<String> = if self.indices.contains_key(*name) {
                vec![name.to_string()]
            } else if let Some(members) = self.aliases.get(*name) {
                members.iter().cloned().collect()
            } else {
                return Err(BackendError::IndexNotFound(name.to_string()));
            };
            for target in targets {
                if !resolved.contains(&target) {
                    resolved.push(target);
                }
            }
        }
        Ok(resolved)
    }
}

/// One index in a [`MemorySnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Settings the index was created with.
    #[serde(default)]
    pub settings: Value,
    /// Documents in insertion order, including unrefreshed writes.
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Serializable copy of a [`MemoryBackend`]'s indices and aliases.
///
/// Call logs, scripted failures and open scroll cursors are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Indices by name.
    #[serde(default)]
    pub indices: BTreeMap<String, IndexSnapshot>,
    /// Alias name to member indices.
    #[serde(default)]
    pub aliases: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug)]
struct ScriptedFailure {
    op: BackendOp,
    nth: usize,
    message: String,
}

/// In-memory [`Backend`] that records every call.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    calls: Mutex<Vec<BackendCall>>,
    failures: Mutex<Vec<ScriptedFailure>>,
    scroll: ScrollConfig,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a backend from a snapshot. Every document is searchable.
    ///
    /// Aliases naming indices missing from the snapshot are dropped, and
    /// generated ids continue after the highest `auto-<n>` already present.
    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            for (name, stored) in snapshot.indices {
                let mut index = StoredIndex::new(stored.settings);
                for mut document in stored.documents {
                    document.index = name.clone();
                    if let Some(n) = document
                        .id
                        .as_deref()
                        .and_then(|id| id.strip_prefix("auto-"))
                        .and_then(|n| n.parse::<u64>().ok())
                    {
                        state.next_doc_id = state.next_doc_id.max(n);
                    }
                    index.upsert(document);
                }
                index.refresh();
                state.indices.insert(name, index);
            }
            for (alias, members) in snapshot.aliases {
                let members: BTreeSet<String> = members
                    .into_iter()
                    .filter(|m| state.indices.contains_key(m))
                    .collect();
                if !members.is_empty() {
                    state.aliases.insert(alias, members);
                }
            }
        }
        backend
    }

    /// Copy out the current indices and aliases.
    pub fn snapshot(&self) -> MemorySnapshot {
        let state = self.state.lock();
        MemorySnapshot {
            indices: state
                .indices
                .iter()
                .map(|(name, index)| {
                    let snapshot = IndexSnapshot {
                        settings: index.settings.clone(),
                        documents: index.documents.clone(),
                    };
                    (name.clone(), snapshot)
                })
                .collect(),
            aliases: state.aliases.clone(),
        }
    }

    /// Set the page size and keep-alive used by `for_each`.
    pub fn with_scroll_config(mut self, config: ScrollConfig) -> Self {
        self.scroll = config;
        self
    }

    /// Create (or replace) an index whose documents are immediately searchable.
    ///
    /// Not recorded in the call log.
    pub fn seed_index(
        &self,
        name: impl Into<String>,
        settings: Value,
        documents: impl IntoIterator<Item = Document>,
    ) {
        let name = name.into();
        let mut index = StoredIndex::new(settings);
        for mut document in documents {
            document.index = name.clone();
            index.upsert(document);
        }
        index.refresh();
        self.state.lock().indices.insert(name, index);
    }

    /// Drop an index and its alias memberships. Not recorded in the call log.
    pub fn delete_index(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.indices.remove(name).is_some();
        for members in state.aliases.values_mut() {
            members.remove(name);
        }
        state.aliases.retain(|_, members| !members.is_empty());
        removed
    }

    /// Make the `nth` call (0-based, counted over the backend's lifetime) of
    /// `op` fail with [`BackendError::Request`].
    pub fn fail_call(&self, op: BackendOp, nth: usize, message: impl Into<String>) {
        self.failures.lock().push(ScriptedFailure {
            op,
            nth,
            message: message.into(),
        });
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Calls of one operation, in order.
    pub fn calls_of(&self, op: BackendOp) -> Vec<BackendCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    /// Number of calls of one operation.
    pub fn call_count(&self, op: BackendOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    /// Names passed to `indices_exist`, flattened, in call order.
    pub fn checked_indices(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BackendCall::IndicesExist { names } => Some(names.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Documents passed to `index`, in call order.
    pub fn indexed_documents(&self) -> Vec<Document> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BackendCall::Index { document } => Some(document.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of all existing indices, sorted.
    pub fn index_names(&self) -> Vec<String> {
        self.state.lock().indices.keys().cloned().collect()
    }

    /// Latest documents of an index, including unrefreshed writes.
    pub fn documents(&self, index: &str) -> Option<Vec<Document>> {
        self.state
            .lock()
            .indices
            .get(index)
            .map(|i| i.documents.clone())
    }

    /// Settings an index was created with.
    pub fn settings(&self, index: &str) -> Option<Value> {
        self.state.lock().indices.get(index).map(|i| i.settings.clone())
    }

    /// Indices an alias points at, sorted.
    pub fn alias_targets(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .aliases
            .get(alias)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of scroll cursors not yet closed.
    pub fn open_scrolls(&self) -> usize {
        self.state.lock().scrolls.len()
    }

    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        let op = call.op();
        let nth = {
            let mut calls = self.calls.lock();
            let nth = calls.iter().filter(|c| c.op() == op).count();
            calls.push(call);
            nth
        };

        let mut failures = self.failures.lock();
        match failures.iter().position(|f| f.op == op && f.nth == nth) {
            Some(pos) => Err(BackendError::Request(failures.remove(pos).message)),
            None => Ok(()),
        }
    }
}

fn to_owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn is_match_all(query: &Value) -> bool {
    query.get("match_all").is_some()
        || query
            .get("query")
            .and_then(|q| q.get("match_all"))
            .is_some()
}

impl Backend for MemoryBackend {
    fn indices_exist(&self, names: &[&str]) -> Result<bool, BackendError> {
        self.record(BackendCall::IndicesExist {
            names: to_owned_names(names),
        })?;
        let state = self.state.lock();
        Ok(names.iter().all(|n| state.indices.contains_key(*n)))
    }

    fn create_index(&self, name: &str, settings: &Value) -> Result<(), BackendError> {
        self.record(BackendCall::CreateIndex {
            name: name.to_string(),
            settings: settings.clone(),
        })?;

        if !(settings.is_null() || settings.is_object()) {
            return Err(BackendError::InvalidSettings {
                index: name.to_string(),
                reason: "settings must be a JSON object".to_string(),
            });
        }

        let mut state = self.state.lock();
        if state.indices.contains_key(name) {
            return Err(BackendError::IndexExists(name.to_string()));
        }
        state
            .indices
            .insert(name.to_string(), StoredIndex::new(settings.clone()));
        Ok(())
    }

    fn index(&self, mut document: Document) -> Result<(), BackendError> {
        self.record(BackendCall::Index {
            document: document.clone(),
        })?;

        let mut state = self.state.lock();
        if document.id.is_none() {
            state.next_doc_id += 1;
            document.id = Some(format!("auto-{}", state.next_doc_id));
        }
        let index = state
            .indices
            .get_mut(&document.index)
            .ok_or_else(|| BackendError::IndexNotFound(document.index.clone()))?;
        index.upsert(document);
        Ok(())
    }

    fn for_each(
        &self,
        query: &Value,
        indices: &[&str],
        types: &[&str],
        visit: &mut Visitor<'_>,
    ) -> Result<(), BackendError> {
        self.record(BackendCall::ForEach {
            query: query.clone(),
            indices: to_owned_names(indices),
            types: to_owned_names(types),
        })?;
        scroll_each(self, &self.scroll, query, indices, types, visit)
    }

    fn add_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError> {
        self.record(BackendCall::AddAlias {
            alias: alias.to_string(),
            indices: to_owned_names(indices),
        })?;

        let mut state = self.state.lock();
        if let Some(missing) = indices.iter().find(|i| !state.indices.contains_key(**i)) {
            return Err(BackendError::IndexNotFound(missing.to_string()));
        }
        let members = state.aliases.entry(alias.to_string()).or_default();
        members.extend(indices.iter().map(|i| i.to_string()));
        Ok(())
    }

    fn remove_alias(&self, alias: &str, indices: &[&str]) -> Result<(), BackendError> {
        self.record(BackendCall::RemoveAlias {
            alias: alias.to_string(),
            indices: to_owned_names(indices),
        })?;

        let mut state = self.state.lock();
        if let Some(members) = state.aliases.get_mut(alias) {
            for index in indices {
                members.remove(*index);
            }
            if members.is_empty() {
                state.aliases.remove(alias);
            }
        }
        Ok(())
    }

    fn get_alias(&self, alias: &str) -> Result<Vec<String>, BackendError> {
        self.record(BackendCall::GetAlias {
            alias: alias.to_string(),
        })?;
        Ok(self.alias_targets(alias))
    }

    fn refresh_index(&self, name: &str) -> Result<(), BackendError> {
        self.record(BackendCall::RefreshIndex {
            name: name.to_string(),
        })?;

        let mut state = self.state.lock();
        for target in state.resolve(&[name])? {
            if let Some(index) = state.indices.get_mut(&target) {
                index.refresh();
            }
        }
        Ok(())
    }
}

impl ScrollClient for MemoryBackend {
    fn open_scroll(
        &self,
        query: &Value,
        indices: &[&str],
        types: &[&str],
        config: &ScrollConfig,
    ) -> Result<ScrollPage, BackendError> {
        if !is_match_all(query) {
            return Err(BackendError::UnsupportedQuery(query.to_string()));
        }

        let mut state = self.state.lock();
        let mut matches: VecDeque<Document> = VecDeque::new();
        for target in state.resolve(indices)? {
            if let Some(index) = state.indices.get(&target) {
                matches.extend(
                    index
                        .searchable
                        .iter()
                        .filter(|d| types.is_empty() || types.contains(&d.doc_type.as_str()))
                        .cloned(),
                );
            }
        }

        state.next_scroll_id += 1;
        let scroll_id = format!("scroll-{}", state.next_scroll_id);
        let take = config.page_size.max(1).min(matches.len());
        let hits: Vec<Document> = matches.drain(..take).collect();
        state.scrolls.insert(scroll_id.clone(), matches);

        Ok(ScrollPage {
            scroll_id: Some(scroll_id),
            hits,
        })
    }

    fn next_page(
        &self,
        scroll_id: &str,
        config: &ScrollConfig,
    ) -> Result<ScrollPage, BackendError> {
        let mut state = self.state.lock();
        let remaining = state
            .scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| BackendError::ScrollExpired(scroll_id.to_string()))?;
        let take = config.page_size.max(1).min(remaining.len());
        Ok(ScrollPage {
            scroll_id: Some(scroll_id.to_string()),
            hits: remaining.drain(..take).collect(),
        })
    }

    fn close_scroll(&self, scroll_id: &str) -> Result<(), BackendError> {
        self.state.lock().scrolls.remove(scroll_id);
        Ok(())
    }
}
