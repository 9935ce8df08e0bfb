//! Model history — every model made Ready this run, newest first.
//!
//! Entries are immutable once appended; re-activating one moves the
//! "current" pointer without touching the order. Capped so a long testing
//! session cannot grow the render list forever.

use super::ModelSession;
use std::collections::{HashMap, VecDeque};

/// Maximum entries kept; the oldest upload is evicted beyond this.
pub const HISTORY_CAP: usize = 20;

#[derive(Debug, Default)]
pub struct ModelHistory {
    /// Activation order for rendering, newest Ready transition first.
    order: VecDeque<String>,
    /// Id -> session, for O(1) activation lookup.
    sessions: HashMap<String, ModelSession>,
    /// Id of the session predictions currently run against.
    current: Option<String>,
}

impl ModelHistory {
    /// Record a session that just reached Ready and make it current.
    ///
    /// Called exactly once per successful upload, never on re-activation.
    /// A re-upload that yields an already-known id refreshes that entry in
    /// place instead of duplicating it.
    pub fn append(&mut self, session: ModelSession) {
        let id = session.model_id.clone();
        if self.sessions.insert(id.clone(), session).is_none() {
            self.order.push_front(id.clone());
            if self.order.len() > HISTORY_CAP {
                if let Some(evicted) = self.order.pop_back() {
                    self.sessions.remove(&evicted);
                    log::info!("[HISTORY] Evicted oldest entry: {}", evicted);
                }
            }
        }
        self.current = Some(id);
    }

    /// Make a previously appended session current again.
    ///
    /// Pure lookup: no network, no reordering. Returns the session so the
    /// caller can restore its class names and endpoint.
    pub fn activate(&mut self, model_id: &str) -> Option<&ModelSession> {
        if !self.sessions.contains_key(model_id) {
            return None;
        }
        self.current = Some(model_id.to_string());
        self.sessions.get(model_id)
    }

    /// Session predictions currently run against, if any.
    pub fn current(&self) -> Option<&ModelSession> {
        self.current
            .as_deref()
            .and_then(|id| self.sessions.get(id))
    }

    /// Forget the current pointer (a new model file was chosen); history
    /// entries are untouched.
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in render order (newest first) with their active flag.
    pub fn iter(&self) -> impl Iterator<Item = (&ModelSession, bool)> + '_ {
        self.order.iter().filter_map(move |id| {
            let session = self.sessions.get(id)?;
            let active = self.current.as_deref() == Some(id.as_str());
            Some((session, active))
        })
    }
}
