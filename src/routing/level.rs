//! The matching tree.
//!
//! # Responsibilities
//! - Store compiled segments one tier at a time
//! - Add and remove subscribers along a tokenized path
//! - Walk a tokenized topic and fire every matching subscriber
//!
//! # Design Decisions
//! - One node per raw segment text per level; equal raw text shares state
//! - A node's child level is allocated together with the node
//! - Sibling nodes are tried in insertion order and every match fires
//! - Locks are held only to snapshot; subscribers run with no lock held
//! - Emptied nodes are kept (no pruning)

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::routing::dispatch::Dispatch;
use crate::routing::matcher::{CompiledSegment, Matcher, CATCH_ALL};
use crate::routing::message::Message;
use crate::routing::subscriber::SubscriberHandle;
use crate::routing::types::{RouterError, RouterResult};

/// One tier of the tree.
#[derive(Debug, Default)]
pub struct Level {
    inner: RwLock<LevelInner>,
}

#[derive(Debug, Default)]
struct LevelInner {
    nodes: IndexMap<String, Arc<Node>>,
    /// Subscribers registered with a trailing `*` at this depth.
    all: Vec<SubscriberHandle>,
}

/// One compiled segment, its subscribers and the level below it.
#[derive(Debug)]
pub struct Node {
    segment: CompiledSegment,
    subscribers: RwLock<Vec<SubscriberHandle>>,
    next: Level,
}

impl Node {
    fn new(segment: CompiledSegment) -> Self {
        Self {
            segment,
            subscribers: RwLock::new(Vec::new()),
            next: Level::new(),
        }
    }

    pub fn segment(&self) -> &CompiledSegment {
        &self.segment
    }

    pub fn next(&self) -> &Level {
        &self.next
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Level {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `subscriber` at the end of `tokens`, creating nodes as needed.
    pub fn add(&self, tokens: &[String], subscriber: SubscriberHandle) -> RouterResult<()> {
        let (head, rest) = tokens
            .split_first()
            .ok_or_else(|| RouterError::InvalidPath("empty path".into()))?;

        if rest.is_empty() && head == CATCH_ALL {
            self.inner.write().all.push(subscriber);
            return Ok(());
        }

        let node = self.node_or_insert(head)?;
        if rest.is_empty() {
            node.subscribers.write().push(subscriber);
            Ok(())
        } else {
            node.next.add(rest, subscriber)
        }
    }

    /// Detach `subscriber` from the end of `tokens`. Never creates nodes.
    pub fn remove(&self, tokens: &[String], subscriber: &SubscriberHandle) -> RouterResult<()> {
        let (head, rest) = tokens
            .split_first()
            .ok_or_else(|| RouterError::InvalidPath("empty path".into()))?;

        if rest.is_empty() && head == CATCH_ALL {
            return swap_remove_subscriber(&mut self.inner.write().all, subscriber);
        }

        let node = self
            .node(head)
            .ok_or_else(|| RouterError::InvalidRoute(head.clone()))?;
        if rest.is_empty() {
            swap_remove_subscriber(&mut node.subscribers.write(), subscriber)
        } else {
            node.next.remove(rest, subscriber)
        }
    }

    /// Fire everything in this level that matches `tokens`.
    pub(crate) fn resolve(&self, dispatch: &Dispatch<'_>, tokens: &[String], message: &Message) {
        let (all, nodes) = {
            let inner = self.inner.read();
            (
                inner.all.clone(),
                inner.nodes.values().cloned().collect::<Vec<_>>(),
            )
        };

        dispatch.fire_all(&all, message);

        let Some((head, rest)) = tokens.split_first() else {
            return;
        };

        for node in nodes {
            if !node.segment.matches(head) {
                continue;
            }

            let mut branch = message.clone();
            if let Some(name) = node.segment.capture_name() {
                branch.params.insert(name.to_string(), head.clone());
            }
            branch.path.push(node.segment.raw().to_string());

            let subscribers = node.subscribers.read().clone();
            dispatch.fire_all(&subscribers, &branch);

            // Topics never carry a literal `*`, so a trailing catch-all
            // below this node always needs one more token.
            if !rest.is_empty() {
                node.next.resolve(dispatch, rest, &branch);
            }
        }
    }

    /// Look up the node stored under the raw segment text.
    pub fn node(&self, raw: &str) -> Option<Arc<Node>> {
        self.inner.read().nodes.get(raw).cloned()
    }

    fn node_or_insert(&self, raw: &str) -> RouterResult<Arc<Node>> {
        if let Some(node) = self.node(raw) {
            return Ok(node);
        }

        let segment = CompiledSegment::compile(raw)?;
        let mut inner = self.inner.write();
        // Another writer may have won the race since the read above.
        let node = inner
            .nodes
            .entry(raw.to_string())
            .or_insert_with(|| Arc::new(Node::new(segment)));
        Ok(node.clone())
    }

    /// Number of nodes at this level.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read();
        inner.nodes.is_empty() && inner.all.is_empty()
    }

    /// Number of catch-all subscribers at this level.
    pub fn catch_all_count(&self) -> usize {
        self.inner.read().all.len()
    }
}

fn swap_remove_subscriber(
    subscribers: &mut Vec<SubscriberHandle>,
    subscriber: &SubscriberHandle,
) -> RouterResult<()> {
    let index = subscribers
        .iter()
        .position(|s| s == subscriber)
        .ok_or(RouterError::SubscriberNotFound)?;
    subscribers.swap_remove(index);
    Ok(())
}
