//! Conversation dependency graph.
//!
//! Nodes live in an arena indexed by [`NodeId`]; parent and child links are
//! ids, never references, so cyclic `parentUuid` chains in the input are
//! representable without ownership cycles. Every traversal is iterative.
//!
//! Built once per message set. Depths, roots, orphans, chains, and cycles are
//! computed during [`ConversationGraph::build`] and read back in O(1).

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use sift_core::Message;

/// Index of a node in the graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Node {
    uuid: String,
    /// Position of the message in the input slice.
    message_index: usize,
    declared_parent: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// `None` for nodes unreachable from any root or orphan (cycle members
    /// and their descendants).
    depth: Option<usize>,
    orphan: bool,
    timestamp: Option<DateTime<Utc>>,
}

/// A path from a chain start following the first unvisited child each step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chain {
    /// Uuid of the chain start; doubles as the chain id.
    pub root: String,
    /// Uuids along the chain, starting with `root`.
    pub uuids: Vec<String>,
}

impl Chain {
    /// Number of messages on the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uuids.len()
    }

    /// Whether the chain is empty (never true for built chains).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uuids.is_empty()
    }
}

/// A message with more than one child.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BranchPoint {
    /// Uuid of the forking message.
    pub uuid: String,
    /// Number of children.
    pub child_count: usize,
    /// Highest child score.
    pub max_child_score: u8,
    /// Mean child score.
    pub avg_child_score: f64,
}

/// Graph-position facts the scorer reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DependencyContext {
    /// Message declares no parent.
    pub is_root: bool,
    /// Number of direct children.
    pub child_count: usize,
    /// At least one child is within the recent window.
    pub has_recent_child: bool,
    /// Distance from the chain start (0 when unreachable).
    pub depth: usize,
}

/// Summary counts for a graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Distinct messages in the graph.
    pub total: usize,
    /// Messages with no declared parent.
    pub roots: usize,
    /// Messages whose declared parent is missing.
    pub orphans: usize,
    /// Messages with more than one child.
    pub branch_points: usize,
    /// Greatest reachable depth.
    pub max_depth: usize,
    /// Distinct parent cycles.
    pub cycles: usize,
    /// Length of the longest greedy chain.
    pub longest_chain: usize,
    /// Input messages skipped because their uuid was already present.
    pub duplicates: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// ConversationGraph
// ─────────────────────────────────────────────────────────────────────────────

/// Parent/child structure of a message set.
#[derive(Clone, Debug, Default)]
pub struct ConversationGraph {
    nodes: Vec<Node>,
    by_uuid: HashMap<String, NodeId>,
    roots: Vec<NodeId>,
    orphans: Vec<NodeId>,
    chains: Vec<Chain>,
    cycles: Vec<Vec<String>>,
    duplicates: usize,
}

impl ConversationGraph {
    /// Build the graph for `messages`.
    ///
    /// The first message with a given uuid wins; later duplicates are
    /// skipped with a warning.
    #[must_use]
    pub fn build(messages: &[Message]) -> Self {
        let mut graph = Self::default();

        for (message_index, message) in messages.iter().enumerate() {
            if graph.by_uuid.contains_key(&message.uuid) {
                warn!(uuid = %message.uuid, line = message_index + 1, "duplicate uuid, keeping first");
                graph.duplicates += 1;
                continue;
            }
            let id = NodeId(graph.nodes.len());
            let _ = graph.by_uuid.insert(message.uuid.clone(), id);
            graph.nodes.push(Node {
                uuid: message.uuid.clone(),
                message_index,
                declared_parent: message.parent_uuid.clone(),
                parent: None,
                children: Vec::new(),
                depth: None,
                orphan: false,
                timestamp: message.timestamp_utc(),
            });
        }

        graph.link();
        graph.compute_depths();
        graph.cycles = graph.detect_cycles();
        graph.chains = graph.compute_chains();

        debug!(
            nodes = graph.nodes.len(),
            roots = graph.roots.len(),
            orphans = graph.orphans.len(),
            cycles = graph.cycles.len(),
            "conversation graph built"
        );
        graph
    }

    fn link(&mut self) {
        for index in 0..self.nodes.len() {
            let id = NodeId(index);
            let Some(resolved) = self.nodes[index]
                .declared_parent
                .as_deref()
                .map(|p| self.by_uuid.get(p).copied())
            else {
                self.roots.push(id);
                continue;
            };
            match resolved {
                Some(parent) => {
                    self.nodes[index].parent = Some(parent);
                    self.nodes[parent.0].children.push(id);
                }
                None => {
                    self.nodes[index].orphan = true;
                    self.orphans.push(id);
                }
            }
        }
    }

    fn compute_depths(&mut self) {
        let mut queue: VecDeque<NodeId> = self.chain_starts().collect();
        for id in &queue {
            self.nodes[id.0].depth = Some(0);
        }
        while let Some(id) = queue.pop_front() {
            let next = self.nodes[id.0].depth.map_or(0, |d| d + 1);
            for k in 0..self.nodes[id.0].children.len() {
                let child = self.nodes[id.0].children[k];
                if self.nodes[child.0].depth.is_none() {
                    self.nodes[child.0].depth = Some(next);
                    queue.push_back(child);
                }
            }
        }
    }

    /// Walk parent pointers from every node, tracking which nodes are on the
    /// current path. Each node has at most one parent, so each component
    /// holds at most one cycle.
    fn detect_cycles(&self) -> Vec<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut cycles = Vec::new();

        for start in 0..self.nodes.len() {
            let mut path = Vec::new();
            let mut cursor = Some(NodeId(start));
            while let Some(id) = cursor {
                match marks[id.0] {
                    Mark::Unvisited => {
                        marks[id.0] = Mark::OnPath;
                        path.push(id);
                        cursor = self.nodes[id.0].parent;
                    }
                    Mark::OnPath => {
                        let entry = path.iter().position(|p| *p == id).unwrap_or(0);
                        let cycle: Vec<String> = path[entry..]
                            .iter()
                            .map(|n| self.nodes[n.0].uuid.clone())
                            .collect();
                        warn!(cycle = ?cycle, "circular parent chain");
                        cycles.push(cycle);
                        break;
                    }
                    Mark::Done => break,
                }
            }
            for id in path {
                marks[id.0] = Mark::Done;
            }
        }
        cycles
    }

    /// Greedy chain per start: follow the first unvisited child until none
    /// remain. The visited set is shared across starts, so chains never
    /// overlap.
    fn compute_chains(&self) -> Vec<Chain> {
        let mut visited = vec![false; self.nodes.len()];
        let mut chains = Vec::new();
        for start in self.chain_starts() {
            if visited[start.0] {
                continue;
            }
            visited[start.0] = true;
            let mut uuids = vec![self.nodes[start.0].uuid.clone()];
            let mut current = start;
            while let Some(next) = self.nodes[current.0]
                .children
                .iter()
                .copied()
                .find(|c| !visited[c.0])
            {
                visited[next.0] = true;
                uuids.push(self.nodes[next.0].uuid.clone());
                current = next;
            }
            chains.push(Chain {
                root: self.nodes[start.0].uuid.clone(),
                uuids,
            });
        }
        chains
    }

    /// Roots followed by orphans, in input order within each group.
    fn chain_starts(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.iter().chain(self.orphans.iter()).copied()
    }

    // ── lookups ─────────────────────────────────────────────────────

    /// Number of distinct messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node id for `uuid`.
    #[must_use]
    pub fn id(&self, uuid: &str) -> Option<NodeId> {
        self.by_uuid.get(uuid).copied()
    }

    /// Whether `uuid` is in the graph.
    #[must_use]
    pub fn contains(&self, uuid: &str) -> bool {
        self.by_uuid.contains_key(uuid)
    }

    /// Uuid of a node.
    #[must_use]
    pub fn uuid(&self, id: NodeId) -> &str {
        &self.nodes[id.0].uuid
    }

    /// Position in the input slice of the message that owns `uuid`.
    #[must_use]
    pub fn message_index(&self, uuid: &str) -> Option<usize> {
        self.node(uuid).map(|n| n.message_index)
    }

    /// Depth of `uuid`; `None` when unknown or unreachable.
    #[must_use]
    pub fn depth(&self, uuid: &str) -> Option<usize> {
        self.node(uuid).and_then(|n| n.depth)
    }

    /// Linked parent of `uuid`, if present in the graph.
    #[must_use]
    pub fn parent(&self, uuid: &str) -> Option<&str> {
        let parent = self.node(uuid)?.parent?;
        Some(self.uuid(parent))
    }

    /// Direct children of `uuid`, in input order.
    #[must_use]
    pub fn children(&self, uuid: &str) -> Vec<&str> {
        self.node(uuid)
            .map(|n| n.children.iter().map(|c| self.uuid(*c)).collect())
            .unwrap_or_default()
    }

    /// Whether `uuid` declares no parent.
    #[must_use]
    pub fn is_root(&self, uuid: &str) -> bool {
        self.node(uuid).is_some_and(|n| n.declared_parent.is_none())
    }

    /// Whether `uuid` declares a parent that is not in the graph.
    #[must_use]
    pub fn is_orphan(&self, uuid: &str) -> bool {
        self.node(uuid).is_some_and(|n| n.orphan)
    }

    /// Uuids of messages with no declared parent.
    #[must_use]
    pub fn roots(&self) -> Vec<&str> {
        self.roots.iter().map(|id| self.uuid(*id)).collect()
    }

    /// Uuids of messages whose declared parent is missing.
    #[must_use]
    pub fn orphans(&self) -> Vec<&str> {
        self.orphans.iter().map(|id| self.uuid(*id)).collect()
    }

    /// Parent cycles, each listed from its entry point along parent links.
    #[must_use]
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Greedy chains, one per root or orphan.
    #[must_use]
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// The longest greedy chain (first on ties).
    #[must_use]
    pub fn longest_chain(&self) -> Option<&Chain> {
        self.chains
            .iter()
            .reduce(|best, c| if c.len() > best.len() { c } else { best })
    }

    // ── traversals ──────────────────────────────────────────────────

    /// Ancestors of `uuid`, nearest first. Stops at a root, an orphan, or
    /// on re-entering a cycle.
    #[must_use]
    pub fn ancestors(&self, uuid: &str) -> Vec<&str> {
        let Some(start) = self.id(uuid) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut out = Vec::new();
        let mut cursor = self.nodes[start.0].parent;
        while let Some(id) = cursor {
            if !seen.insert(id) {
                break;
            }
            out.push(self.uuid(id));
            cursor = self.nodes[id.0].parent;
        }
        out
    }

    /// Descendants of `uuid` in breadth-first order.
    #[must_use]
    pub fn descendants(&self, uuid: &str) -> Vec<&str> {
        let Some(start) = self.id(uuid) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(id) = queue.pop_front() {
            for child in &self.nodes[id.0].children {
                if seen.insert(*child) {
                    out.push(self.uuid(*child));
                    queue.push_back(*child);
                }
            }
        }
        out
    }

    /// Messages with more than one child, annotated with child scores.
    pub fn branch_points<F>(&self, score: F) -> Vec<BranchPoint>
    where
        F: Fn(&str) -> u8,
    {
        self.nodes
            .iter()
            .filter(|n| n.children.len() > 1)
            .map(|n| {
                let scores: Vec<u8> = n.children.iter().map(|c| score(self.uuid(*c))).collect();
                let sum: u32 = scores.iter().map(|s| u32::from(*s)).sum();
                #[allow(clippy::cast_precision_loss)]
                let avg_child_score = f64::from(sum) / scores.len() as f64;
                BranchPoint {
                    uuid: n.uuid.clone(),
                    child_count: n.children.len(),
                    max_child_score: scores.iter().copied().max().unwrap_or(0),
                    avg_child_score,
                }
            })
            .collect()
    }

    /// Position facts for scoring. A child is recent when its timestamp is
    /// within `recent_days` of `now`.
    #[must_use]
    pub fn dependency_context(
        &self,
        uuid: &str,
        now: DateTime<Utc>,
        recent_days: u32,
    ) -> Option<DependencyContext> {
        let node = self.node(uuid)?;
        let cutoff = now - Duration::days(i64::from(recent_days));
        let has_recent_child = node
            .children
            .iter()
            .any(|c| self.nodes[c.0].timestamp.is_some_and(|ts| ts >= cutoff));
        Some(DependencyContext {
            is_root: node.declared_parent.is_none(),
            child_count: node.children.len(),
            has_recent_child,
            depth: node.depth.unwrap_or(0),
        })
    }

    /// Summary counts.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total: self.nodes.len(),
            roots: self.roots.len(),
            orphans: self.orphans.len(),
            branch_points: self.nodes.iter().filter(|n| n.children.len() > 1).count(),
            max_depth: self.nodes.iter().filter_map(|n| n.depth).max().unwrap_or(0),
            cycles: self.cycles.len(),
            longest_chain: self.longest_chain().map_or(0, Chain::len),
            duplicates: self.duplicates,
        }
    }

    fn node(&self, uuid: &str) -> Option<&Node> {
        self.id(uuid).map(|id| &self.nodes[id.0])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
