//! Bounded breadth-first network discovery.
//!
//! Discovery walks face-adjacent cells outward from a seed over a FIFO queue.
//! Conduits of the requested [`Medium`] and terminal blocks that take part in
//! that medium are expanded; anything else is a wall. Every cell is visited
//! at most once per call, so cyclic conduit layouts terminate.
//!
//! Two bounds stop the walk early and mark the result as truncated:
//! - the result reached `max_nodes` entries;
//! - `visit_limit` cells were expanded (a large conduit mass with few
//!   endpoints would otherwise dominate the tick).
//!
//! A truncated network is a partial answer, not a silently complete one.
//! Result order is visitation order.

use crate::catalog::{Classifiable, Medium};
use crate::coord::{Coord, DimensionId, Location};
use crate::node::{Classifier, Node};
use crate::store::KvStore;
use crate::world::World;
use std::collections::{HashMap, HashSet, VecDeque};

/// Default cap on cells expanded per discovery.
pub const DEFAULT_VISIT_LIMIT: usize = 4096;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Which visited cells end up in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Terminal blocks only. Conduits are infrastructure, not endpoints.
    Endpoints,
    /// Every visited cell, conduits included. Used for network analysis.
    FullTopology,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    pub medium: Medium,
    pub max_nodes: usize,
    pub visit_limit: usize,
    /// Leave the seed out of the result (receivers-only queries).
    pub exclude_seed: bool,
    pub mode: DiscoveryMode,
}

impl DiscoveryOptions {
    pub fn new(medium: Medium, max_nodes: usize) -> Self {
        Self {
            medium,
            max_nodes,
            visit_limit: DEFAULT_VISIT_LIMIT,
            exclude_seed: false,
            mode: DiscoveryMode::Endpoints,
        }
    }

    pub fn excluding_seed(mut self) -> Self {
        self.exclude_seed = true;
        self
    }

    pub fn full_topology(mut self) -> Self {
        self.mode = DiscoveryMode::FullTopology;
        self
    }

    pub fn with_visit_limit(mut self, visit_limit: usize) -> Self {
        self.visit_limit = visit_limit;
        self
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// The nodes reachable from a seed. Built fresh per operation; never cached
/// across ticks.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<Node>,
    index: HashMap<Coord, usize>,
    visited: usize,
    conduit_count: usize,
    truncated: bool,
}

impl Network {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in visitation order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn get(&self, at: Coord) -> Option<&Node> {
        self.index.get(&at).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, at: Coord) -> bool {
        self.index.contains_key(&at)
    }

    /// Cells expanded during discovery, conduits included.
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Conduits expanded during discovery, whether or not they are in the result.
    pub fn conduit_count(&self) -> usize {
        self.conduit_count
    }

    /// Whether a bound stopped the walk before the queue emptied.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn push(&mut self, node: Node) {
        self.index.insert(node.location.at, self.nodes.len());
        self.nodes.push(node);
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Discover the network around `seed`.
///
/// The seed is always expanded if it can be classified, even when it does
/// not itself join `options.medium`; it is included in the result only when
/// it qualifies under `options.mode` and `exclude_seed` is not set.
pub fn discover<W, S>(
    classifier: &Classifier<'_>,
    world: &W,
    store: &S,
    seed: Location,
    options: DiscoveryOptions,
) -> Network
where
    W: World + ?Sized,
    S: KvStore + ?Sized,
{
    let dim = seed.dim;
    let mut network = Network::default();
    let mut seen: HashSet<Coord> = HashSet::new();
    let mut queue: VecDeque<Coord> = VecDeque::new();

    seen.insert(seed.at);
    queue.push_back(seed.at);

    while let Some(&at) = queue.front() {
        if network.len() >= options.max_nodes || network.visited >= options.visit_limit {
            network.truncated = true;
            break;
        }
        queue.pop_front();

        let loc = Location::new(dim, at);
        let Some(node) = classifier.classify(world, store, loc) else {
            continue;
        };
        network.visited += 1;

        let is_seed = at == seed.at;
        if node.is_conduit() {
            network.conduit_count += 1;
        }
        let qualifies = match options.mode {
            DiscoveryMode::Endpoints => node.is_terminal(),
            DiscoveryMode::FullTopology => true,
        };
        if qualifies && !(is_seed && options.exclude_seed) {
            network.push(node);
        }

        for (_, next) in at.neighbors() {
            if !seen.insert(next) {
                continue;
            }
            if joins_at(classifier, world, dim, next, options.medium) {
                queue.push_back(next);
            }
        }
    }

    if network.truncated {
        tracing::debug!(
            seed = %seed,
            nodes = network.len(),
            visited = network.visited,
            "network discovery truncated"
        );
    }
    network
}

/// The Network Identifier: the smallest coordinate among conduits of
/// `medium` reachable from `seed`, walking at most `cap` cells.
///
/// Sources feeding the same conduit graph resolve to the same anchor as long
/// as the graph is smaller than `cap`.
pub fn network_anchor<W>(
    classifier: &Classifier<'_>,
    world: &W,
    seed: Location,
    medium: Medium,
    cap: usize,
) -> Location
where
    W: World + ?Sized,
{
    let dim = seed.dim;
    let mut min = seed.at;
    let mut seen: HashSet<Coord> = HashSet::new();
    let mut queue: VecDeque<Coord> = VecDeque::new();
    let mut walked = 0usize;

    seen.insert(seed.at);
    queue.push_back(seed.at);

    while let Some(at) = queue.pop_front() {
        if walked >= cap {
            break;
        }
        walked += 1;
        min = min.min(at);

        for (_, next) in at.neighbors() {
            if !seen.insert(next) {
                continue;
            }
            let is_conduit = classifier
                .definition_at(world, Location::new(dim, next))
                .is_some_and(|(_, def)| def.is_conduit() && def.medium == Some(medium));
            if is_conduit {
                queue.push_back(next);
            }
        }
    }

    Location::new(dim, min)
}

fn joins_at<W>(classifier: &Classifier<'_>, world: &W, dim: DimensionId, at: Coord, medium: Medium) -> bool
where
    W: World + ?Sized,
{
    classifier
        .definition_at(world, Location::new(dim, at))
        .is_some_and(|(_, def)| def.joins(medium))
}
