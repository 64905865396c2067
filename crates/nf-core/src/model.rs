//! Core node-flow data model.
//!
//! The canvas holds a directed graph: nodes are placed, labelled units with a
//! kind-specific payload; edges are directed connections between two nodes.
//! Positions are stored in logical (unzoomed) canvas space. Paint order is
//! insertion order — the last node created paints on top.

use crate::id::{EDGE_SEPARATOR, EdgeId, NodeId};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::ops::{Add, Sub};

// ─── Geometry ────────────────────────────────────────────────────────────

/// A 2D point or offset. Which space it lives in is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Replace non-finite components with zero.
    pub fn sanitized(self) -> Self {
        let fix = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self::new(fix(self.x), fix(self.y))
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// ─── Node kinds ──────────────────────────────────────────────────────────

/// The closed set of node categories offered by the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Input,
    Process,
    Output,
    DataStore,
    ExternalEndpoint,
    Conditional,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Input,
        NodeKind::Process,
        NodeKind::Output,
        NodeKind::DataStore,
        NodeKind::ExternalEndpoint,
        NodeKind::Conditional,
    ];

    /// The kind used when the host hands us a tag we don't recognise.
    pub const FALLBACK: NodeKind = NodeKind::Process;

    /// Wire tag used by the palette drag payload.
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Process => "process",
            NodeKind::Output => "output",
            NodeKind::DataStore => "data_store",
            NodeKind::ExternalEndpoint => "external_endpoint",
            NodeKind::Conditional => "conditional",
        }
    }

    /// Resolve a palette tag. Unknown tags fall back to [`NodeKind::FALLBACK`].
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "input" => NodeKind::Input,
            "process" => NodeKind::Process,
            "output" => NodeKind::Output,
            "data_store" | "datastore" => NodeKind::DataStore,
            "external_endpoint" | "endpoint" | "external" => NodeKind::ExternalEndpoint,
            "conditional" | "condition" => NodeKind::Conditional,
            _ => {
                log::warn!("unknown node kind {tag:?}, using {}", Self::FALLBACK.tag());
                Self::FALLBACK
            }
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            NodeKind::Input => "Input",
            NodeKind::Process => "Process",
            NodeKind::Output => "Output",
            NodeKind::DataStore => "Data Store",
            NodeKind::ExternalEndpoint => "External Endpoint",
            NodeKind::Conditional => "Condition",
        }
    }

    /// Accent colour for the node header stripe.
    pub fn accent(self) -> &'static str {
        match self {
            NodeKind::Input => "#34C759",
            NodeKind::Process => "#007AFF",
            NodeKind::Output => "#FF9500",
            NodeKind::DataStore => "#AF52DE",
            NodeKind::ExternalEndpoint => "#5AC8FA",
            NodeKind::Conditional => "#FF3B30",
        }
    }
}

// ─── Payloads ────────────────────────────────────────────────────────────

/// Comparison used by conditional nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::NotEquals => "not_equals",
            Condition::GreaterThan => "greater_than",
            Condition::LessThan => "less_than",
            Condition::Contains => "contains",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "equals" | "==" => Some(Condition::Equals),
            "not_equals" | "!=" => Some(Condition::NotEquals),
            "greater_than" | ">" => Some(Condition::GreaterThan),
            "less_than" | "<" => Some(Condition::LessThan),
            "contains" => Some(Condition::Contains),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputPayload {
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessPayload {
    pub operation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputPayload {
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataStorePayload {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EndpointPayload {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalPayload {
    pub condition: Condition,
    pub value: String,
}

/// Kind-specific node data. The variant *is* the node's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Input(InputPayload),
    Process(ProcessPayload),
    Output(OutputPayload),
    DataStore(DataStorePayload),
    ExternalEndpoint(EndpointPayload),
    Conditional(ConditionalPayload),
}

/// Outcome of writing a single inspector field into a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    /// The key belongs to this kind and the value was stored.
    Applied,
    /// The key belongs to this kind but the value is not acceptable.
    Rejected,
    /// The kind has no such key.
    Unrecognized,
}

impl Payload {
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Input => Payload::Input(InputPayload::default()),
            NodeKind::Process => Payload::Process(ProcessPayload::default()),
            NodeKind::Output => Payload::Output(OutputPayload::default()),
            NodeKind::DataStore => Payload::DataStore(DataStorePayload::default()),
            NodeKind::ExternalEndpoint => Payload::ExternalEndpoint(EndpointPayload::default()),
            NodeKind::Conditional => Payload::Conditional(ConditionalPayload::default()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Payload::Input(_) => NodeKind::Input,
            Payload::Process(_) => NodeKind::Process,
            Payload::Output(_) => NodeKind::Output,
            Payload::DataStore(_) => NodeKind::DataStore,
            Payload::ExternalEndpoint(_) => NodeKind::ExternalEndpoint,
            Payload::Conditional(_) => NodeKind::Conditional,
        }
    }

    /// Field names this kind recognises, in inspector display order.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Payload::Input(_) => &["source"],
            Payload::Process(_) => &["operation"],
            Payload::Output(_) => &["destination"],
            Payload::DataStore(_) => &["table"],
            Payload::ExternalEndpoint(_) => &["url"],
            Payload::Conditional(_) => &["condition", "value"],
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match (self, key) {
            (Payload::Input(p), "source") => Some(&p.source),
            (Payload::Process(p), "operation") => Some(&p.operation),
            (Payload::Output(p), "destination") => Some(&p.destination),
            (Payload::DataStore(p), "table") => Some(&p.table),
            (Payload::ExternalEndpoint(p), "url") => Some(&p.url),
            (Payload::Conditional(p), "condition") => Some(p.condition.as_str()),
            (Payload::Conditional(p), "value") => Some(&p.value),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> FieldUpdate {
        let slot = match self {
            Payload::Input(p) if key == "source" => &mut p.source,
            Payload::Process(p) if key == "operation" => &mut p.operation,
            Payload::Output(p) if key == "destination" => &mut p.destination,
            Payload::DataStore(p) if key == "table" => &mut p.table,
            Payload::ExternalEndpoint(p) if key == "url" => &mut p.url,
            Payload::Conditional(p) if key == "value" => &mut p.value,
            Payload::Conditional(p) if key == "condition" => {
                return match Condition::parse(value) {
                    Some(c) => {
                        p.condition = c;
                        FieldUpdate::Applied
                    }
                    None => FieldUpdate::Rejected,
                };
            }
            _ => return FieldUpdate::Unrecognized,
        };
        value.clone_into(slot);
        FieldUpdate::Applied
    }
}

// ─── Nodes & edges ───────────────────────────────────────────────────────

/// A placed unit on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Logical-space top-left corner. Always finite.
    pub position: Point,
    /// Display text; empty is allowed.
    pub label: String,
    pub payload: Payload,
    /// Inspector fields the kind does not model.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Node {
    /// A node with the kind's default label and payload.
    pub fn new(id: NodeId, kind: NodeKind, position: Point) -> Self {
        Self {
            id,
            position: position.sanitized(),
            label: kind.default_label().to_string(),
            payload: Payload::default_for(kind),
            extra: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// Builder-style label override, used when seeding.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Merge one inspector field. Known keys go to the typed payload, unknown
    /// keys into `extra`. Returns `true` if anything changed.
    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        match self.payload.set(key, value) {
            FieldUpdate::Applied => true,
            FieldUpdate::Rejected => {
                log::warn!("{}: ignoring invalid {key} value {value:?}", self.id);
                false
            }
            FieldUpdate::Unrecognized => {
                let previous = self.extra.insert(key.to_string(), value.to_string());
                previous.as_deref() != Some(value)
            }
        }
    }

    /// Look up a field from either the typed payload or `extra`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .or_else(|| self.extra.get(key).map(String::as_str))
    }

    /// All inspector fields: typed ones first, then extras in key order.
    pub fn fields(&self) -> Vec<(&str, &str)> {
        let typed = self
            .payload
            .keys()
            .iter()
            .filter_map(|k| self.payload.get(k).map(|v| (*k, v)));
        let extra = self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        typed.chain(extra).collect()
    }
}

/// A directed connection between two live nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

/// Why [`FlowGraph::add_edge`] declined to connect two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectRejection {
    SelfLoop,
    Duplicate,
    MissingEndpoint,
}

/// The single selectable item on the canvas: a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Selection {
    Node(NodeId),
    Edge(EdgeId),
}

impl Selection {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Selection::Node(id) => Some(id),
            Selection::Edge(_) => None,
        }
    }

    pub fn edge(self) -> Option<EdgeId> {
        match self {
            Selection::Edge(id) => Some(id),
            Selection::Node(_) => None,
        }
    }
}

// ─── Flow graph ──────────────────────────────────────────────────────────

/// The node/edge store behind one canvas.
///
/// Backed by a `StableDiGraph` so indices survive removals; `id_index` and
/// `edge_index` map public IDs to graph indices. Because stable graphs reuse
/// vacant slots, paint order is tracked separately in `order`.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    pub graph: StableDiGraph<Node, Edge>,
    id_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
    /// Node paint order (insertion order, bottom to top).
    order: Vec<NodeId>,
    /// Edge creation order.
    edge_order: Vec<EdgeId>,
}

impl FlowGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an ID for a new node of `kind` that no live node uses.
    pub fn fresh_id(&self, kind: NodeKind) -> NodeId {
        loop {
            let id = NodeId::with_prefix(kind.tag());
            if !self.id_index.contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert a node on top of the paint order.
    /// Returns `None` (and leaves the graph untouched) if the ID is taken or
    /// contains the edge separator, which would make edge IDs ambiguous.
    pub fn add_node(&mut self, node: Node) -> Option<NodeIndex> {
        let id = node.id;
        if !id.is_valid_node_id() {
            log::warn!("refusing node {id}: ids may not contain {EDGE_SEPARATOR:?}");
            return None;
        }
        if self.id_index.contains_key(&id) {
            log::warn!("refusing to insert duplicate node {id}");
            return None;
        }
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.order.push(id);
        Some(idx)
    }

    /// Remove a node together with every edge that touches it.
    /// Returns the node and the removed edges.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(Node, SmallVec<[Edge; 4]>)> {
        let idx = self.id_index.remove(&id)?;
        let incident: SmallVec<[Edge; 4]> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| *e.weight())
            .collect();
        for edge in &incident {
            self.edge_index.remove(&edge.id);
        }
        self.edge_order.retain(|e| !incident.iter().any(|gone| gone.id == *e));
        self.order.retain(|n| *n != id);
        // petgraph drops incident edges along with the node
        let node = self.graph.remove_node(idx)?;
        Some((node, incident))
    }

    /// Connect `source -> target`, enforcing the no-self-loop and
    /// no-duplicate-pair rules.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId) -> Result<EdgeId, ConnectRejection> {
        if source == target {
            return Err(ConnectRejection::SelfLoop);
        }
        let (Some(&from), Some(&to)) = (self.id_index.get(&source), self.id_index.get(&target))
        else {
            return Err(ConnectRejection::MissingEndpoint);
        };
        if self.graph.find_edge(from, to).is_some() {
            return Err(ConnectRejection::Duplicate);
        }
        let id = EdgeId::between(source, target);
        let idx = self.graph.add_edge(from, to, Edge { id, source, target });
        self.edge_index.insert(id, idx);
        self.edge_order.push(id);
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let idx = self.edge_index.remove(&id)?;
        self.edge_order.retain(|e| *e != id);
        self.graph.remove_edge(idx)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge_index.contains_key(&id)
    }

    /// Whether an edge exists for the ordered pair `source -> target`.
    pub fn has_edge(&self, source: NodeId, target: NodeId) -> bool {
        match (self.index_of(source), self.index_of(target)) {
            (Some(from), Some(to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    /// Nodes in paint order (bottom to top).
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> + '_ {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    /// Edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edge_order.iter().filter_map(|id| self.edge(*id))
    }

    /// Nodes with an edge pointing at `id`.
    pub fn incoming(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Nodes `id` points at.
    pub fn outgoing(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: NodeId, dir: Direction) -> Vec<NodeId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut ids: Vec<NodeId> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n].id)
            .collect();
        // petgraph yields most-recent first; report in a stable order
        ids.sort_by_key(|n| self.order.iter().position(|o| o == n));
        ids
    }

    /// The starter sketch shown on first load: an upstream feed through the
    /// OLT and a splitter check down to subscriber ONTs, with the
    /// subscriber table hanging off the OLT.
    pub fn seeded_topology() -> Self {
        let mut graph = Self::new();
        let seeds = [
            ("upstream", NodeKind::Input, "Upstream Feed", Point::new(40.0, 160.0)),
            ("olt", NodeKind::Process, "OLT", Point::new(260.0, 160.0)),
            ("splitter", NodeKind::Conditional, "Splitter Check", Point::new(480.0, 160.0)),
            ("ont", NodeKind::Output, "Subscriber ONT", Point::new(700.0, 100.0)),
            ("subscribers", NodeKind::DataStore, "Subscribers", Point::new(260.0, 320.0)),
        ];
        for (id, kind, label, pos) in seeds {
            graph.add_node(Node::new(NodeId::intern(id), kind, pos).with_label(label));
        }
        if let Some(olt) = graph.get_mut(NodeId::intern("olt")) {
            olt.set_field("operation", "pppoe-session");
        }
        if let Some(store) = graph.get_mut(NodeId::intern("subscribers")) {
            store.set_field("table", "subscribers");
        }
        let links = [
            ("upstream", "olt"),
            ("olt", "splitter"),
            ("splitter", "ont"),
            ("olt", "subscribers"),
        ];
        for (from, to) in links {
            let _ = graph.add_edge(NodeId::intern(from), NodeId::intern(to));
        }
        graph
    }
}
