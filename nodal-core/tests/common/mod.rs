//! In-memory document fixture shared by the integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nodal_core::{Document, GraphNode, NodeId, NodeKind, UpdateContext};

pub type UpdateFn = Box<dyn Fn(&FixtureNode, &dyn UpdateContext) + Send + Sync>;

pub struct FixtureNode {
    id: NodeId,
    kind: NodeKind,
    outputs: Mutex<Vec<NodeId>>,
    owner: Option<NodeId>,
    members: Mutex<Vec<NodeId>>,
    main_thread: bool,
    later_update: bool,
    dirty: AtomicBool,
    runs: AtomicUsize,
    log: Arc<Mutex<Vec<NodeId>>>,
    on_update: Mutex<Option<UpdateFn>>,
}

impl FixtureNode {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn set_on_update(&self, f: UpdateFn) {
        *self.on_update.lock().unwrap() = Some(f);
    }
}

impl GraphNode for FixtureNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn outputs(&self) -> Vec<NodeId> {
        self.outputs.lock().unwrap().clone()
    }

    fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    fn members(&self) -> Vec<NodeId> {
        self.members.lock().unwrap().clone()
    }

    fn update_on_main_thread(&self) -> bool {
        self.main_thread
    }

    fn does_later_update(&self) -> bool {
        self.later_update
    }

    fn force_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    fn update_if_dirty(&self, ctx: &dyn UpdateContext) {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return;
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.id);
        if let Some(f) = self.on_update.lock().unwrap().as_ref() {
            f(self, ctx);
        }
    }
}

pub struct FixtureDoc {
    nodes: Mutex<HashMap<u64, Arc<FixtureNode>>>,
    order: Mutex<Vec<NodeId>>,
    roots: Mutex<HashMap<String, NodeId>>,
    log: Arc<Mutex<Vec<NodeId>>>,
}

impl FixtureDoc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            roots: Mutex::new(HashMap::new()),
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn insert(
        &self,
        kind: NodeKind,
        owner: Option<NodeId>,
        main_thread: bool,
        later_update: bool,
    ) -> NodeId {
        let id = NodeId::new();
        let node = Arc::new(FixtureNode {
            id,
            kind,
            outputs: Mutex::new(Vec::new()),
            owner,
            members: Mutex::new(Vec::new()),
            main_thread,
            later_update,
            dirty: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
            log: self.log.clone(),
            on_update: Mutex::new(None),
        });
        self.nodes.lock().unwrap().insert(id.raw(), node);
        self.order.lock().unwrap().push(id);
        id
    }

    pub fn object(&self) -> NodeId {
        self.insert(NodeKind::Object, None, false, false)
    }

    pub fn main_thread_object(&self) -> NodeId {
        self.insert(NodeKind::Object, None, true, false)
    }

    pub fn later_update_object(&self) -> NodeId {
        self.insert(NodeKind::Object, None, false, true)
    }

    pub fn composite(&self, members: &[NodeId]) -> NodeId {
        let id = self.insert(NodeKind::Composite, None, false, false);
        self.get(id)
            .members
            .lock()
            .unwrap()
            .extend_from_slice(members);
        id
    }

    pub fn port(&self, owner: NodeId) -> NodeId {
        self.insert(NodeKind::DataPort, Some(owner), false, false)
    }

    pub fn root(&self, name: &str) -> NodeId {
        let id = self.insert(NodeKind::DataPort, None, false, false);
        self.roots.lock().unwrap().insert(name.to_string(), id);
        id
    }

    pub fn connect(&self, from: NodeId, to: NodeId) {
        self.get(from).outputs.lock().unwrap().push(to);
    }

    pub fn get(&self, id: NodeId) -> Arc<FixtureNode> {
        self.nodes.lock().unwrap()[&id.raw()].clone()
    }

    pub fn run_log(&self) -> Vec<NodeId> {
        self.log.lock().unwrap().clone()
    }
}

impl Document for FixtureDoc {
    fn nodes(&self) -> Vec<Arc<dyn GraphNode>> {
        let nodes = self.nodes.lock().unwrap();
        self.order
            .lock()
            .unwrap()
            .iter()
            .map(|id| nodes[&id.raw()].clone() as Arc<dyn GraphNode>)
            .collect()
    }

    fn node(&self, id: NodeId) -> Option<Arc<dyn GraphNode>> {
        self.nodes
            .lock()
            .unwrap()
            .get(&id.raw())
            .map(|n| n.clone() as Arc<dyn GraphNode>)
    }

    fn root_data_node(&self, name: &str) -> Option<NodeId> {
        self.roots.lock().unwrap().get(name).copied()
    }
}
