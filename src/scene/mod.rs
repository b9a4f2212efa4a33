//! Scene graph: an ordered tree of shape and operator nodes
//!
//! Nodes live in an arena addressed by slot index; each node records its
//! parent slot and its ordered child slots. Ids come from the scene's
//! [`IdPool`] and stay unique until released. Every structural mutation
//! emits exactly one [`SceneChange`] to the registered observers, and none
//! when it fails or changes nothing.
//!
//! # Usage
//!
//! ```rust
//! use sdf_scene::prelude::*;
//!
//! let mut scene = Scene::new();
//! let root = scene.root_id();
//! let ball = scene.add_node(root, "sdSphere").unwrap();
//! scene
//!     .push_modifier(ball, ModifierConfig::new("opTranslate").arg("t", Vec3::new(3.0, 0.0, 0.0)))
//!     .unwrap();
//! assert_eq!(scene.node_count(), 2);
//! ```

pub mod config;
pub mod id_pool;
pub mod node;

pub use config::{ArgMap, ModifierConfig, NodeConfig};
pub use id_pool::IdPool;
pub use node::{Modifier, Node};

use crate::registry;
use crate::types::{ArgValue, Material};
use node::check_arg;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Node identifier, unique within a scene while the node is alive
pub type NodeId = u32;

/// Largest id a compiled program stores exactly (programs hold ids as `f32`)
pub const MAX_NODE_ID: NodeId = (1 << 24) - 1;

/// Scene mutation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Operation name not in the registry
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Argument name or type does not match the operation
    #[error("invalid argument '{arg}' for {op}: {reason}")]
    InvalidArgument {
        /// Operation name
        op: String,
        /// Argument name
        arg: String,
        /// What is wrong with it
        reason: String,
    },

    /// Modifier operation is not a positioning operator
    #[error("'{0}' is not a positioning operation")]
    NotAPositioningOp(String),

    /// Children attached to a node that cannot combine them
    #[error("{op} nodes cannot have children")]
    LeafParent {
        /// Operation of the would-be parent
        op: String,
    },

    /// Id already in use
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),

    /// Id is not in use
    #[error("invalid node id {0}")]
    InvalidId(NodeId),

    /// Id does not survive encoding into a program
    #[error("node id {0} exceeds the largest encodable id 16777215")]
    IdOutOfRange(NodeId),

    /// The root cannot be removed or duplicated
    #[error("the scene root cannot be removed or duplicated")]
    RootImmutable,

    /// No live node has this id
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// Modifier index out of range
    #[error("node {id} has no modifier {index}")]
    ModifierNotFound {
        /// Node id
        id: NodeId,
        /// Requested index
        index: usize,
    },
}

/// Structural change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneChange {
    /// A subtree was added
    NodeAdded {
        /// Parent id
        parent: NodeId,
        /// Id of the subtree root
        id: NodeId,
    },
    /// A subtree was removed
    NodeRemoved {
        /// Former parent id
        parent: NodeId,
        /// Id of the removed subtree root
        id: NodeId,
    },
    /// A node was copied under its own parent
    NodeDuplicated {
        /// Original node
        source: NodeId,
        /// Root of the copy
        copy: NodeId,
    },
    /// A node's arguments, material or modifier list changed
    NodeUpdated {
        /// Node id
        id: NodeId,
    },
    /// One modifier argument changed
    ModifierUpdated {
        /// Node id
        id: NodeId,
        /// Modifier index
        index: usize,
    },
}

/// Receiver of scene change notifications
pub trait SceneObserver {
    /// Called once per logical mutation
    fn scene_changed(&mut self, change: &SceneChange);
}

impl<F: FnMut(&SceneChange)> SceneObserver for F {
    fn scene_changed(&mut self, change: &SceneChange) {
        self(change)
    }
}

/// Validated configuration subtree: explicit ids and pre-order modifiers
#[derive(Default)]
struct Plan {
    explicit: HashSet<NodeId>,
    modifiers: Vec<Vec<Modifier>>,
}

/// Mutable scene: one root node, its arena and the id pool
pub struct Scene {
    slots: Vec<Option<Node>>,
    free_slots: Vec<usize>,
    index: HashMap<NodeId, usize>,
    root: usize,
    ids: IdPool,
    observers: Vec<Box<dyn SceneObserver + Send>>,
}

impl Scene {
    /// Empty scene whose root is an `opUnion` with id 0
    pub fn new() -> Self {
        let mut ids = IdPool::new();
        let id = ids.allocate();
        let root = Node {
            op: "opUnion".to_string(),
            args: ArgMap::new(),
            material: Material::default(),
            modifiers: Vec::new(),
            children: Vec::new(),
            parent: None,
            id,
            name: None,
        };
        Scene {
            slots: vec![Some(root)],
            free_slots: Vec::new(),
            index: HashMap::from([(id, 0)]),
            root: 0,
            ids,
            observers: Vec::new(),
        }
    }

    /// Build a scene from a nested configuration
    pub fn from_config(config: &NodeConfig) -> Result<Self, SceneError> {
        let mut scene = Scene {
            slots: Vec::with_capacity(config.node_count()),
            free_slots: Vec::new(),
            index: HashMap::new(),
            root: 0,
            ids: IdPool::new(),
            observers: Vec::new(),
        };
        let plan = scene.plan(config)?;
        scene.root = scene.reserve_and_instantiate(config, None, plan)?;
        debug!(nodes = scene.node_count(), "scene built from config");
        Ok(scene)
    }

    /// Root node
    pub fn root(&self) -> &Node {
        // The root slot is never vacated
        self.slots[self.root]
            .as_ref()
            .unwrap_or_else(|| unreachable!("root slot is always occupied"))
    }

    /// Root id
    pub fn root_id(&self) -> NodeId {
        self.root().id
    }

    /// Live node by id
    pub fn find_by_id(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).and_then(|&slot| self.node_at(slot))
    }

    /// Live node by id, or [`SceneError::NodeNotFound`]
    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.find_by_id(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Children of `node` in order
    pub fn children<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Node> + 'a {
        node.children.iter().filter_map(move |&slot| self.node_at(slot))
    }

    /// Parent of `node`
    pub fn parent(&self, node: &Node) -> Option<&Node> {
        node.parent.and_then(|slot| self.node_at(slot))
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    /// Id pool
    pub fn ids(&self) -> &IdPool {
        &self.ids
    }

    /// Visit every node in pre-order with its depth (root = 0)
    pub fn traverse<F: FnMut(&Node, usize)>(&self, mut visitor: F) {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((slot, depth)) = stack.pop() {
            let Some(node) = self.node_at(slot) else {
                continue;
            };
            visitor(node, depth);
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
    }

    /// Register a change observer
    pub fn subscribe(&mut self, observer: impl SceneObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Instantiate `config` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, config: NodeConfig) -> Result<NodeId, SceneError> {
        let id = self.attach(parent, &config)?;
        debug!(parent, id, op = %config.op, "node added");
        self.notify(SceneChange::NodeAdded { parent, id });
        Ok(id)
    }

    /// Add a node built from the default arguments of `op`
    pub fn add_node(&mut self, parent: NodeId, op: &str) -> Result<NodeId, SceneError> {
        let def = registry::lookup(op).map_err(|_| SceneError::UnknownOperation(op.to_string()))?;
        let config = def
            .default_args()
            .into_iter()
            .fold(NodeConfig::new(op), |config, (name, value)| config.arg(name, value));
        self.add_child(parent, config)
    }

    /// Detach a node and release every id in its subtree
    pub fn remove_child(&mut self, id: NodeId) -> Result<bool, SceneError> {
        let slot = self.slot_of(id)?;
        if slot == self.root {
            return Err(SceneError::RootImmutable);
        }
        let parent_slot = self.slots[slot].as_ref().and_then(|n| n.parent);
        let mut parent = None;
        if let Some(p) = parent_slot.and_then(|p| self.slots[p].as_mut()) {
            p.children.retain(|&c| c != slot);
            parent = Some(p.id);
        }
        let released = self.release_subtree(slot)?;
        debug!(id, released, "node removed");
        if let Some(parent) = parent {
            self.notify(SceneChange::NodeRemoved { parent, id });
        }
        Ok(released > 0)
    }

    /// Copy a node (with its subtree when `recursive`) under the same parent
    pub fn duplicate_node(&mut self, id: NodeId, recursive: bool) -> Result<NodeId, SceneError> {
        let slot = self.slot_of(id)?;
        if slot == self.root {
            return Err(SceneError::RootImmutable);
        }
        let parent = self
            .node_at(slot)
            .and_then(|n| self.parent(n))
            .map(|p| p.id)
            .ok_or(SceneError::NodeNotFound(id))?;
        let mut config = self.config_at(slot, recursive);
        config.strip_ids();
        let copy = self.attach(parent, &config)?;
        debug!(source = id, copy, recursive, "node duplicated");
        self.notify(SceneChange::NodeDuplicated { source: id, copy });
        Ok(copy)
    }

    /// Set a node argument, returning whether it changed
    pub fn set_node_arg(
        &mut self,
        id: NodeId,
        name: &str,
        value: ArgValue,
    ) -> Result<bool, SceneError> {
        let slot = self.slot_of(id)?;
        let node = self.slots[slot].as_mut().ok_or(SceneError::NodeNotFound(id))?;
        let def =
            registry::lookup(&node.op).map_err(|_| SceneError::UnknownOperation(node.op.clone()))?;
        check_arg(def, name, &value)?;
        if node.args.get(name) == Some(&value) {
            return Ok(false);
        }
        node.args.insert(name.to_string(), value);
        trace!(id, arg = name, "node argument set");
        self.notify(SceneChange::NodeUpdated { id });
        Ok(true)
    }

    /// Set a node material, returning whether it changed
    pub fn set_material(&mut self, id: NodeId, material: Material) -> Result<bool, SceneError> {
        let slot = self.slot_of(id)?;
        let node = self.slots[slot].as_mut().ok_or(SceneError::NodeNotFound(id))?;
        if node.material == material {
            return Ok(false);
        }
        node.material = material;
        self.notify(SceneChange::NodeUpdated { id });
        Ok(true)
    }

    /// Append a modifier, returning its index
    pub fn push_modifier(
        &mut self,
        id: NodeId,
        modifier: ModifierConfig,
    ) -> Result<usize, SceneError> {
        let modifier = Modifier::from_config(&modifier)?;
        let slot = self.slot_of(id)?;
        let node = self.slots[slot].as_mut().ok_or(SceneError::NodeNotFound(id))?;
        node.modifiers.push(modifier);
        let index = node.modifiers.len() - 1;
        trace!(id, index, "modifier pushed");
        self.notify(SceneChange::NodeUpdated { id });
        Ok(index)
    }

    /// Remove and return a modifier
    pub fn remove_modifier(&mut self, id: NodeId, index: usize) -> Result<Modifier, SceneError> {
        let slot = self.slot_of(id)?;
        let node = self.slots[slot].as_mut().ok_or(SceneError::NodeNotFound(id))?;
        if index >= node.modifiers.len() {
            return Err(SceneError::ModifierNotFound { id, index });
        }
        let removed = node.modifiers.remove(index);
        self.notify(SceneChange::NodeUpdated { id });
        Ok(removed)
    }

    /// Set a modifier argument, returning whether it changed
    pub fn set_modifier_arg(
        &mut self,
        id: NodeId,
        index: usize,
        name: &str,
        value: ArgValue,
    ) -> Result<bool, SceneError> {
        let slot = self.slot_of(id)?;
        let node = self.slots[slot].as_mut().ok_or(SceneError::NodeNotFound(id))?;
        let modifier = node
            .modifiers
            .get_mut(index)
            .ok_or(SceneError::ModifierNotFound { id, index })?;
        let changed = modifier.set_arg(name, value)?;
        if changed {
            trace!(id, index, arg = name, "modifier argument set");
            self.notify(SceneChange::ModifierUpdated { id, index });
        }
        Ok(changed)
    }

    /// Configuration of the whole scene, ids included
    pub fn to_config(&self) -> NodeConfig {
        self.config_at(self.root, true)
    }

    /// Configuration of one node, with its subtree when `recursive`
    pub fn node_config(&self, id: NodeId, recursive: bool) -> Result<NodeConfig, SceneError> {
        Ok(self.config_at(self.slot_of(id)?, recursive))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn node_at(&self, slot: usize) -> Option<&Node> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn slot_of(&self, id: NodeId) -> Result<usize, SceneError> {
        self.index.get(&id).copied().ok_or(SceneError::NodeNotFound(id))
    }

    fn notify(&mut self, change: SceneChange) {
        for observer in &mut self.observers {
            observer.scene_changed(&change);
        }
    }

    /// Validate then instantiate under `parent`, without notifying
    fn attach(&mut self, parent: NodeId, config: &NodeConfig) -> Result<NodeId, SceneError> {
        let parent_slot = self.slot_of(parent)?;
        let parent_node = self.node_at(parent_slot).ok_or(SceneError::NodeNotFound(parent))?;
        let parent_def = registry::lookup(&parent_node.op)
            .map_err(|_| SceneError::UnknownOperation(parent_node.op.clone()))?;
        if !parent_def.category().is_combiner() {
            return Err(SceneError::LeafParent {
                op: parent_node.op.clone(),
            });
        }
        let plan = self.plan(config)?;
        let slot = self.reserve_and_instantiate(config, Some(parent_slot), plan)?;
        if let Some(p) = self.slots[parent_slot].as_mut() {
            p.children.push(slot);
        }
        self.node_at(slot)
            .map(|n| n.id)
            .ok_or(SceneError::NodeNotFound(parent))
    }

    /// Check a configuration subtree before anything is allocated
    fn plan(&self, config: &NodeConfig) -> Result<Plan, SceneError> {
        let mut plan = Plan::default();
        self.validate(config, &mut plan)?;
        Ok(plan)
    }

    fn validate(&self, config: &NodeConfig, plan: &mut Plan) -> Result<(), SceneError> {
        let def = registry::lookup(&config.op)
            .map_err(|_| SceneError::UnknownOperation(config.op.clone()))?;
        for (name, value) in &config.args {
            check_arg(def, name, value)?;
        }
        let modifiers = config
            .modifiers
            .iter()
            .map(Modifier::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        plan.modifiers.push(modifiers);
        if !config.children.is_empty() && !def.category().is_combiner() {
            return Err(SceneError::LeafParent {
                op: config.op.clone(),
            });
        }
        if let Some(id) = config.id {
            if id > MAX_NODE_ID {
                return Err(SceneError::IdOutOfRange(id));
            }
            if self.ids.is_used(id) || !plan.explicit.insert(id) {
                return Err(SceneError::DuplicateId(id));
            }
        }
        config
            .children
            .iter()
            .try_for_each(|child| self.validate(child, plan))
    }

    /// Claim every explicit id of a planned subtree, then build it
    ///
    /// Explicit ids are registered before any id is allocated, so an
    /// allocation earlier in pre-order never takes an id the subtree names
    /// further down.
    fn reserve_and_instantiate(
        &mut self,
        config: &NodeConfig,
        parent: Option<usize>,
        plan: Plan,
    ) -> Result<usize, SceneError> {
        // Validation already ruled out duplicates and out-of-range ids
        for &id in &plan.explicit {
            self.ids.register(id)?;
        }
        let mut modifiers = plan.modifiers.into_iter();
        Ok(self.instantiate(config, parent, &mut modifiers))
    }

    /// Allocate ids and slots for a planned configuration
    fn instantiate(
        &mut self,
        config: &NodeConfig,
        parent: Option<usize>,
        modifiers: &mut std::vec::IntoIter<Vec<Modifier>>,
    ) -> usize {
        let id = config.id.unwrap_or_else(|| self.ids.allocate());
        let node = Node {
            op: config.op.clone(),
            args: config.args.clone(),
            material: config.material.unwrap_or_default(),
            modifiers: modifiers.next().unwrap_or_default(),
            children: Vec::with_capacity(config.children.len()),
            parent,
            id,
            name: config.name.clone(),
        };
        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        trace!(id, slot, op = %config.op, "node instantiated");

        let children = config
            .children
            .iter()
            .map(|child| self.instantiate(child, Some(slot), modifiers))
            .collect();
        if let Some(node) = self.slots[slot].as_mut() {
            node.children = children;
        }
        slot
    }

    /// Vacate a subtree's slots and release its ids, returning the node count
    fn release_subtree(&mut self, slot: usize) -> Result<usize, SceneError> {
        let Some(node) = self.slots.get_mut(slot).and_then(Option::take) else {
            return Ok(0);
        };
        self.free_slots.push(slot);
        self.index.remove(&node.id);
        self.ids.release(node.id)?;
        let mut released = 1;
        for child in node.children {
            released += self.release_subtree(child)?;
        }
        Ok(released)
    }

    fn config_at(&self, slot: usize, recursive: bool) -> NodeConfig {
        let Some(node) = self.node_at(slot) else {
            return NodeConfig::new("opUnion");
        };
        NodeConfig {
            op: node.op.clone(),
            args: node.args.clone(),
            material: Some(node.material),
            modifiers: node.modifiers.iter().map(Modifier::to_config).collect(),
            children: if recursive {
                node.children
                    .iter()
                    .map(|&c| self.config_at(c, true))
                    .collect()
            } else {
                Vec::new()
            },
            name: node.name.clone(),
            id: Some(node.id),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("root", &self.root_id())
            .field("nodes", &self.node_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}
