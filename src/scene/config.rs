//! Plain scene configuration
//!
//! The nested, serializable form of a node tree. It is the input to
//! [`Scene::from_config`](super::Scene::from_config) and
//! [`Scene::add_child`](super::Scene::add_child) and the output of
//! [`Scene::to_config`](super::Scene::to_config).
//!
//! ```json
//! {
//!   "op": "opUnion",
//!   "children": [
//!     { "op": "sdSphere", "args": { "r": 1.0 } },
//!     {
//!       "op": "sdSphere",
//!       "args": { "r": 1.0 },
//!       "modifiers": [{ "op": "opTranslate", "args": { "t": [3, 0, 0] } }]
//!     }
//!   ]
//! }
//! ```

use super::NodeId;
use crate::types::{ArgValue, Material};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named literal arguments
pub type ArgMap = BTreeMap<String, ArgValue>;

/// Configuration of one modifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierConfig {
    /// Positioning operation name
    pub op: String,
    /// Literal arguments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: ArgMap,
}

impl ModifierConfig {
    /// Modifier without arguments
    pub fn new(op: impl Into<String>) -> Self {
        ModifierConfig {
            op: op.into(),
            args: ArgMap::new(),
        }
    }

    /// Set an argument (builder)
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// Configuration of one node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Operation name
    pub op: String,
    /// Literal arguments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: ArgMap,
    /// Surface colour (default grey when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    /// Coordinate modifiers, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<ModifierConfig>,
    /// Ordered children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeConfig>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Explicit id (allocated from the pool when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
}

impl NodeConfig {
    /// Node without arguments, modifiers or children
    pub fn new(op: impl Into<String>) -> Self {
        NodeConfig {
            op: op.into(),
            args: ArgMap::new(),
            material: None,
            modifiers: Vec::new(),
            children: Vec::new(),
            name: None,
            id: None,
        }
    }

    /// Set an argument (builder)
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Set the material (builder)
    pub fn material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Append a modifier (builder)
    pub fn modifier(mut self, modifier: ModifierConfig) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Append a child (builder)
    pub fn child(mut self, child: NodeConfig) -> Self {
        self.children.push(child);
        self
    }

    /// Set the display name (builder)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set an explicit id (builder)
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Remove every explicit id in this subtree
    pub fn strip_ids(&mut self) {
        self.id = None;
        for child in &mut self.children {
            child.strip_ids();
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeConfig::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_minimal_json() {
        let config: NodeConfig = serde_json::from_str(r#"{"op": "sdSphere"}"#).unwrap();
        assert_eq!(config, NodeConfig::new("sdSphere"));
        assert_eq!(serde_json::to_string(&config).unwrap(), r#"{"op":"sdSphere"}"#);
    }

    #[test]
    fn test_nested_json() {
        let json = r#"{
            "op": "opUnion",
            "id": 0,
            "children": [
                {"op": "sdSphere", "args": {"r": 1.0}, "name": "ball"},
                {"op": "sdBox", "args": {"b": [1, 2, 3]},
                 "material": {"r": 1, "g": 0, "b": 0},
                 "modifiers": [{"op": "opTranslate", "args": {"t": [3, 0, 0]}}]}
            ]
        }"#;
        let config: NodeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.node_count(), 3);
        assert_eq!(config.id, Some(0));
        let boxed = &config.children[1];
        assert_eq!(boxed.args["b"], ArgValue::Vec3(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(boxed.material, Some(Material::rgb(1.0, 0.0, 0.0)));
        assert_eq!(
            boxed.modifiers[0],
            ModifierConfig::new("opTranslate").arg("t", Vec3::new(3.0, 0.0, 0.0))
        );
        assert_eq!(config.children[0].name.as_deref(), Some("ball"));
    }

    #[test]
    fn test_strip_ids() {
        let mut config = NodeConfig::new("opUnion")
            .with_id(4)
            .child(NodeConfig::new("sdSphere").with_id(9));
        config.strip_ids();
        assert_eq!(config.id, None);
        assert_eq!(config.children[0].id, None);
    }
}
