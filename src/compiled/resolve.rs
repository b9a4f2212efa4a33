//! Scene-to-tree resolution shared by the backends
//!
//! Every backend (expression compiler, bytecode compiler, reference
//! evaluator) calls [`ResolvedNode::build`] on its own, so each compilation
//! validates the scene it is handed without relying on an earlier pass.

use super::{CompileError, MAX_FRAME_STACK, MAX_VALUE_STACK};
use crate::registry::{
    self, BlendRule, BooleanFn, DisplaceFn, OpKind, OperationDefinition, PositionFn, ScaleRule,
    ShapeFn,
};
use crate::scene::{ArgMap, Node, NodeId, Scene, MAX_NODE_ID};
use crate::types::Material;
use std::collections::BTreeSet;

/// What a node does with its children
#[derive(Debug, Clone, Copy)]
pub(crate) enum Role {
    /// Leaf shape; children are ignored
    Shape(ShapeFn),
    /// Left fold of children through a CSG combiner
    Boolean {
        eval: BooleanFn,
        blend: BlendRule,
    },
    /// Left fold of children through a point-aware combiner
    Displacement(DisplaceFn),
}

/// Positioning modifier with its literal operands
#[derive(Debug, Clone)]
pub(crate) struct ResolvedModifier {
    pub def: &'static OperationDefinition,
    pub literals: Vec<f32>,
    pub eval: PositionFn,
    pub scale: ScaleRule,
}

/// Validated node with flattened literals
#[derive(Debug, Clone)]
pub(crate) struct ResolvedNode {
    pub id: NodeId,
    pub def: &'static OperationDefinition,
    pub role: Role,
    pub literals: Vec<f32>,
    pub material: Material,
    pub modifiers: Vec<ResolvedModifier>,
    pub children: Vec<ResolvedNode>,
}

impl ResolvedNode {
    /// Resolve and validate the subtree rooted at `node`
    pub fn build(scene: &Scene, node: &Node) -> Result<Self, CompileError> {
        let id = node.id();
        if id > MAX_NODE_ID {
            return Err(CompileError::IdOutOfRange(id));
        }
        let def = registry::lookup(node.op()).map_err(|_| CompileError::UnknownOperation {
            node: id,
            op: node.op().to_string(),
        })?;

        let role = match def.kind {
            OpKind::Distance(f) | OpKind::Primitive(f) => Role::Shape(f),
            OpKind::Boolean { eval, blend } => {
                let count = def.literal_width();
                if count > 1 {
                    return Err(CompileError::TooManyBlendArguments {
                        node: id,
                        op: def.name,
                        count,
                    });
                }
                Role::Boolean { eval, blend }
            }
            OpKind::Displacement(f) => Role::Displacement(f),
            OpKind::Positioning { .. } => {
                return Err(CompileError::UnsupportedCategory {
                    node: id,
                    op: def.name,
                    category: def.category(),
                    position: "as a node",
                })
            }
        };

        let literals = literal_operands(id, def, node.args())?;

        let modifiers = node
            .modifiers()
            .iter()
            .map(|m| {
                let mdef = registry::lookup(m.op()).map_err(|_| CompileError::UnknownOperation {
                    node: id,
                    op: m.op().to_string(),
                })?;
                let OpKind::Positioning { eval, scale } = mdef.kind else {
                    return Err(CompileError::UnsupportedCategory {
                        node: id,
                        op: mdef.name,
                        category: mdef.category(),
                        position: "as a modifier",
                    });
                };
                Ok(ResolvedModifier {
                    def: mdef,
                    literals: literal_operands(id, mdef, m.args())?,
                    eval,
                    scale,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Shapes ignore children, so they are not compiled either
        let children = match role {
            Role::Shape(_) => Vec::new(),
            _ => scene
                .children(node)
                .map(|child| ResolvedNode::build(scene, child))
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(ResolvedNode {
            id,
            def,
            role,
            literals,
            material: node.material(),
            modifiers,
            children,
        })
    }

    /// Resolve the subtree rooted at node `id`
    pub fn build_at(scene: &Scene, id: NodeId) -> Result<Self, CompileError> {
        let node = scene.find_by_id(id).ok_or(CompileError::NodeNotFound(id))?;
        Self::build(scene, node)
    }

    /// Number of compiled nodes
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ResolvedNode::count).sum::<usize>()
    }

    /// Peak value-stack and frame-stack depth of the encoded program
    ///
    /// Child `i` of a combiner is evaluated while `min(i, 1)` earlier results
    /// are still on the stack.
    pub fn stack_depths(&self) -> (usize, usize) {
        let (value, frame) = match self.role {
            Role::Shape(_) => (1, 0),
            _ if self.children.is_empty() => (1, 0),
            _ => self
                .children
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    let (v, f) = child.stack_depths();
                    (v + i.min(1), f)
                })
                .fold((0, 0), |(v, f), (cv, cf)| (v.max(cv), f.max(cf))),
        };
        (value, frame + self.modifiers.len())
    }

    /// Check the stack depths against the stack machine's limits
    pub fn check_stack_depths(&self) -> Result<(), CompileError> {
        let (value, frame) = self.stack_depths();
        if value > MAX_VALUE_STACK {
            return Err(CompileError::StackOverflow {
                kind: "value",
                required: value,
                limit: MAX_VALUE_STACK,
            });
        }
        if frame > MAX_FRAME_STACK {
            return Err(CompileError::StackOverflow {
                kind: "frame",
                required: frame,
                limit: MAX_FRAME_STACK,
            });
        }
        Ok(())
    }

    /// Opcodes of every operation the subtree references (nodes and modifiers)
    pub fn collect_opcodes(&self, out: &mut BTreeSet<u16>) {
        out.insert(self.def.code);
        out.extend(self.modifiers.iter().map(|m| m.def.code));
        for child in &self.children {
            child.collect_opcodes(out);
        }
    }
}

/// Flatten the literal arguments of `def` in declaration order
fn literal_operands(
    node: NodeId,
    def: &'static OperationDefinition,
    args: &ArgMap,
) -> Result<Vec<f32>, CompileError> {
    let mut out = Vec::with_capacity(def.literal_width());
    for decl in def.literal_args() {
        let value = args.get(decl.name).ok_or(CompileError::MissingArgument {
            node,
            op: def.name,
            arg: decl.name,
        })?;
        if value.ty() != decl.ty {
            return Err(CompileError::InvalidArgument {
                node,
                op: def.name,
                arg: decl.name,
                expected: decl.ty,
                found: value.ty(),
            });
        }
        value.flatten_into(&mut out);
    }
    Ok(out)
}

/// Add the registry dependencies of `codes`, transitively
pub(crate) fn with_dependencies(codes: &BTreeSet<u16>) -> BTreeSet<u16> {
    let mut out = BTreeSet::new();
    let mut pending: Vec<u16> = codes.iter().copied().collect();
    while let Some(code) = pending.pop() {
        if !out.insert(code) {
            continue;
        }
        if let Some(def) = registry::by_code(code) {
            pending.extend(
                def.deps
                    .iter()
                    .filter_map(|dep| registry::lookup(dep).ok())
                    .map(|dep| dep.code),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ModifierConfig, NodeConfig};
    use glam::Vec3;

    fn sphere() -> NodeConfig {
        NodeConfig::new("sdSphere").arg("r", 1.0)
    }

    #[test]
    fn test_literals_in_declaration_order() {
        let config = NodeConfig::new("sdCapsule")
            .arg("r", 0.25)
            .arg("b", Vec3::new(4.0, 5.0, 6.0))
            .arg("a", Vec3::new(1.0, 2.0, 3.0));
        let scene = Scene::from_config(&config).unwrap();
        let tree = ResolvedNode::build(&scene, scene.root()).unwrap();
        assert_eq!(tree.literals, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.25]);
    }

    #[test]
    fn test_missing_argument_names_node() {
        let config = NodeConfig::new("opUnion").child(NodeConfig::new("sdSphere").with_id(7));
        let scene = Scene::from_config(&config).unwrap();
        let err = ResolvedNode::build(&scene, scene.root()).unwrap_err();
        assert_eq!(
            err,
            CompileError::MissingArgument {
                node: 7,
                op: "sdSphere",
                arg: "r"
            }
        );
    }

    #[test]
    fn test_positioning_node_rejected() {
        let config = NodeConfig::new("opTranslate").arg("t", Vec3::ZERO);
        let scene = Scene::from_config(&config).unwrap();
        assert!(matches!(
            ResolvedNode::build(&scene, scene.root()),
            Err(CompileError::UnsupportedCategory { position: "as a node", .. })
        ));
    }

    #[test]
    fn test_stack_depths() {
        // union(a, union(b, c)) keeps one result while the inner union runs
        let config = NodeConfig::new("opUnion").child(sphere()).child(
            NodeConfig::new("opUnion")
                .child(sphere())
                .child(sphere().modifier(ModifierConfig::new("opScale").arg("s", 2.0)))
                .modifier(ModifierConfig::new("opTranslate").arg("t", Vec3::X)),
        );
        let scene = Scene::from_config(&config).unwrap();
        let tree = ResolvedNode::build(&scene, scene.root()).unwrap();
        assert_eq!(tree.stack_depths(), (3, 2));
        assert_eq!(tree.count(), 5);
    }

    #[test]
    fn test_empty_combiner_depth() {
        let scene = Scene::new();
        let tree = ResolvedNode::build(&scene, scene.root()).unwrap();
        assert_eq!(tree.stack_depths(), (1, 0));
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_dependencies_are_transitive() {
        let round_box = registry::lookup("sdRoundBox").unwrap().code;
        let boxed = registry::lookup("sdBox").unwrap().code;
        let codes = with_dependencies(&BTreeSet::from([round_box]));
        assert_eq!(codes, BTreeSet::from([boxed, round_box]));
    }
}
