//! Scene nodes and modifiers

use super::config::{ArgMap, ModifierConfig};
use super::{NodeId, SceneError};
use crate::registry::{self, Category, OperationDefinition};
use crate::types::{ArgValue, Material};

/// Coordinate-transform modifier attached to a node
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    op: String,
    args: ArgMap,
}

impl Modifier {
    /// Modifier for a positioning operation, without arguments
    pub fn new(op: &str) -> Result<Self, SceneError> {
        positioning_op(op)?;
        Ok(Modifier {
            op: op.to_string(),
            args: ArgMap::new(),
        })
    }

    /// Validated modifier from its configuration
    pub fn from_config(config: &ModifierConfig) -> Result<Self, SceneError> {
        let def = positioning_op(&config.op)?;
        for (name, value) in &config.args {
            check_arg(def, name, value)?;
        }
        Ok(Modifier {
            op: config.op.clone(),
            args: config.args.clone(),
        })
    }

    /// Operation name
    #[inline]
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Literal arguments
    #[inline]
    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    /// Argument by name
    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args.get(name)
    }

    /// Set an argument, returning whether the stored value changed
    pub fn set_arg(&mut self, name: &str, value: ArgValue) -> Result<bool, SceneError> {
        let def = positioning_op(&self.op)?;
        check_arg(def, name, &value)?;
        if self.args.get(name) == Some(&value) {
            return Ok(false);
        }
        self.args.insert(name.to_string(), value);
        Ok(true)
    }

    /// Configuration form
    pub fn to_config(&self) -> ModifierConfig {
        ModifierConfig {
            op: self.op.clone(),
            args: self.args.clone(),
        }
    }
}

/// One node of the scene arena
///
/// Children and parent are arena slots; use [`Scene`](super::Scene) to
/// navigate.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) op: String,
    pub(crate) args: ArgMap,
    pub(crate) material: Material,
    pub(crate) modifiers: Vec<Modifier>,
    pub(crate) children: Vec<usize>,
    pub(crate) parent: Option<usize>,
    pub(crate) id: NodeId,
    pub(crate) name: Option<String>,
}

impl Node {
    /// Operation name
    #[inline]
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Pool-assigned id
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Literal arguments
    #[inline]
    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    /// Argument by name
    pub fn arg(&self, name: &str) -> Option<&ArgValue> {
        self.args.get(name)
    }

    /// Surface colour
    #[inline]
    pub fn material(&self) -> Material {
        self.material
    }

    /// Modifiers in application order
    #[inline]
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    /// Number of children
    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether the node has no parent
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

fn positioning_op(op: &str) -> Result<&'static OperationDefinition, SceneError> {
    let def = registry::lookup(op).map_err(|_| SceneError::UnknownOperation(op.to_string()))?;
    if def.category() != Category::PositioningOp {
        return Err(SceneError::NotAPositioningOp(op.to_string()));
    }
    Ok(def)
}

/// Check that `name` is a literal argument of `def` and `value` has its type
pub(crate) fn check_arg(
    def: &OperationDefinition,
    name: &str,
    value: &ArgValue,
) -> Result<(), SceneError> {
    let decl = def
        .literal_arg(name)
        .ok_or_else(|| SceneError::InvalidArgument {
            op: def.name.to_string(),
            arg: name.to_string(),
            reason: "not a literal argument".to_string(),
        })?;
    if decl.ty != value.ty() {
        return Err(SceneError::InvalidArgument {
            op: def.name.to_string(),
            arg: name.to_string(),
            reason: format!("expected {}, got {}", decl.ty, value.ty()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_modifier_requires_positioning_op() {
        assert!(Modifier::new("opTranslate").is_ok());
        assert_eq!(
            Modifier::new("sdSphere"),
            Err(SceneError::NotAPositioningOp("sdSphere".into()))
        );
        assert_eq!(
            Modifier::new("opWobble"),
            Err(SceneError::UnknownOperation("opWobble".into()))
        );
    }

    #[test]
    fn test_set_arg_reports_change() {
        let mut m = Modifier::new("opTranslate").unwrap();
        let t = ArgValue::from(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(m.set_arg("t", t), Ok(true));
        assert_eq!(m.set_arg("t", t), Ok(false));
        assert_eq!(m.set_arg("t", ArgValue::from(Vec3::new(1.0, 0.0, 0.5))), Ok(true));
    }

    #[test]
    fn test_set_arg_validates() {
        let mut m = Modifier::new("opScale").unwrap();
        assert!(matches!(
            m.set_arg("s", ArgValue::from(Vec3::ONE)),
            Err(SceneError::InvalidArgument { .. })
        ));
        assert!(matches!(
            m.set_arg("p", ArgValue::from(Vec3::ONE)),
            Err(SceneError::InvalidArgument { .. })
        ));
        assert!(m.args().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = ModifierConfig::new("opRotateY").arg("angle", 0.5);
        let m = Modifier::from_config(&config).unwrap();
        assert_eq!(m.arg("angle"), Some(&ArgValue::Float(0.5)));
        assert_eq!(m.to_config(), config);
    }
}
