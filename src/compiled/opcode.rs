//! Opcode decoding for the stack machine
//!
//! Registry operations use their own stable codes (below 192). Two control
//! codes sit above every registry band.

use crate::registry::{self, OperationDefinition};

/// Control instructions of the stack machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Control {
    /// Combiner without children: pushes the empty distance
    Empty = 254,
    /// Restores the point and scale saved by the matching modifier
    PopContext = 255,
}

impl Control {
    /// Opcode value
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Kernel constant name
    pub fn constant_name(self) -> &'static str {
        match self {
            Control::Empty => "OPCODE_EMPTY",
            Control::PopContext => "OPCODE_POP_CONTEXT",
        }
    }

    /// Disassembly mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            Control::Empty => "EMPTY",
            Control::PopContext => "POP_CONTEXT",
        }
    }
}

/// Meaning of one opcode slot
#[derive(Clone, Copy, Debug)]
pub enum Decoded {
    /// Registry operation
    Operation(&'static OperationDefinition),
    /// Control instruction
    Control(Control),
}

/// Decode an opcode slot; `None` for non-integral or unknown codes
pub fn decode(value: f32) -> Option<Decoded> {
    if !(0.0..=255.0).contains(&value) || value.fract() != 0.0 {
        return None;
    }
    match value as u16 {
        254 => Some(Decoded::Control(Control::Empty)),
        255 => Some(Decoded::Control(Control::PopContext)),
        code => registry::by_code(code).map(Decoded::Operation),
    }
}

/// Kernel constant name of a registry operation: `sdSphere` → `OPCODE_SD_SPHERE`
pub fn constant_name(op: &str) -> String {
    let mut out = String::from("OPCODE_");
    let mut prev_lower = false;
    for c in op.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        out.push(c.to_ascii_uppercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_names() {
        assert_eq!(constant_name("sdSphere"), "OPCODE_SD_SPHERE");
        assert_eq!(constant_name("opRotateX"), "OPCODE_OP_ROTATE_X");
        assert_eq!(constant_name("opSmoothUnion"), "OPCODE_OP_SMOOTH_UNION");
    }

    #[test]
    fn test_constant_names_are_unique() {
        let mut names: Vec<String> = registry::all().map(|d| constant_name(d.name)).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_decode() {
        assert!(matches!(decode(0.0), Some(Decoded::Operation(d)) if d.name == "sdSphere"));
        assert!(matches!(decode(254.0), Some(Decoded::Control(Control::Empty))));
        assert!(matches!(decode(255.0), Some(Decoded::Control(Control::PopContext))));
        assert!(decode(0.5).is_none());
        assert!(decode(-1.0).is_none());
        assert!(decode(200.0).is_none());
        assert!(decode(f32::NAN).is_none());
    }

    #[test]
    fn test_control_codes_outside_registry_bands() {
        for control in [Control::Empty, Control::PopContext] {
            assert!(registry::by_code(control.code()).is_none());
        }
    }
}
