use rustc_hash::FxHashMap;

use crate::attrs::AttrValue;

/// An operation record from an imported graph description.
///
/// External nodes are produced by a format parser and are read-only input to
/// [`Lowerer`](crate::Lowerer). Inputs and outputs refer to values by name.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalNode {
    /// Debug name of the node.
    pub name: Option<String>,

    /// Operator type, eg. "ArgMax".
    pub op_type: String,

    /// Names of input values, in operator input order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub inputs: Vec<String>,

    /// Names of output values.
    #[cfg_attr(feature = "serde", serde(default))]
    pub outputs: Vec<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: FxHashMap<String, AttrValue>,
}

impl ExternalNode {
    pub fn new(op_type: &str) -> ExternalNode {
        ExternalNode {
            op_type: op_type.to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add or replace an attribute.
    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Return the name of the value this node produces.
    ///
    /// This is the first output, falling back to the node name.
    pub fn output_name(&self) -> Option<&str> {
        self.outputs
            .first()
            .map(|s| s.as_str())
            .or(self.name.as_deref())
    }
}
