//! Declarative description of a node subtree, appended in one call.

use crate::model::{NodeKind, Value};

/// A node to be created, with its attributes and children.
///
/// ```rust
/// use scene_physics::scene::NodeTemplate;
///
/// let train = NodeTemplate::tag("box")
///     .id("train")
///     .attr("position", "1 0.2 -10")
///     .attr("mass", 26);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    pub kind: NodeKind,
    pub element_id: Option<String>,
    pub attributes: Vec<(String, Value)>,
    pub children: Vec<NodeTemplate>,
}

impl NodeTemplate {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            element_id: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(tag: &str) -> Self {
        Self::new(NodeKind::from_tag(tag))
    }

    pub fn id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: NodeTemplate) -> Self {
        self.children.push(child);
        self
    }
}
