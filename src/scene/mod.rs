//! # Live Scene Graph
//!
//! The observable node store that scripts, network clients and the physics
//! bridge all mutate. It uses HashMaps behind `parking_lot` locks, and it
//! releases every lock before calling out to observers or listeners, so
//! callbacks may freely read and write the scene again.
//!
//! ## Contracts
//!
//! - `set` validates, commits, then notifies. A rejected value leaves the
//!   slot untouched and notifies nobody.
//! - Observers for a `(node, property)` pair run synchronously, in
//!   registration order. The first failure aborts the chain and is returned
//!   to the caller of `set`; the committed value is not rolled back.
//! - Structural changes on connected nodes are announced to every
//!   [`SceneListener`] as [`SceneEvent`]s.

mod observer;
mod template;

pub use observer::{ChangeOrigin, ObserverFn, ObserverId, PropertyChange};
pub use template::NodeTemplate;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::trace;
use uuid::Uuid;

use crate::model::*;
use crate::sim::BodySnapshot;
use crate::{Error, Result};
use observer::{dispatch, ObserverTable};

// ============================================================================
// Mutation events
// ============================================================================

/// Structural change to the connected part of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// `node` (and its whole subtree) became reachable from the root.
    NodeAppended { parent: NodeId, node: NodeId },
    /// `node` (and its whole subtree) was detached from the root.
    NodeRemoved { parent: NodeId, node: NodeId },
}

/// Subscriber to [`SceneEvent`]s.
pub trait SceneListener: Send + Sync {
    fn on_event(&self, scene: &Scene, event: &SceneEvent) -> Result<()>;
}

/// Handle returned by [`Scene::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

// ============================================================================
// Body handles attached by the physics bridge
// ============================================================================

/// Control surface a simulation attaches to a bound node.
///
/// This is the only reference the graph holds into the simulation.
pub trait BodyLink: Send + Sync {
    /// Read-only copy of the live body, if it still exists.
    fn snapshot(&self) -> Option<BodySnapshot>;

    /// Instantaneous impulse applied at a world-space point.
    fn apply_impulse(&self, impulse: Vector, world_point: Vector) -> Result<()>;

    /// Force re-applied before every step until cleared.
    fn set_persistent_force(&self, force: Vector) -> Result<()>;

    fn clear_persistent_force(&self) -> Result<()>;
}

// ============================================================================
// Scene
// ============================================================================

/// Shared handle to one scene graph. Cloning is cheap.
#[derive(Clone)]
pub struct Scene {
    inner: Arc<SceneInner>,
}

struct SceneInner {
    root: NodeId,
    nodes: RwLock<HashMap<NodeId, Node>>,
    observers: RwLock<ObserverTable>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn SceneListener>)>>,
    links: RwLock<HashMap<NodeId, Arc<dyn BodyLink>>>,
    next_node_id: AtomicU64,
    next_observer_id: AtomicU64,
    next_listener_id: AtomicU64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// An empty scene containing only its root node.
    pub fn new() -> Self {
        let root = NodeId(1);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new(root, NodeKind::Scene));
        Self {
            inner: Arc::new(SceneInner {
                root,
                nodes: RwLock::new(nodes),
                observers: RwLock::new(ObserverTable::default()),
                listeners: RwLock::new(Vec::new()),
                links: RwLock::new(HashMap::new()),
                next_node_id: AtomicU64::new(2),
                next_observer_id: AtomicU64::new(1),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    // ========================================================================
    // Node creation and structure
    // ========================================================================

    /// Create a detached node. It joins the live graph once appended.
    pub fn create_node(&self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        self.inner.nodes.write().insert(id, Node::new(id, kind));
        id
    }

    /// Build a detached subtree from `template`, then append it under `parent`.
    ///
    /// Attributes are validated like any `set`. If one is rejected, nothing is
    /// appended and the partially built subtree is discarded.
    pub fn append(&self, parent: NodeId, template: NodeTemplate) -> Result<NodeId> {
        self.require(parent)?;
        let id = match self.build(&template) {
            Ok(id) => id,
            Err((partial, e)) => {
                if let Some(partial) = partial {
                    self.discard(partial);
                }
                return Err(e);
            }
        };
        self.append_child(parent, id)?;
        Ok(id)
    }

    fn build(&self, template: &NodeTemplate) -> std::result::Result<NodeId, (Option<NodeId>, Error)> {
        let id = self.create_node(template.kind.clone());
        {
            let mut nodes = self.inner.nodes.write();
            let Some(node) = nodes.get_mut(&id) else {
                return Err((None, Error::NotFound(format!("Node {id}"))));
            };
            node.element_id.clone_from(&template.element_id);
            for (name, value) in &template.attributes {
                if !node.has_property(name) {
                    node.declare_text(name);
                }
                let assigned = node
                    .properties
                    .get_mut(name.as_str())
                    .map(|slot| slot.assign(name, value.clone()).map(|_| ()));
                if let Some(Err(e)) = assigned {
                    return Err((Some(id), e));
                }
            }
        }
        for child in &template.children {
            let child_id = match self.build(child) {
                Ok(child_id) => child_id,
                Err((partial, e)) => {
                    if let Some(partial) = partial {
                        self.discard(partial);
                    }
                    return Err((Some(id), e));
                }
            };
            self.link(id, child_id).map_err(|e| (Some(id), e))?;
        }
        Ok(id)
    }

    /// Drop a detached subtree from the store.
    fn discard(&self, id: NodeId) {
        let mut nodes = self.inner.nodes.write();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = nodes.remove(&next) {
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Attach a detached node under `parent`.
    ///
    /// Listeners hear about it only when `parent` is connected to the root.
    /// A listener failure is returned, but the node stays appended.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.link(parent, child)?;
        if self.is_connected(parent) {
            trace!(%parent, %child, "node appended");
            self.emit(&SceneEvent::NodeAppended { parent, node: child })?;
        }
        Ok(())
    }

    fn link(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut nodes = self.inner.nodes.write();
        if !nodes.contains_key(&parent) {
            return Err(Error::NotFound(format!("Node {parent}")));
        }
        let Some(node) = nodes.get(&child) else {
            return Err(Error::NotFound(format!("Node {child}")));
        };
        if node.parent.is_some() || child == self.inner.root {
            return Err(Error::InvalidTree(format!("Node {child} already has a parent")));
        }
        // Refuse cycles: `parent` must not sit inside `child`'s subtree.
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(Error::InvalidTree(format!(
                    "Cannot append node {child} inside its own subtree"
                )));
            }
            cursor = nodes.get(&id).and_then(|n| n.parent);
        }
        if let Some(node) = nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(p) = nodes.get_mut(&parent) {
            p.children.push(child);
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The subtree stays in the store and can be
    /// appended again.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let was_connected = self.is_connected(parent);
        {
            let mut nodes = self.inner.nodes.write();
            match nodes.get(&child) {
                Some(node) if node.parent == Some(parent) => {}
                Some(_) => {
                    return Err(Error::InvalidTree(format!(
                        "Node {child} is not a child of node {parent}"
                    )));
                }
                None => return Err(Error::NotFound(format!("Node {child}"))),
            }
            if let Some(p) = nodes.get_mut(&parent) {
                p.children.retain(|c| *c != child);
            }
            if let Some(node) = nodes.get_mut(&child) {
                node.parent = None;
            }
        }
        if was_connected {
            trace!(%parent, %child, "node removed");
            self.emit(&SceneEvent::NodeRemoved { parent, node: child })?;
        }
        Ok(())
    }

    /// True when `id` is reachable from the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let nodes = self.inner.nodes.read();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.inner.root {
                return true;
            }
            cursor = nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    // ========================================================================
    // Node queries
    // ========================================================================

    /// Copy of a node, including its slots.
    pub fn node(&self, id: NodeId) -> Result<Node> {
        self.inner
            .nodes
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.nodes.read().contains_key(&id)
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        self.with_node(id, |n| n.kind.clone())
    }

    pub fn uuid(&self, id: NodeId) -> Result<Uuid> {
        self.with_node(id, |n| n.uuid)
    }

    pub fn element_id(&self, id: NodeId) -> Result<Option<String>> {
        self.with_node(id, |n| n.element_id.clone())
    }

    pub fn set_element_id(&self, id: NodeId, element_id: Option<String>) -> Result<()> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        node.element_id = element_id;
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        self.with_node(id, |n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.with_node(id, |n| n.children.to_vec())
    }

    /// Every node below `id`, in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let nodes = self.inner.nodes.read();
        let node = nodes.get(&id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(n) = nodes.get(&next) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// First connected node carrying the given element id.
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        let connected = self.descendants(self.root()).ok()?;
        let nodes = self.inner.nodes.read();
        connected
            .into_iter()
            .find(|id| nodes.get(id).and_then(|n| n.element_id.as_deref()) == Some(element_id))
    }

    /// Connected nodes of one kind, in document order.
    pub fn elements_by_kind(&self, kind: &NodeKind) -> Vec<NodeId> {
        let connected = self.descendants(self.root()).unwrap_or_default();
        let nodes = self.inner.nodes.read();
        connected
            .into_iter()
            .filter(|id| nodes.get(id).is_some_and(|n| &n.kind == kind))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    fn with_node<T>(&self, id: NodeId, f: impl FnOnce(&Node) -> T) -> Result<T> {
        let nodes = self.inner.nodes.read();
        let node = nodes.get(&id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        Ok(f(node))
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Node {id}")))
        }
    }

    // ========================================================================
    // Property access
    // ========================================================================

    /// Current value of a property, materializing its default on first access.
    pub fn get(&self, id: NodeId, property: &str) -> Result<Value> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        let slot = node
            .properties
            .get_mut(property)
            .ok_or_else(|| Error::NotFound(format!("Property '{property}' on node {id}")))?;
        Ok(slot.get().clone())
    }

    pub fn get_vector(&self, id: NodeId, property: &str) -> Result<Vector> {
        let value = self.get(id, property)?;
        value.as_vector().ok_or_else(|| type_error("VECTOR", &value))
    }

    pub fn get_rotation(&self, id: NodeId, property: &str) -> Result<Rotation> {
        let value = self.get(id, property)?;
        value.as_rotation().ok_or_else(|| type_error("ROTATION", &value))
    }

    pub fn get_scalar(&self, id: NodeId, property: &str) -> Result<f64> {
        let value = self.get(id, property)?;
        value.as_scalar().ok_or_else(|| type_error("SCALAR", &value))
    }

    pub fn get_text(&self, id: NodeId, property: &str) -> Result<String> {
        let value = self.get(id, property)?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| type_error("TEXT", &value))
    }

    /// Assign a property on behalf of an external actor.
    ///
    /// Accepts a value of the declared kind or its textual form.
    pub fn set(&self, id: NodeId, property: &str, value: impl Into<Value>) -> Result<()> {
        self.set_from(id, property, value.into(), ChangeOrigin::External)
    }

    /// Assign a property, tagging the notification with its origin.
    pub fn set_from(
        &self,
        id: NodeId,
        property: &str,
        value: Value,
        origin: ChangeOrigin,
    ) -> Result<()> {
        let committed = {
            let mut nodes = self.inner.nodes.write();
            let node = nodes.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
            let slot = node
                .properties
                .get_mut(property)
                .ok_or_else(|| Error::NotFound(format!("Property '{property}' on node {id}")))?;
            slot.assign(property, value)?.clone()
        };
        self.notify(id, property, committed, origin)
    }

    /// Mutate one component of a vector property in place.
    ///
    /// Goes through the same validation and notification as `set`, so a
    /// direct component edit is observed exactly like a reassignment.
    pub fn update_vector(
        &self,
        id: NodeId,
        property: &str,
        f: impl FnOnce(&mut Vector),
    ) -> Result<()> {
        let mut v = self.get_vector(id, property)?;
        f(&mut v);
        self.set_from(id, property, Value::Vector(v), ChangeOrigin::External)
    }

    /// Mutate one component of a rotation property in place.
    pub fn update_rotation(
        &self,
        id: NodeId,
        property: &str,
        f: impl FnOnce(&mut Rotation),
    ) -> Result<()> {
        let mut r = self.get_rotation(id, property)?;
        f(&mut r);
        self.set_from(id, property, Value::Rotation(r), ChangeOrigin::External)
    }

    fn notify(&self, node: NodeId, property: &str, value: Value, origin: ChangeOrigin) -> Result<()> {
        let observers = self.inner.observers.read().snapshot(node, property);
        if observers.is_empty() {
            return Ok(());
        }
        let change = PropertyChange {
            node,
            property: property.to_string(),
            value,
            origin,
        };
        dispatch(&observers, &change)
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Register `callback` for changes to `property` on `node`.
    pub fn add_property_change_observer<F>(
        &self,
        node: NodeId,
        property: &str,
        callback: F,
    ) -> Result<ObserverId>
    where
        F: Fn(&PropertyChange) -> Result<()> + Send + Sync + 'static,
    {
        let declared = self.with_node(node, |n| n.has_property(property))?;
        if !declared {
            return Err(Error::NotFound(format!("Property '{property}' on node {node}")));
        }
        let id = ObserverId(self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .write()
            .insert(id, node, property, Arc::new(callback));
        Ok(id)
    }

    pub fn remove_property_change_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.write().remove(id)
    }

    pub fn observer_count(&self, node: NodeId, property: &str) -> usize {
        self.inner.observers.read().count(node, property)
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn subscribe(&self, listener: Arc<dyn SceneListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    fn emit(&self, event: &SceneEvent) -> Result<()> {
        let listeners: Vec<Arc<dyn SceneListener>> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener.on_event(self, event)?;
        }
        Ok(())
    }

    // ========================================================================
    // Body links
    // ========================================================================

    pub fn attach_body(&self, id: NodeId, link: Arc<dyn BodyLink>) {
        self.inner.links.write().insert(id, link);
    }

    pub fn detach_body(&self, id: NodeId) -> Option<Arc<dyn BodyLink>> {
        self.inner.links.write().remove(&id)
    }

    /// The simulation control surface attached to `id`, if it is bound.
    pub fn body(&self, id: NodeId) -> Option<Arc<dyn BodyLink>> {
        self.inner.links.read().get(&id).cloned()
    }
}

fn type_error(expected: &str, got: &Value) -> Error {
    Error::TypeError {
        expected: expected.into(),
        got: got.type_name().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_append_template() {
        let scene = Scene::new();
        let train = scene
            .append(
                scene.root(),
                NodeTemplate::tag("box").id("train").attr("position", "1 0.2 -10").attr("mass", 26),
            )
            .unwrap();

        assert_eq!(scene.element_by_id("train"), Some(train));
        assert_eq!(scene.get_vector(train, "position").unwrap(), Vector::new(1.0, 0.2, -10.0));
        assert_eq!(scene.get_scalar(train, "mass").unwrap(), 26.0);
        assert_eq!(scene.get_text(train, "material").unwrap(), "default");
    }

    #[test]
    fn test_append_rejects_bad_attribute_and_discards() {
        let scene = Scene::new();
        let before = scene.node_count();
        let err = scene
            .append(
                scene.root(),
                NodeTemplate::tag("box").child(NodeTemplate::tag("box").attr("mass", "heavy")),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(scene.node_count(), before);
        assert!(scene.children(scene.root()).unwrap().is_empty());
    }

    #[test]
    fn test_undeclared_attributes_become_text() {
        let scene = Scene::new();
        let id = scene
            .append(scene.root(), NodeTemplate::tag("spawn").attr("style", "color: red"))
            .unwrap();
        assert_eq!(scene.get_text(id, "style").unwrap(), "color: red");
        assert!(matches!(scene.get(id, "nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_cycles_and_double_parents_rejected() {
        let scene = Scene::new();
        let a = scene.create_node(NodeKind::Spawn);
        let b = scene.create_node(NodeKind::Spawn);
        scene.append_child(a, b).unwrap();
        assert!(matches!(scene.append_child(b, a), Err(Error::InvalidTree(_))));
        assert!(matches!(scene.append_child(a, a), Err(Error::InvalidTree(_))));
        assert!(matches!(scene.append_child(scene.root(), b), Err(Error::InvalidTree(_))));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let scene = Scene::new();
        let group = scene
            .append(
                scene.root(),
                NodeTemplate::tag("group")
                    .child(NodeTemplate::tag("box").id("a").child(NodeTemplate::tag("box").id("b")))
                    .child(NodeTemplate::tag("box").id("c")),
            )
            .unwrap();
        let ids: Vec<_> = scene
            .descendants(group)
            .unwrap()
            .into_iter()
            .map(|id| scene.element_id(id).unwrap().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_set_notifies_once_with_committed_value() {
        let scene = Scene::new();
        let id = scene.append(scene.root(), NodeTemplate::tag("box")).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scene
            .add_property_change_observer(id, "position", move |c| {
                sink.lock().push(c.value.clone());
                Ok(())
            })
            .unwrap();

        scene.set(id, "position", "3 4 5").unwrap();
        assert_eq!(*seen.lock(), vec![Value::Vector(Vector::new(3.0, 4.0, 5.0))]);
    }

    #[test]
    fn test_rejected_set_keeps_value_and_stays_silent() {
        let scene = Scene::new();
        let id = scene.append(scene.root(), NodeTemplate::tag("box")).unwrap();
        scene.set(id, "position", "1 2 3").unwrap();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        scene
            .add_property_change_observer(id, "position", move |_| {
                *counter.lock() += 1;
                Ok(())
            })
            .unwrap();

        assert!(scene.set(id, "position", "1 2 nope").is_err());
        assert!(scene.set(id, "position", 4.0).is_err());
        assert_eq!(scene.get_vector(id, "position").unwrap(), Vector::new(1.0, 2.0, 3.0));
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_component_update_notifies() {
        let scene = Scene::new();
        let id = scene.append(scene.root(), NodeTemplate::tag("box")).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scene
            .add_property_change_observer(id, "rotation", move |c| {
                sink.lock().push(c.value.clone());
                Ok(())
            })
            .unwrap();

        scene.update_rotation(id, "rotation", |r| r.y = 0.5).unwrap();
        assert_eq!(*seen.lock(), vec![Value::Rotation(Rotation::new(0.0, 0.5, 0.0))]);
    }

    #[test]
    fn test_observers_are_per_node() {
        let scene = Scene::new();
        let a = scene.append(scene.root(), NodeTemplate::tag("box")).unwrap();
        let b = scene.append(scene.root(), NodeTemplate::tag("box")).unwrap();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        scene
            .add_property_change_observer(a, "mass", move |_| {
                *counter.lock() += 1;
                Ok(())
            })
            .unwrap();

        scene.set(b, "mass", 3).unwrap();
        assert_eq!(*calls.lock(), 0);
        scene.set(a, "mass", 3).unwrap();
        assert_eq!(*calls.lock(), 1);
    }

    struct Recorder(Mutex<Vec<SceneEvent>>);

    impl SceneListener for Recorder {
        fn on_event(&self, _scene: &Scene, event: &SceneEvent) -> Result<()> {
            self.0.lock().push(*event);
            Ok(())
        }
    }

    #[test]
    fn test_events_only_for_connected_parents() {
        let scene = Scene::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        scene.subscribe(recorder.clone());

        let detached = scene.create_node(NodeKind::Spawn);
        let child = scene.create_node(NodeKind::Box);
        scene.append_child(detached, child).unwrap();
        assert!(recorder.0.lock().is_empty());

        let root = scene.root();
        scene.append_child(root, detached).unwrap();
        scene.remove_child(root, detached).unwrap();
        assert_eq!(
            *recorder.0.lock(),
            vec![
                SceneEvent::NodeAppended { parent: root, node: detached },
                SceneEvent::NodeRemoved { parent: root, node: detached },
            ]
        );
        assert!(!scene.is_connected(child));
    }
}
