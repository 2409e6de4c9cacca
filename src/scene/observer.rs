//! Per-(node, property) observer registration table.
//!
//! Every scene owns its own table. Observers for one key run in registration
//! order; the table hands out cloned `Arc`s so dispatch never holds a lock
//! while user code runs.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::model::{NodeId, Value};
use crate::Result;

/// Callback invoked after a property value has been committed.
pub type ObserverFn = Arc<dyn Fn(&PropertyChange) -> Result<()> + Send + Sync>;

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Who caused a property change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Scripts, network clients, other subsystems.
    External,
    /// Write-back from the rigid-body simulation.
    Simulation,
}

/// A committed property change, as seen by observers.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub node: NodeId,
    pub property: String,
    pub value: Value,
    pub origin: ChangeOrigin,
}

impl fmt::Display for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} {} = {}", self.node, self.property, self.value)
    }
}

type Key = (NodeId, String);

#[derive(Default)]
pub(crate) struct ObserverTable {
    by_key: HashMap<Key, SmallVec<[(ObserverId, ObserverFn); 2]>>,
    keys: HashMap<ObserverId, Key>,
}

impl ObserverTable {
    pub fn insert(&mut self, id: ObserverId, node: NodeId, property: &str, f: ObserverFn) {
        let key = (node, property.to_string());
        self.by_key.entry(key.clone()).or_default().push((id, f));
        self.keys.insert(id, key);
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let Some(key) = self.keys.remove(&id) else {
            return false;
        };
        if let Some(list) = self.by_key.get_mut(&key) {
            list.retain(|(oid, _)| *oid != id);
            if list.is_empty() {
                self.by_key.remove(&key);
            }
        }
        true
    }

    /// Observers for one key, in registration order.
    pub fn snapshot(&self, node: NodeId, property: &str) -> SmallVec<[ObserverFn; 2]> {
        self.by_key
            .get(&(node, property.to_string()))
            .map(|list| list.iter().map(|(_, f)| Arc::clone(f)).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, node: NodeId, property: &str) -> usize {
        self.by_key
            .get(&(node, property.to_string()))
            .map_or(0, SmallVec::len)
    }
}

/// Run observers in order, stopping at the first failure.
pub(crate) fn dispatch(observers: &[ObserverFn], change: &PropertyChange) -> Result<()> {
    for observer in observers {
        observer(change)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, tag: u32) -> ObserverFn {
        let log = Arc::clone(log);
        Arc::new(move |_| {
            log.lock().push(tag);
            Ok(())
        })
    }

    fn change() -> PropertyChange {
        PropertyChange {
            node: NodeId(1),
            property: "mass".into(),
            value: Value::Scalar(1.0),
            origin: ChangeOrigin::External,
        }
    }

    #[test]
    fn test_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut table = ObserverTable::default();
        table.insert(ObserverId(1), NodeId(1), "mass", recorder(&log, 1));
        table.insert(ObserverId(2), NodeId(1), "mass", recorder(&log, 2));
        table.insert(ObserverId(3), NodeId(2), "mass", recorder(&log, 3));

        dispatch(&table.snapshot(NodeId(1), "mass"), &change()).unwrap();
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[test]
    fn test_remove() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut table = ObserverTable::default();
        table.insert(ObserverId(1), NodeId(1), "mass", recorder(&log, 1));
        assert!(table.remove(ObserverId(1)));
        assert!(!table.remove(ObserverId(1)));
        assert_eq!(table.count(NodeId(1), "mass"), 0);
    }

    #[test]
    fn test_failure_stops_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing: ObserverFn = Arc::new(|_| Err(crate::Error::UnknownMaterial("ice".into())));
        let observers = [recorder(&log, 1), failing, recorder(&log, 3)];

        assert!(dispatch(&observers, &change()).is_err());
        assert_eq!(*log.lock(), vec![1]);
    }
}
