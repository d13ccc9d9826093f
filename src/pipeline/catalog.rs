//! Named source tables ("domains").

use crate::error::{StepError, StepResult};
use crate::table::Table;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Looks up a domain by name
pub trait DomainRetriever: Send + Sync {
    fn retrieve(&self, name: &str) -> StepResult<Table>;
}

impl<F> DomainRetriever for F
where
    F: Fn(&str) -> StepResult<Table> + Send + Sync,
{
    fn retrieve(&self, name: &str) -> StepResult<Table> {
        self(name)
    }
}

/// In-memory domain store, safe to share between runners.
///
/// Tables are cheap to clone (columns are reference counted), so lookups
/// hand out copies and never hold the lock while a pipeline runs.
#[derive(Debug, Default)]
pub struct Catalog {
    domains: RwLock<HashMap<String, Table>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain, returning the table it replaced
    pub fn register(&self, name: impl Into<String>, table: Table) -> Option<Table> {
        self.domains.write().insert(name.into(), table)
    }

    pub fn remove(&self, name: &str) -> Option<Table> {
        self.domains.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.domains.read().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.domains.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl DomainRetriever for Catalog {
    fn retrieve(&self, name: &str) -> StepResult<Table> {
        self.domains
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StepError::DomainNotFound {
                domain: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use std::sync::Arc;
    use std::thread;

    fn table() -> Table {
        Table::from_pairs(vec![("a", vec![Value::Integer(1)])]).unwrap()
    }

    #[test]
    fn test_register_and_retrieve() {
        let catalog = Catalog::new();
        assert!(catalog.register("sales", table()).is_none());
        assert!(catalog.register("sales", table()).is_some());
        assert_eq!(catalog.retrieve("sales").unwrap(), table());
        assert!(matches!(
            catalog.retrieve("nope"),
            Err(StepError::DomainNotFound { .. })
        ));
        assert_eq!(catalog.remove("sales"), Some(table()));
        assert!(!catalog.contains("sales"));
    }

    #[test]
    fn test_shared_between_threads() {
        let catalog = Arc::new(Catalog::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let catalog = Arc::clone(&catalog);
                thread::spawn(move || {
                    catalog.register(format!("d{}", i), table());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(catalog.names(), vec!["d0", "d1", "d2", "d3"]);
    }

    #[test]
    fn test_closure_retriever() {
        let retriever = |name: &str| -> StepResult<Table> {
            if name == "one" {
                Ok(table())
            } else {
                Err(StepError::DomainNotFound {
                    domain: name.to_string(),
                })
            }
        };
        assert!(retriever.retrieve("one").is_ok());
        assert!(retriever.retrieve("two").is_err());
    }
}
