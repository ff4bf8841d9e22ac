//! # Named Dependencies
//!
//! A [`Named`] facade exposes a fixed set of container values by name. It is the way
//! to hand a model (or a test) exactly the values it may see:
//!
//! ```rust
//! use reactive_models::{Container, NamedEntry};
//!
//! let container = Container::new();
//! let named = container.named([
//!     ("api_url", NamedEntry::value("https://example.test".to_string())),
//!     ("token", NamedEntry::lazy()),
//! ]);
//!
//! assert_eq!(named.get::<String>("api_url").unwrap(), "https://example.test");
//! assert!(named.get::<String>("token").is_err());
//!
//! named.set("token", "secret".to_string()).unwrap();
//! assert_eq!(named.get::<String>("token").unwrap(), "secret");
//! assert!(named.set("other", 1).is_err());
//! ```

use crate::container::Container;
use crate::ModelError;
use indexmap::IndexSet;
use std::any::Any;
use std::rc::Rc;

/// How a named entry starts out.
#[derive(Clone)]
pub struct NamedEntry(Option<Rc<dyn Any>>);

impl NamedEntry {
    /// Assigned right away.
    pub fn value<T: 'static>(value: T) -> Self {
        NamedEntry(Some(Rc::new(value)))
    }

    /// Declared, to be assigned later with [`Named::set`].
    pub fn lazy() -> Self {
        NamedEntry(None)
    }

    pub fn is_lazy(&self) -> bool {
        self.0.is_none()
    }
}

impl std::fmt::Debug for NamedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_lazy() {
            f.write_str("NamedEntry::Lazy")
        } else {
            f.write_str("NamedEntry::Value(..)")
        }
    }
}

/// A container view restricted to a declared set of names.
#[derive(Clone)]
pub struct Named {
    container: Container,
    names: IndexSet<String>,
}

impl Named {
    pub(crate) fn new<N: Into<String>>(
        container: Container,
        entries: impl IntoIterator<Item = (N, NamedEntry)>,
    ) -> Self {
        let mut names = IndexSet::new();
        for (name, entry) in entries {
            let name = name.into();
            if let NamedEntry(Some(value)) = entry {
                container.set_value_rc(&name, value);
            }
            names.insert(name);
        }
        Self { container, names }
    }

    pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<T, ModelError> {
        self.declared(name)?;
        match self.container.value::<T>(name) {
            Err(ModelError::MissingValue(_)) => Err(ModelError::UnassignedDependency(name.to_string())),
            other => other,
        }
    }

    pub fn set<T: 'static>(&self, name: &str, value: T) -> Result<(), ModelError> {
        self.declared(name)?;
        self.container.set_value(name, value);
        Ok(())
    }

    /// Whether `name` is declared and currently assigned.
    pub fn is_assigned(&self, name: &str) -> bool {
        self.names.contains(name) && self.container.has_value(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    fn declared(&self, name: &str) -> Result<(), ModelError> {
        if self.names.contains(name) {
            Ok(())
        } else {
            Err(ModelError::UndeclaredDependency(name.to_string()))
        }
    }
}

impl std::fmt::Debug for Named {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Named").field("names", &self.names).finish()
    }
}
