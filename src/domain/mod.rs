//! Domain layer: property sets and their names.
//!
//! [`PropertySet`] is the unit clients create, merge, fetch and delete.
//! [`PropertySetName`] is the validated name it is stored under.

pub mod name;
pub mod property_set;

pub use name::{NameError, PropertySetName};
pub use property_set::{Entries, EntriesError, PropertySet};
