// Core modules implementing the collection store, record model, and error modeling.
pub mod collection;
pub mod error;
pub mod record;
