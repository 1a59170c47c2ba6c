//! Externally declared column types and their application to string tables.

pub mod declaration;
pub mod reconcile;

pub use declaration::SchemaDeclaration;
pub use reconcile::reconcile;
