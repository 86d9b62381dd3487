//! Session identity management

mod identity;

pub use identity::get_or_create;
