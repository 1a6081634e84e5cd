#![allow(clippy::collapsible_if)]
pub mod merge;
pub mod normalize;
pub mod query;
pub mod store;
