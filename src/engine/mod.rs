//! High-level operations: filter state, aggregation, and the controller façade.

pub mod aggregate;
pub mod controller;
pub mod filter;

pub use aggregate::AggregationEngine;
pub use controller::{Batch, FacetController};
pub use filter::{DimensionSelection, FilterState, MembershipPredicate, Selection};
