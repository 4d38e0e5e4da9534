//! Engine modules: the planner and the two renderers that consume its plan.
//!
//! Inventory -> `planner` -> `LayoutPlan` -> `summary` (display) and
//! `serializer` (pc-sysinstall config). Both renderers walk the plan through
//! the shared grouped view in `groups`.

pub mod groups;
pub mod planner;
pub mod serializer;
pub mod summary;
