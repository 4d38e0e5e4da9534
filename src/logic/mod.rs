//! Logic modules: resolves wizard choices into concrete install inputs.
//!
//! # Modules
//!
//! - `packages` - default desktop, meta-package selection, `installPackages=` list
//! - `advisories` - non-fatal notices (32-bit install, low disk space)

pub mod advisories;
pub mod packages;
