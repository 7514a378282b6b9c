//! Target catalog: static data describing every build target
//!
//! - **target**: `TargetDescriptor` and its enums (family, variant, tier)
//! - **naming**: deterministic bundle names derived from a descriptor
//! - **defaults**: the built-in release matrix

pub mod defaults;
pub mod naming;
pub mod target;

pub use defaults::default_catalog;
pub use target::{PackagingVariant, PlatformFamily, SupportTier, TargetDescriptor};
