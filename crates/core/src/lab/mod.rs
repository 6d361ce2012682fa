//! Lab measurement vocabulary and key resolution.

mod keys;
mod resolver;

pub use keys::{LabKey, SlotKind};
pub use resolver::{normalize, resolve, stored_spellings, Resolved};
