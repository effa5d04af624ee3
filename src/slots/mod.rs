//! Slot vocabulary: definitions, extraction strategies, and the class
//! registry that binds declarative table entries to executable slots.

pub mod classifier;
pub mod registry;
pub mod slot;
pub mod table;

pub use classifier::{IntentClassifier, KeywordClassifier, SlotClassifier};
pub use registry::{SlotBuilder, SlotClassRegistry};
pub use slot::{Slot, SlotStrategy};
pub use table::{parse_slot_table, read_slot_table, SlotDefinition, SlotLoadError, SlotValueRow};
