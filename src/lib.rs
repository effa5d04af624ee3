//! # slotflow
//!
//! A multi-turn slot-filling dialog engine. An utterance comes in, the
//! feature pipeline annotates it, slots extract what they can, and a
//! graph-walking policy decides whether to ask the next question, run a
//! domain action, or close out the route. The runtime serializes turns per
//! user, runs users concurrently under a shared bound, and paces multi-part
//! replies on the way out.
//!
//! Dialog behavior is declarative: slots live in a tab-separated vocabulary
//! table, routes in a JSON description compiled at startup. Language
//! backends (tokenizer, morphological tagger, word embedder), intent and
//! slot classifiers, domain actions, and the delivery transport are all
//! trait seams.

pub mod config;
pub mod dialog;
pub mod nlu;
pub mod policy;
pub mod routing;
pub mod runtime;
pub mod say;
pub mod slots;

pub use config::EngineConfig;
pub use dialog::{DialogEngine, DialogSession, SessionState};
pub use nlu::{FeaturePipeline, TurnFeatures};
pub use policy::{ActionError, ActionHandler, NextStep, PolicyEngine};
pub use routing::{compile_routes, read_routes, validate_slots, RouteGraph, RouteStep};
pub use runtime::{ChannelTransport, OutboundMessage, Transport, TurnPipeline};
pub use say::Phrasebook;
pub use slots::{
    read_slot_table, IntentClassifier, Slot, SlotClassRegistry, SlotClassifier, SlotDefinition,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
