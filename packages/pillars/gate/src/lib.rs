//! Policy evaluator client, hot-reloading policy directory watcher, and the
//! classifier agent — the "is this case allowed/how is it shaped" gate of
//! the triage core.

mod classifier;
mod policy;

pub use classifier::{ClassifierAgent, ClassifierModel, LlmClassifier, RawClassification};
pub use policy::{PolicyDecision, PolicyDirectoryWatcher, PolicyError, PolicyEvaluatorClient};
