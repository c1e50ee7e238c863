//! Kerntypen für Loopwise: Entscheidungs- und Feedback-Datensätze, der
//! Agenten-Zustand, die Schnittstelle zum Text-Completion-Dienst und der
//! injizierbare Beobachter für Log-Ereignisse.

pub mod completion;
pub mod observer;
pub mod record;

pub use completion::{
    Completion, CompletionError, CompletionRequest, CompletionResponse, DEFAULT_CONFIDENCE,
};
pub use observer::{LoopEvent, NoopObserver, Observer, TracingObserver};
pub use record::{AgentState, DataMap, Decision, Feedback, Metric, Outcome};
