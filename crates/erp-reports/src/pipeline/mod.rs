pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use context::{SessionContext, TargetContext, TargetPhase};
pub use error::{PipelineError, PipelineWarning};
pub use progress::{LogProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{SequenceOutcome, Sequencer};
