pub mod clock;
pub mod context;
pub mod error;
pub mod progress;
pub mod result;
pub mod runner;
pub mod stage;
pub mod summary;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::ProcessingContext;
pub use error::StageError;
pub use progress::{
    BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter, ProgressStatus,
    StageProgressEvent,
};
pub use result::ProcessingResult;
pub use runner::{Collaborators, Pipeline};
pub use stage::{progress_percent, Stage, StageState, StageStatus};
pub use summary::{compliance_score, ProcessingSummary};
