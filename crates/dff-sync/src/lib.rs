//! Price synchronization from the `pricelist` table to LocalLine.
//!
//! [`SyncOrchestrator`] drives one run; [`MissingLinkRecorder`] collects the
//! products that lack an entry on a target price list.

pub mod orchestrator;
pub mod recorder;

pub use orchestrator::{
    CandidateSource, RunState, SyncError, SyncOrchestrator, SyncReport, SyncSettings,
};
pub use recorder::{MissingLink, MissingLinkRecorder, RecorderError};
