#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod commit;
pub mod detector;
pub mod emitter;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod routing;
pub mod service;
pub mod sim;
pub mod timer;

pub use commit::{CommitOutcome, ResultCommitter};
pub use detector::{ChangeDetector, SnapshotDeduper};
pub use emitter::ChannelEmitter;
pub use error::RuntimeError;
pub use orchestrator::{DrainOutcome, OrchestratorDeps, OrchestratorState, QueueOrchestrator};
pub use pool::{ChannelPool, PoolEvent};
pub use routing::{DispatchToken, TranscriptRouter};
pub use service::{DubbingService, ServiceParts, ServiceStatus};
pub use sim::{SendJournal, SentText, SimulatedChannel, SimulatedChannelConfig};
pub use timer::{TimerService, TokioTimer, timer_or_fallback};
