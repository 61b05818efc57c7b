//! Pipeline orchestration.
//!
//! A pipeline is an ordered sequence of transform steps executed
//! sequentially; each step consumes the previous step's output.
//! Coordinators own the policy (which steps run, progress weighting,
//! catalog registration) and delegate execution to the shared step
//! runner.

mod errors;
mod export;
mod reel;
mod step;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use export::{ExportOutcome, ExportPipeline};
pub use reel::{ReelOutcome, ReelPipeline};
pub use step::{run_transform_step, StepRun};
