// Pipeline-level checks and the run description handed to the orchestrator

pub mod plan;
pub mod preflight;

pub use plan::{NodeSelector, PipelinePlan, PipelineStep, ResourceLimits, StepInput};
pub use preflight::{Preflight, PreflightReport};
