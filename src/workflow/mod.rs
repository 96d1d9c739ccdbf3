pub mod apply_ctx;
pub mod apply_flow;
pub mod form;

pub use apply_ctx::ApplyCtx;
pub use apply_flow::{ApplyFlow, ApplyState, FlowOutcome};
pub use form::{ApplySurface, Eligibility, FormField, FormStep, PageSignal, StepControl};
