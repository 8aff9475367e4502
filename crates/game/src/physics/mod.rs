mod resolver;

pub use resolver::{MovementResolver, StepOutcome};
