// Chaos module
// Structural pattern transforms and the timer that applies them to the live bank

pub mod director;
pub mod transform;

pub use director::{ChaosDirector, SharedIntensity};
pub use transform::MutationKind;
