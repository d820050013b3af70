// Generator module
// Markov generation, evolution operators, structural constructors and the
// interference/entanglement combiner

pub mod evolution;
pub mod interference;
pub mod markov;
pub mod structural;

pub use evolution::Constraints;
pub use interference::{
    EntanglementKind, Observation, QuantumRegistry, create_quantum_interference,
    quantum_random_walk_pattern,
};
pub use markov::{MarkovGenerator, MarkovModel};
