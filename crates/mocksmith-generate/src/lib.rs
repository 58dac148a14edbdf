//! Constrained mock values for `mocksmith-core` domains.
//!
//! Every value [`MockGenerator`] produces is run back through the validator,
//! so it is accepted by the domain it was generated for. Randomness always
//! comes from the caller's `RngCore`; seed a `ChaCha8Rng` for reproducible
//! output.

pub mod engine;
pub mod errors;
pub mod generators;
pub mod logging;
pub mod model;
pub mod policy;

pub use engine::{MockGenerator, generate, rng_from_seed};
pub use errors::GenerationError;
pub use generators::{Generator, GeneratorContext, GeneratorRegistry, generator_id};
pub use logging::init_tracing;
pub use model::GenerateOptions;
pub use policy::{GenerationRequest, Resolution, resolve};

pub type Result<T, E = GenerationError> = std::result::Result<T, E>;
