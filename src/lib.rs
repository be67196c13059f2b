//! # tobest-de
//!
//! Differential evolution (DE/target-to-best/1/bin) over matrix populations.
//!
//! A population is a set of row-aligned matrices: chromosomes, decoded
//! decision variables, objective values, constraint violations and scaled
//! fitness. Each generation builds stochastic target-to-best base vectors,
//! applies differential mutation and binomial crossover, evaluates the trial
//! vectors once, and keeps the better of each parent/trial pair.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tobest_de::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//!
//! let de = DeTargetToBest1Bin::builder()
//!     .scale_factor(0.5)
//!     .crossover_rate(0.5)
//!     .problem(Sphere::new(5).with_half_width(5.0))
//!     .max_generations(200)
//!     .build()?;
//!
//! let population = de.initial_population(30, &mut rng)?;
//! let result = de.run(population, &mut rng)?;
//! println!("{:?} -> {}", result.best_solution(), result.best_objective);
//! ```

pub mod algorithms;
pub mod diagnostics;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod operators;
pub mod population;
pub mod termination;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::diagnostics::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::genome::prelude::*;
    pub use crate::operators::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::termination::prelude::*;
}
