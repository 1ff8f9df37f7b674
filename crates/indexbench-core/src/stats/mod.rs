//! Statistical reduction of repeated measurements
//!
//! Repeats of the same configuration are reduced to an arithmetic mean and a
//! *population* standard deviation (divide by N), which is what the results
//! table records for each configuration.
//!
//! # Examples
//!
//! ```
//! use indexbench_core::stats::{mean, population_std_dev, Summary};
//!
//! let samples = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
//! let avg = mean(&samples).unwrap();
//! assert_eq!(avg, 5.0);
//! assert_eq!(population_std_dev(&samples, avg), 2.0);
//!
//! let summary = Summary::from_samples(&samples).unwrap();
//! assert_eq!(summary.packed(), "5.000000,2.000000");
//! ```

pub mod summary;

pub use summary::{mean, population_std_dev, Summary};
