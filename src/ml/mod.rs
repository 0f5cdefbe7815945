//! Scoring building blocks for the yield estimator.
//!
//! Everything here is pure arithmetic over already-retrieved data; storage
//! and request handling live in [`crate::store`] and [`crate::estimator`].

pub mod crops;
pub mod features;
pub mod knn;
pub mod linear;
pub mod metrics;
