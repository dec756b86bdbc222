//! delinquency-core: analytics, scoring and explanation engine for the
//! loan-delinquency dashboard.

pub mod aggregate;
pub mod command;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod dispatch;
pub mod error;
pub mod explain;
pub mod features;
pub mod forecast;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod resources;
pub mod rng;
pub mod schema;
pub mod store;
pub mod trends;
pub mod types;
