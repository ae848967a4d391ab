//! Multi-species reef simulation: schooling small and mid fish, hunting
//! predators with a dash burst, drifting food, and an ecosystem balancer that
//! retunes shared parameters to hold each population near its target.
//!
//! [`swarm::Swarm`] owns the world and runs the tick; everything else is the
//! pieces it is built from.

pub mod balancer;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod fish;
pub mod food;
pub mod genetics;
pub mod params;
pub mod pid;
pub mod predator;
pub mod simulation_stats;
pub mod spatial;
pub mod steering;
pub mod swarm;
pub mod vector;

pub use config::SimConfig;
pub use error::ConfigError;
pub use swarm::Swarm;
