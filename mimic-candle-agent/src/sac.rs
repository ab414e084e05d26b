//! Soft actor-critic agent.
//!
//! [`Sac`] owns a [`GaussianActor`](crate::util::GaussianActor) with a
//! tanh-squashed Gaussian policy, a [`TwinCritic`](crate::util::TwinCritic)
//! with target networks, an [`EntCoef`] and a replay buffer.
mod base;
mod config;
mod ent_coef;
pub use base::Sac;
pub use config::SacConfig;
pub use ent_coef::{EntCoef, EntCoefMode};
