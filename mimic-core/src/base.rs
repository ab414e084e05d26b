//! Core interfaces.
mod agent;
mod env;
mod policy;
pub use agent::{OnlineAgent, TrainableAgent};
pub use env::{resolve_env_info, Env, EnvInfo, Step};
pub use policy::PolicyEvaluator;
