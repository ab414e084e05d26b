//! Agents implemented with [candle](https://crates.io/crates/candle-core).
//!
//! * [`sac::Sac`] - soft actor-critic with twin critics, target networks and
//!   a learned or fixed entropy temperature.
//! * [`bc::Bc`] - behavior cloning from an expert replay buffer.
//!
//! Both implement the capability traits of [`mimic_core`] and persist their
//! parameters through a [`ParamRegistry`](registry::ParamRegistry).
pub mod bc;
pub mod dataset;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod registry;
pub mod sac;
pub mod util;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Eq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}
