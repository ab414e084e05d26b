//! Registry of named parameters persisted in a single checkpoint file.
//!
//! A checkpoint is a safetensors file. Parameters of a network registered as
//! `component` are stored as `component/<variable name>`; a scalar parameter
//! is wrapped as `component/component`.
use crate::util::lock_vars;
use anyhow::{anyhow, Result};
use candle_core::{safetensors, Device, Tensor, Var};
use candle_nn::VarMap;
use log::info;
use mimic_core::error::MimicError;
use std::{collections::HashMap, path::Path};

/// Kind of a registered component.
pub enum ParamEntry<'a> {
    /// All variables of a network.
    NetworkParams(&'a VarMap),

    /// A single tensor-valued parameter, e.g. the log temperature of SAC.
    ScalarParam(&'a Var),
}

/// Named components to be saved or loaded together.
#[derive(Default)]
pub struct ParamRegistry<'a> {
    entries: Vec<(String, ParamEntry<'a>)>,
}

impl<'a> ParamRegistry<'a> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the variables of a network.
    pub fn network(mut self, name: impl Into<String>, varmap: &'a VarMap) -> Self {
        self.entries
            .push((name.into(), ParamEntry::NetworkParams(varmap)));
        self
    }

    /// Registers a scalar parameter.
    pub fn scalar(mut self, name: impl Into<String>, var: &'a Var) -> Self {
        self.entries.push((name.into(), ParamEntry::ScalarParam(var)));
        self
    }

    /// Returns the names of the registered components.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Returns the number of registered components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns every parameter keyed as it is stored in a checkpoint.
    pub fn named_tensors(&self) -> Result<HashMap<String, Tensor>> {
        let mut tensors = HashMap::new();
        for (name, entry) in self.entries.iter() {
            match entry {
                ParamEntry::NetworkParams(varmap) => {
                    for (k, v) in lock_vars(varmap)?.iter() {
                        tensors.insert(format!("{}/{}", name, k), v.as_tensor().copy()?);
                    }
                }
                ParamEntry::ScalarParam(var) => {
                    tensors.insert(format!("{}/{}", name, name), var.as_tensor().copy()?);
                }
            }
        }
        Ok(tensors)
    }

    /// Saves every registered component into a single file.
    ///
    /// Fails with [`MimicError::EmptyModelSet`] if nothing is registered.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.is_empty() {
            return Err(MimicError::EmptyModelSet.into());
        }
        let tensors = self.named_tensors()?;
        safetensors::save(&tensors, path.as_ref())?;
        info!("Saved {:?} to {:?}", self.names(), path.as_ref());
        Ok(())
    }

    /// Loads every registered component from a single file.
    ///
    /// Fails with [`MimicError::ModelFileNotFound`] if the file does not exist,
    /// or with an error naming the entry if a parameter is missing. Every
    /// entry is resolved before the first parameter is overwritten, so a
    /// failed load leaves all components unchanged.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MimicError::ModelFileNotFound(path.to_path_buf()).into());
        }
        let tensors = safetensors::load(path, &Device::Cpu)?;
        let get = |key: &str| {
            tensors
                .get(key)
                .ok_or_else(|| anyhow!("Entry {} is not found in {:?}", key, path))
        };

        let mut resolved = vec![];
        for (name, entry) in self.entries.iter() {
            match entry {
                ParamEntry::NetworkParams(varmap) => {
                    for (k, v) in lock_vars(varmap)?.iter() {
                        let t = get(&format!("{}/{}", name, k))?;
                        resolved.push((v.clone(), t.to_device(v.device())?));
                    }
                }
                ParamEntry::ScalarParam(var) => {
                    let t = get(&format!("{}/{}", name, name))?;
                    resolved.push((Var::clone(var), t.to_device(var.device())?));
                }
            }
        }

        for (var, t) in resolved.iter() {
            var.set(t)?;
        }
        info!("Loaded {:?} from {:?}", self.names(), path);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::{Init, VarBuilder};
    use tempdir::TempDir;

    fn network(value: f64) -> Result<VarMap> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        vb.get_with_hints((2, 2), "weight", Init::Const(value))?;
        Ok(varmap)
    }

    fn weight(varmap: &VarMap) -> Result<Vec<f32>> {
        Ok(lock_vars(varmap)?["weight"].flatten_all()?.to_vec1::<f32>()?)
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new("registry")?;
        let path = dir.path().join("model.safetensors");

        let actor = network(1.0)?;
        let log_alpha = Var::from_vec(vec![0.5f32], 1, &Device::Cpu)?;
        let registry = ParamRegistry::new()
            .network("actor", &actor)
            .scalar("log_alpha", &log_alpha);
        registry.save(&path)?;

        let keys = safetensors::load(&path, &Device::Cpu)?;
        let mut keys = keys.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, vec!["actor/weight", "log_alpha/log_alpha"]);

        let actor_ = network(0.0)?;
        let log_alpha_ = Var::from_vec(vec![0f32], 1, &Device::Cpu)?;
        ParamRegistry::new()
            .network("actor", &actor_)
            .scalar("log_alpha", &log_alpha_)
            .load(&path)?;
        assert_eq!(weight(&actor_)?, vec![1.0; 4]);
        assert_eq!(log_alpha_.as_tensor().to_vec1::<f32>()?, vec![0.5]);
        Ok(())
    }

    #[test]
    fn test_missing_file() -> Result<()> {
        let dir = TempDir::new("registry")?;
        let path = dir.path().join("nothing.safetensors");
        let actor = network(1.0)?;
        let err = ParamRegistry::new()
            .network("actor", &actor)
            .load(&path)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MimicError>(),
            Some(MimicError::ModelFileNotFound(p)) if p == &path
        ));
        Ok(())
    }

    #[test]
    fn test_empty_registry() -> Result<()> {
        let dir = TempDir::new("registry")?;
        let err = ParamRegistry::new()
            .save(dir.path().join("model.safetensors"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MimicError>(),
            Some(MimicError::EmptyModelSet)
        ));
        Ok(())
    }

    #[test]
    fn test_missing_entry() -> Result<()> {
        let dir = TempDir::new("registry")?;
        let path = dir.path().join("model.safetensors");
        let actor = network(1.0)?;
        ParamRegistry::new().network("actor", &actor).save(&path)?;

        let critic = network(1.0)?;
        let err = ParamRegistry::new()
            .network("critic1", &critic)
            .load(&path)
            .unwrap_err();
        assert!(err.to_string().contains("critic1/weight"));
        Ok(())
    }

    #[test]
    fn test_failed_load_changes_nothing() -> Result<()> {
        let dir = TempDir::new("registry")?;
        let path = dir.path().join("model.safetensors");
        let actor = network(1.0)?;
        ParamRegistry::new().network("actor", &actor).save(&path)?;

        // "actor" is in the file, "critic1" is not
        let actor_ = network(0.0)?;
        let critic = network(2.0)?;
        let log_alpha = Var::from_vec(vec![0.3f32], 1, &Device::Cpu)?;
        let err = ParamRegistry::new()
            .network("actor", &actor_)
            .scalar("log_alpha", &log_alpha)
            .network("critic1", &critic)
            .load(&path)
            .unwrap_err();
        assert!(err.to_string().contains("log_alpha/log_alpha"));
        assert_eq!(weight(&actor_)?, vec![0.0; 4]);
        assert_eq!(weight(&critic)?, vec![2.0; 4]);
        assert_eq!(log_alpha.as_tensor().to_vec1::<f32>()?, vec![0.3]);
        Ok(())
    }
}
