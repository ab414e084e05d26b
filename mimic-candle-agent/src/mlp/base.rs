use super::{create_hidden_layers, hidden_forward, MlpConfig};
use crate::model::{SubModel1, SubModel2};
use anyhow::Result;
use candle_core::{Device, Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Multilayer perceptron with ReLU activation function.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
    head: Linear,
}

impl Mlp {
    fn _build(vs: VarBuilder, config: MlpConfig) -> Result<Self> {
        let device = vs.device().clone();
        let vs = vs.pp("mlp");
        let layers = create_hidden_layers(&vs, config.in_dim, &config.units)?;
        let last_dim = config.units.last().copied().unwrap_or(config.in_dim);
        let head = linear(last_dim, config.out_dim, vs.pp(format!("ln{}", layers.len())))?;

        Ok(Self {
            config,
            device,
            layers,
            head,
        })
    }

    fn _forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = hidden_forward(&xs.to_device(&self.device)?, &self.layers)?;
        let xs = self.head.forward(&xs)?;

        match self.config.activation_out {
            false => Ok(xs),
            true => Ok(xs.relu()?),
        }
    }
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        self._forward(xs)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        Self::_build(vs, config)
    }
}

impl SubModel2 for Mlp {
    type Config = MlpConfig;
    type Input1 = Tensor;
    type Input2 = Tensor;
    type Output = Tensor;

    /// Concatenates the inputs along the last axis and applies the network.
    fn forward(&self, input1: &Self::Input1, input2: &Self::Input2) -> Result<Self::Output> {
        let input = Tensor::cat(&[input1, input2], D::Minus1)?;
        self._forward(&input)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        Self::_build(vs, config)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn test_mlp_shapes_and_names() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = MlpConfig::new(4, vec![8, 8], 1, false);
        let mlp = <Mlp as SubModel2>::build(vb, config)?;

        let obs = Tensor::zeros((5, 3), DType::F32, &Device::Cpu)?;
        let act = Tensor::zeros((5, 1), DType::F32, &Device::Cpu)?;
        assert_eq!(SubModel2::forward(&mlp, &obs, &act)?.dims(), [5, 1]);

        let mut names = varmap.data().lock().unwrap().keys().cloned().collect::<Vec<_>>();
        names.sort();
        assert_eq!(
            names,
            vec![
                "mlp.ln0.bias",
                "mlp.ln0.weight",
                "mlp.ln1.bias",
                "mlp.ln1.weight",
                "mlp.ln2.bias",
                "mlp.ln2.weight"
            ]
        );
        Ok(())
    }
}
