use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Fully connected Q-network over a flat feature vector.
///
/// ```text
/// Input:  [batch, input_size]
/// Hidden: input_size -> hidden_sizes[0] -> ... each followed by ReLU
/// Output: last hidden -> num_actions  (Q-values, one per action)
/// ```
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    pub input_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub num_actions: usize,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let mut hidden = Vec::with_capacity(self.hidden_sizes.len());
        let mut width = self.input_size;
        for &size in &self.hidden_sizes {
            hidden.push(LinearConfig::new(width, size).init(device));
            width = size;
        }
        QNetwork {
            hidden,
            output: LinearConfig::new(width, self.num_actions).init(device),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: input [batch, input_size] -> output [batch, num_actions].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.hidden {
            x = self.relu.forward(layer.forward(x));
        }
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_network_output_shape() {
        let device = Default::default();
        let config = QNetworkConfig::new(4, vec![16, 8], 2);
        let network = config.init::<TestBackend>(&device);

        let input = Tensor::zeros([3, 4], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [3, 2]);
    }

    #[test]
    fn test_network_without_hidden_layers() {
        let device = Default::default();
        let config = QNetworkConfig::new(25, vec![], 4);
        let network = config.init::<TestBackend>(&device);

        let input = Tensor::zeros([1, 25], &device);
        let output = network.forward(input);
        assert_eq!(output.shape().dims, [1, 4]);
    }
}
