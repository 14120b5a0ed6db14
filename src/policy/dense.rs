use rand::Rng;
use serde::{Deserialize, Serialize};

use super::adam::{mat_vec, mse_grad, outer_acc, transpose_mat_vec, Adam, Parameter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Activation {
    Linear,
    Relu,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Layer {
    inputs: usize,
    activation: Activation,
    weights: Parameter,
    biases: Parameter,
}

impl Layer {
    fn new<R: Rng>(inputs: usize, outputs: usize, activation: Activation, rng: &mut R) -> Self {
        Self {
            inputs,
            activation,
            weights: Parameter::glorot(outputs, inputs, rng),
            biases: Parameter::zeros(outputs),
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.biases.values.clone();
        mat_vec(&self.weights.values, self.inputs, input, &mut out);
        if self.activation == Activation::Relu {
            for value in &mut out {
                *value = value.max(0.0);
            }
        }
        out
    }
}

/// Fully connected value network: linear hidden layer, ReLU hidden layer,
/// linear read-out with one unit per action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    inputs: usize,
    actions: usize,
    layers: Vec<Layer>,
    optimizer: Adam,
}

impl DenseNetwork {
    pub fn new<R: Rng>(
        inputs: usize,
        actions: usize,
        hidden: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Self {
        let hidden = hidden.max(1);
        let layers = vec![
            Layer::new(inputs, hidden, Activation::Linear, rng),
            Layer::new(hidden, hidden, Activation::Relu, rng),
            Layer::new(hidden, actions, Activation::Linear, rng),
        ];
        Self {
            inputs,
            actions,
            layers,
            optimizer: Adam::new(learning_rate),
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn actions(&self) -> usize {
        self.actions
    }

    /// Checks that every layer chains into the next and that parameter
    /// lengths agree with the declared layer sizes.
    pub fn validate(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layers".to_string());
        }
        let mut expected_inputs = self.inputs;
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.inputs != expected_inputs {
                return Err(format!(
                    "layer {index} reads {} inputs but receives {expected_inputs}",
                    layer.inputs
                ));
            }
            let outputs = layer.biases.len();
            layer
                .biases
                .check_len(&format!("layer {index} biases"), outputs)?;
            layer
                .weights
                .check_len(&format!("layer {index} weights"), outputs * layer.inputs)?;
            expected_inputs = outputs;
        }
        if expected_inputs != self.actions {
            return Err(format!(
                "last layer emits {expected_inputs} values for {} actions",
                self.actions
            ));
        }
        Ok(())
    }

    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        self.layers
            .iter()
            .fold(input.to_vec(), |acc, layer| layer.forward(&acc))
    }

    /// Runs `epochs` gradient steps pulling the prediction for `input` toward
    /// `target` under a squared-error loss.
    pub fn fit(&mut self, input: &[f64], target: &[f64], epochs: usize) {
        for _ in 0..epochs {
            let mut activations = vec![input.to_vec()];
            for layer in &self.layers {
                let next = layer.forward(&activations[activations.len() - 1]);
                activations.push(next);
            }
            let prediction = activations.last().cloned().unwrap_or_default();
            let mut delta = mse_grad(&prediction, target);

            let mut grads = Vec::with_capacity(self.layers.len());
            for (index, layer) in self.layers.iter().enumerate().rev() {
                let output = &activations[index + 1];
                if layer.activation == Activation::Relu {
                    for (d, out) in delta.iter_mut().zip(output) {
                        if *out <= 0.0 {
                            *d = 0.0;
                        }
                    }
                }
                let mut weight_grad = vec![0.0; layer.weights.len()];
                outer_acc(&mut weight_grad, &delta, &activations[index]);
                let bias_grad = delta.clone();
                delta = transpose_mat_vec(&layer.weights.values, layer.inputs, &delta);
                grads.push((index, weight_grad, bias_grad));
            }

            self.optimizer.begin_step();
            for (index, weight_grad, bias_grad) in grads {
                let layer = &mut self.layers[index];
                self.optimizer.apply(&mut layer.weights, &weight_grad);
                self.optimizer.apply(&mut layer.biases, &bias_grad);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn output_width_matches_actions() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let net = DenseNetwork::new(4, 3, 10, 0.01, &mut rng);
        assert_eq!(net.predict(&[1.0, 2.0, 3.0, 4.0]).len(), 3);
    }

    #[test]
    fn zero_input_gives_zero_output() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let net = DenseNetwork::new(4, 3, 10, 0.01, &mut rng);
        assert_eq!(net.predict(&[0.0; 4]), vec![0.0; 3]);
    }

    #[test]
    fn fit_reduces_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut net = DenseNetwork::new(2, 2, 10, 0.01, &mut rng);
        let input = [0.5, -1.0];
        let target = [1.0, -2.0];
        let error = |net: &DenseNetwork| -> f64 {
            net.predict(&input)
                .iter()
                .zip(&target)
                .map(|(y, t)| (y - t).powi(2))
                .sum()
        };
        let before = error(&net);
        net.fit(&input, &target, 200);
        assert!(error(&net) < before);
    }
}
