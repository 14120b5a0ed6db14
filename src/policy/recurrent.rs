use rand::Rng;
use serde::{Deserialize, Serialize};

use super::adam::{mat_vec, mse_grad, outer_acc, transpose_mat_vec, Adam, Parameter};

/// Elman network reading `memory` observation rows oldest first. The final
/// hidden state is mapped linearly to one value per action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentNetwork {
    memory: usize,
    width: usize,
    hidden: usize,
    actions: usize,
    input_weights: Parameter,
    recurrent_weights: Parameter,
    hidden_bias: Parameter,
    output_weights: Parameter,
    output_bias: Parameter,
    optimizer: Adam,
}

struct Trace {
    /// `hidden[0]` is the zero initial state.
    hidden: Vec<Vec<f64>>,
    output: Vec<f64>,
}

impl RecurrentNetwork {
    pub fn new<R: Rng>(
        memory: usize,
        width: usize,
        hidden: usize,
        actions: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Self {
        let hidden = hidden.max(1);
        Self {
            memory: memory.max(1),
            width,
            hidden,
            actions,
            input_weights: Parameter::glorot(hidden, width, rng),
            recurrent_weights: Parameter::glorot(hidden, hidden, rng),
            hidden_bias: Parameter::zeros(hidden),
            output_weights: Parameter::glorot(actions, hidden, rng),
            output_bias: Parameter::zeros(actions),
            optimizer: Adam::new(learning_rate),
        }
    }

    pub fn memory(&self) -> usize {
        self.memory
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn actions(&self) -> usize {
        self.actions
    }

    /// Checks parameter lengths against the declared sizes.
    pub fn validate(&self) -> Result<(), String> {
        if self.memory == 0 || self.hidden == 0 {
            return Err(format!(
                "memory {} and hidden {} must both be at least 1",
                self.memory, self.hidden
            ));
        }
        self.input_weights
            .check_len("input weights", self.hidden * self.width)?;
        self.recurrent_weights
            .check_len("recurrent weights", self.hidden * self.hidden)?;
        self.hidden_bias.check_len("hidden bias", self.hidden)?;
        self.output_weights
            .check_len("output weights", self.actions * self.hidden)?;
        self.output_bias.check_len("output bias", self.actions)
    }

    fn step_input<'a>(&self, input: &'a [f64], t: usize) -> &'a [f64] {
        &input[t * self.width..(t + 1) * self.width]
    }

    fn forward(&self, input: &[f64]) -> Trace {
        let mut hidden = vec![vec![0.0; self.hidden]];
        for t in 0..self.memory {
            let mut z = self.hidden_bias.values.clone();
            mat_vec(
                &self.input_weights.values,
                self.width,
                self.step_input(input, t),
                &mut z,
            );
            mat_vec(
                &self.recurrent_weights.values,
                self.hidden,
                &hidden[t],
                &mut z,
            );
            hidden.push(z.into_iter().map(f64::tanh).collect());
        }
        let mut output = self.output_bias.values.clone();
        mat_vec(
            &self.output_weights.values,
            self.hidden,
            &hidden[self.memory],
            &mut output,
        );
        Trace { hidden, output }
    }

    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        self.forward(input).output
    }

    /// Back-propagation through time over the whole window, `epochs` times.
    pub fn fit(&mut self, input: &[f64], target: &[f64], epochs: usize) {
        for _ in 0..epochs {
            let trace = self.forward(input);
            let delta_out = mse_grad(&trace.output, target);

            let mut output_weight_grad = vec![0.0; self.output_weights.len()];
            outer_acc(
                &mut output_weight_grad,
                &delta_out,
                &trace.hidden[self.memory],
            );
            let mut input_weight_grad = vec![0.0; self.input_weights.len()];
            let mut recurrent_weight_grad = vec![0.0; self.recurrent_weights.len()];
            let mut hidden_bias_grad = vec![0.0; self.hidden];

            let mut delta_hidden =
                transpose_mat_vec(&self.output_weights.values, self.hidden, &delta_out);
            for t in (1..=self.memory).rev() {
                let delta_z: Vec<f64> = delta_hidden
                    .iter()
                    .zip(&trace.hidden[t])
                    .map(|(d, h)| d * (1.0 - h * h))
                    .collect();
                outer_acc(
                    &mut input_weight_grad,
                    &delta_z,
                    self.step_input(input, t - 1),
                );
                outer_acc(&mut recurrent_weight_grad, &delta_z, &trace.hidden[t - 1]);
                for (grad, d) in hidden_bias_grad.iter_mut().zip(&delta_z) {
                    *grad += d;
                }
                delta_hidden =
                    transpose_mat_vec(&self.recurrent_weights.values, self.hidden, &delta_z);
            }

            self.optimizer.begin_step();
            self.optimizer
                .apply(&mut self.output_weights, &output_weight_grad);
            self.optimizer.apply(&mut self.output_bias, &delta_out);
            self.optimizer
                .apply(&mut self.input_weights, &input_weight_grad);
            self.optimizer
                .apply(&mut self.recurrent_weights, &recurrent_weight_grad);
            self.optimizer.apply(&mut self.hidden_bias, &hidden_bias_grad);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn reads_whole_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let net = RecurrentNetwork::new(2, 3, 8, 4, 0.01, &mut rng);
        let a = net.predict(&[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let b = net.predict(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(a.len(), 4);
        assert_ne!(a, b, "older rows must influence the output");
    }

    #[test]
    fn fit_reduces_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut net = RecurrentNetwork::new(2, 2, 8, 2, 0.01, &mut rng);
        let input = [0.2, 0.4, -0.3, 0.1];
        let target = [0.5, -0.5];
        let error = |net: &RecurrentNetwork| -> f64 {
            net.predict(&input)
                .iter()
                .zip(&target)
                .map(|(y, t)| (y - t).powi(2))
                .sum()
        };
        let before = error(&net);
        net.fit(&input, &target, 100);
        assert!(error(&net) < before);
    }
}
