use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: u64,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Must be called once before the parameter updates of a gradient step.
    pub fn begin_step(&mut self) {
        self.step += 1;
    }

    pub fn apply(&self, param: &mut Parameter, grads: &[f64]) {
        let t = self.step.max(1) as i32;
        let correction1 = 1.0 - self.beta1.powi(t);
        let correction2 = 1.0 - self.beta2.powi(t);
        for (((value, grad), m), v) in param
            .values
            .iter_mut()
            .zip(grads)
            .zip(param.first.iter_mut())
            .zip(param.second.iter_mut())
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *value -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

/// Trainable tensor with its Adam moment estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub values: Vec<f64>,
    first: Vec<f64>,
    second: Vec<f64>,
}

impl Parameter {
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
            first: vec![0.0; len],
            second: vec![0.0; len],
        }
    }

    /// Glorot-uniform initialised `outputs x inputs` matrix.
    pub fn glorot<R: Rng>(outputs: usize, inputs: usize, rng: &mut R) -> Self {
        let mut param = Self::zeros(outputs * inputs);
        let fan = (inputs + outputs).max(1) as f64;
        let limit = (6.0 / fan).sqrt();
        for value in &mut param.values {
            *value = rng.gen_range(-limit..=limit);
        }
        param
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks that the values and both moment vectors hold `len` entries.
    pub fn check_len(&self, name: &str, len: usize) -> Result<(), String> {
        for (part, found) in [
            ("values", self.values.len()),
            ("first moments", self.first.len()),
            ("second moments", self.second.len()),
        ] {
            if found != len {
                return Err(format!("{name} {part} hold {found} entries, expected {len}"));
            }
        }
        Ok(())
    }
}

/// `out[o] += sum_i w[o * inputs + i] * x[i]`
pub fn mat_vec(weights: &[f64], inputs: usize, x: &[f64], out: &mut [f64]) {
    for (o, acc) in out.iter_mut().enumerate() {
        let row = &weights[o * inputs..(o + 1) * inputs];
        *acc += row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
    }
}

/// `grad[o * inputs + i] += delta[o] * x[i]`
pub fn outer_acc(grad: &mut [f64], delta: &[f64], x: &[f64]) {
    let inputs = x.len();
    for (o, d) in delta.iter().enumerate() {
        for (i, v) in x.iter().enumerate() {
            grad[o * inputs + i] += d * v;
        }
    }
}

/// `out[i] = sum_o w[o * inputs + i] * delta[o]`
pub fn transpose_mat_vec(weights: &[f64], inputs: usize, delta: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; inputs];
    for (o, d) in delta.iter().enumerate() {
        let row = &weights[o * inputs..(o + 1) * inputs];
        for (slot, w) in out.iter_mut().zip(row) {
            *slot += w * d;
        }
    }
    out
}

/// Gradient of the mean squared error with respect to the prediction.
pub fn mse_grad(prediction: &[f64], target: &[f64]) -> Vec<f64> {
    let n = prediction.len().max(1) as f64;
    prediction
        .iter()
        .zip(target)
        .map(|(y, t)| 2.0 * (y - t) / n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adam_moves_against_gradient() {
        let mut adam = Adam::new(0.1);
        let mut param = Parameter::zeros(2);
        adam.begin_step();
        adam.apply(&mut param, &[1.0, -1.0]);
        assert!(param.values[0] < 0.0);
        assert!(param.values[1] > 0.0);
    }

    #[test]
    fn matrix_helpers_agree() {
        let weights = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut out = vec![0.0; 2];
        mat_vec(&weights, 3, &[1.0, 0.0, 1.0], &mut out);
        assert_eq!(out, vec![4.0, 10.0]);
        assert_eq!(
            transpose_mat_vec(&weights, 3, &[1.0, 1.0]),
            vec![5.0, 7.0, 9.0]
        );
    }
}
