// External imports
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};

/// Hidden and cell state of every layer, each `[batch_size, hidden_size]`.
#[derive(Debug, Clone)]
pub struct LstmState<B: Backend> {
    pub hidden: Vec<Tensor<B, 2>>,
    pub cell: Vec<Tensor<B, 2>>,
}

impl<B: Backend> LstmState<B> {
    pub fn zeros(num_layers: usize, batch_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            hidden: (0..num_layers)
                .map(|_| Tensor::zeros([batch_size, hidden_size], device))
                .collect(),
            cell: (0..num_layers)
                .map(|_| Tensor::zeros([batch_size, hidden_size], device))
                .collect(),
        }
    }

    /// Repeat every row `times` times consecutively, as needed to draw several
    /// sample paths per series.
    pub fn repeat_interleave(self, times: usize) -> Self {
        Self {
            hidden: self
                .hidden
                .into_iter()
                .map(|h| repeat_interleave_rows(h, times))
                .collect(),
            cell: self
                .cell
                .into_iter()
                .map(|c| repeat_interleave_rows(c, times))
                .collect(),
        }
    }
}

/// Repeat each row of a `[n, d]` tensor `times` times: `[n * times, d]`.
pub fn repeat_interleave_rows<B: Backend>(tensor: Tensor<B, 2>, times: usize) -> Tensor<B, 2> {
    let [rows, cols] = tensor.dims();
    tensor
        .unsqueeze_dim::<3>(1)
        .repeat_dim(1, times)
        .reshape([rows * times, cols])
}

/// One LSTM layer with the four gates packed into a single projection.
#[derive(Module, Debug)]
pub struct LstmLayer<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    input_weights: Linear<B>,
    hidden_weights: Linear<B>,
}

impl<B: Backend> LstmLayer<B> {
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        // input, forget, cell and output gates combined
        let gate_size = 4 * hidden_size;

        Self {
            input_size,
            hidden_size,
            input_weights: LinearConfig::new(input_size, gate_size).init(device),
            hidden_weights: LinearConfig::new(hidden_size, gate_size).init(device),
        }
    }

    /// Advance the layer by one time step, returning the new `(h, c)`.
    pub fn step(
        &self,
        x_t: Tensor<B, 2>,
        h: Tensor<B, 2>,
        c: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let gates = self.input_weights.forward(x_t) + self.hidden_weights.forward(h);
        let size = self.hidden_size;
        let i_gate = gates.clone().narrow(1, 0, size);
        let f_gate = gates.clone().narrow(1, size, size);
        let g_gate = gates.clone().narrow(1, 2 * size, size);
        let o_gate = gates.narrow(1, 3 * size, size);

        let i = activation::sigmoid(i_gate);
        let f = activation::sigmoid(f_gate);
        let g = activation::tanh(g_gate);
        let o = activation::sigmoid(o_gate);

        let c = f * c + i * g;
        let h = o * activation::tanh(c.clone());
        (h, c)
    }
}

/// Multi-layer LSTM whose state is passed in and out explicitly, so that it
/// can be unrolled over a context window and then stepped one value at a time.
#[derive(Module, Debug)]
pub struct StackedLstm<B: Backend> {
    input_size: usize,
    hidden_size: usize,
    layers: Vec<LstmLayer<B>>,
    dropout: Dropout,
}

impl<B: Backend> StackedLstm<B> {
    /// Create a stacked LSTM
    ///
    /// # Arguments
    ///
    /// * `input_size` - Number of input features per time step
    /// * `hidden_size` - Size of each layer's hidden state
    /// * `num_layers` - Number of stacked layers
    /// * `dropout_rate` - Dropout applied between layers while training
    /// * `device` - Device to place tensors on
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        dropout_rate: f64,
        device: &B::Device,
    ) -> Self {
        let layers = (0..num_layers)
            .map(|layer| {
                let layer_input = if layer == 0 { input_size } else { hidden_size };
                LstmLayer::new(layer_input, hidden_size, device)
            })
            .collect();

        Self {
            input_size,
            hidden_size,
            layers,
            dropout: DropoutConfig::new(dropout_rate).init(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `x` - Input of shape `[batch_size, seq_len, input_size]`
    /// * `state` - Initial state; zeros when `None`
    ///
    /// # Returns
    ///
    /// The top layer's outputs `[batch_size, seq_len, hidden_size]` and the final state
    pub fn forward(
        &self,
        x: Tensor<B, 3>,
        state: Option<LstmState<B>>,
    ) -> (Tensor<B, 3>, LstmState<B>) {
        let device = x.device();
        let [batch_size, seq_len, _] = x.dims();

        let LstmState {
            mut hidden,
            mut cell,
        } = state.unwrap_or_else(|| {
            LstmState::zeros(self.layers.len(), batch_size, self.hidden_size, &device)
        });

        let mut outputs = Vec::with_capacity(seq_len);
        for t in 0..seq_len {
            let mut layer_input = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            for (index, layer) in self.layers.iter().enumerate() {
                let (h, c) = layer.step(layer_input, hidden[index].clone(), cell[index].clone());
                hidden[index] = h.clone();
                cell[index] = c;

                // No dropout after the last layer
                layer_input = if index + 1 < self.layers.len() {
                    self.dropout.forward(h)
                } else {
                    h
                };
            }

            outputs.push(layer_input.reshape([batch_size, 1, self.hidden_size]));
        }

        let output = if outputs.is_empty() {
            Tensor::zeros([batch_size, 0, self.hidden_size], &device)
        } else {
            Tensor::cat(outputs, 1)
        };

        (output, LstmState { hidden, cell })
    }
}
