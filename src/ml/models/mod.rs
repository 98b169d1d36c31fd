// The four model families behind the "model" tag of a run config.
// Each one implements LanguageModel and is built by ml::factory.

/// Quantum-circuit LCU model
pub mod quantum;

/// Fourier-mixing encoder
pub mod fnet;

/// Self-attention encoder
pub mod transformer;

/// Stacked LSTM
pub mod lstm;
