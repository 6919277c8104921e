//! Audio output and the processing graph in front of it.
//!
//! `AudioGraph` owns the device binding and decides, once, whether the
//! device gets the full `source -> analyser -> gain` chain or plain output.

mod chain;
mod device;
mod graph;
mod registry;
mod sink;
mod tap;

#[cfg(test)]
pub(crate) mod fake;

pub use chain::{GainStage, GraphClock, SignalChain};
pub use device::{DeviceEvent, OutputDevice, output_level};
pub use graph::{AudioGraph, FallbackGraph, FullGraph, GraphMode, GraphState, ProcessingGraph};
pub use registry::{DeviceId, TapRegistry};
pub use sink::RodioDevice;
pub use tap::{AnalysisTap, SILENCE, sample_to_byte};
