#[cfg(feature = "python")]
use pyo3::pymodule;

#[cfg(feature = "python")]
mod bindings;
pub mod messages;
pub mod tuning_engine;

pub use messages::{ControlMessage, EngineEvent};
pub use tuning_engine::quantizer::MappingMode;
pub use tuning_engine::realtime::{TuningEngineHandle, TuningProcessor, create_tuning_processor};
pub use tuning_engine::scale::{ScaleModel, ScaleStep};
pub use tuning_engine::table::{TuningStep, TuningTables};
pub use tuning_engine::{EngineConfig, TuningEngine};

/// The Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
mod xen_quantizer_engine {
    #[pymodule_export]
    use super::bindings::XenQuantizer;
}
