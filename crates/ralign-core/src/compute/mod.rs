mod backend;
pub mod batch;
pub mod cpu;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use backend::{create_backend, Capabilities, ComputeBackend, DevicePreference};
pub use batch::{BatchAligner, BatchAlignment, BatchGeometry, CpuBatchAligner};
pub use cpu::CpuBackend;
