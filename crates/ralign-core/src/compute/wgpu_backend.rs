//! wgpu-based GPU compute backend (Metal / Vulkan / DX12).
//!
//! The per-image primitives run on the CPU; the batch ring correlations,
//! which dominate exhaustive stack alignment, run in a compute shader.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use ndarray::{Array3, ArrayView2};
use rayon::prelude::*;
use wgpu::util::DeviceExt;

use crate::correlation::CorrelationMap;
use crate::error::{AlignError, Result};
use crate::image::Image;
use crate::ops::{unwrap, Span};

use super::batch::{
    bin_to_degrees, check_insert, check_setup, empty_slot, normalized_score, not_set_up, reference_rings,
    ring_norm, BatchAligner, BatchAlignment, BatchGeometry,
};
use super::cpu::CpuBackend;
use super::{Capabilities, ComputeBackend};

// ---------------------------------------------------------------------------
// Shader
// ---------------------------------------------------------------------------

/// One invocation per `(shift k, item)`; writes the straight and mirrored
/// summed ring correlation at shift `k`.
const RING_CCF_WGSL: &str = r"
struct Params { ring_length: u32, ring_count: u32, items: u32, _pad: u32 }
@group(0) @binding(0) var<storage, read>       rings:     array<f32>;
@group(0) @binding(1) var<storage, read>       reference: array<f32>;
@group(0) @binding(2) var<storage, read_write> output:    array<f32>;
@group(0) @binding(3) var<uniform>             params:    Params;
@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let k = gid.x;
    let item = gid.y;
    let len = params.ring_length;
    if k >= len || item >= params.items { return; }
    let plane = len * params.ring_count;
    let base = item * plane;
    var straight: f32 = 0.0;
    var mirrored: f32 = 0.0;
    for (var r: u32 = 0u; r < params.ring_count; r = r + 1u) {
        let row = r * len;
        for (var j: u32 = 0u; j < len; j = j + 1u) {
            let m = rings[base + row + j];
            let jk = (j + k) % len;
            straight = straight + m * reference[row + jk];
            mirrored = mirrored + m * reference[plane + row + jk];
        }
    }
    let o = (item * len + k) * 2u;
    output[o] = straight;
    output[o + 1u] = mirrored;
}
";

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RingParams {
    ring_length: u32,
    ring_count: u32,
    items: u32,
    _pad: u32,
}

const WORKGROUP: u32 = 64;
const MAX_DISPATCH: u32 = 65_535;

const fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

// ---------------------------------------------------------------------------
// Device context
// ---------------------------------------------------------------------------

struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    ring_ccf_pipeline: wgpu::ComputePipeline,
}

impl GpuContext {
    fn create_storage_uninit(&self, byte_size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: byte_size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_uniform<T: Pod>(&self, data: &T) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: bytemuck::bytes_of(data),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    fn max_binding_bytes(&self) -> u64 {
        self.device.limits().max_storage_buffer_binding_size as u64
    }

    fn download_f32(&self, buffer: &wgpu::Buffer) -> Result<Vec<f32>> {
        let size = buffer.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(enc.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv()
            .map_err(|_| AlignError::Backend("GPU channel closed".into()))?
            .map_err(|e| AlignError::Backend(format!("buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(result)
    }

    /// Dispatch a single compute pass with one bind group at group(0).
    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        entries: &[wgpu::BindGroupEntry],
        workgroups: (u32, u32, u32),
    ) {
        let layout = pipeline.get_bind_group_layout(0);
        let bg = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries,
        });
        let mut enc = self.device.create_command_encoder(&Default::default());
        {
            let mut pass = enc.begin_compute_pass(&Default::default());
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups(workgroups.0, workgroups.1, workgroups.2);
        }
        self.queue.submit(std::iter::once(enc.finish()));
    }
}

// ---------------------------------------------------------------------------
// WgpuBackend
// ---------------------------------------------------------------------------

pub struct WgpuBackend {
    ctx: Arc<GpuContext>,
    adapter_name: String,
}

impl WgpuBackend {
    pub fn new() -> std::result::Result<Self, String> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| format!("No suitable GPU adapter found: {e}"))?;

        let adapter_name = adapter.get_info().name.clone();
        tracing::info!("GPU adapter: {adapter_name}");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("ralign"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
        ))
        .map_err(|e| format!("Failed to create GPU device: {e}"))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ring_ccf"),
            source: wgpu::ShaderSource::Wgsl(RING_CCF_WGSL.into()),
        });
        let ring_ccf_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: None,
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            ctx: Arc::new(GpuContext {
                device,
                queue,
                ring_ccf_pipeline,
            }),
            adapter_name,
        })
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accelerated_batch: true,
        }
    }

    fn cross_correlate(&self, moving: &Image, reference: &Image) -> Result<CorrelationMap> {
        CpuBackend.cross_correlate(moving, reference)
    }

    fn amplitude_spectrum(&self, image: &Image) -> Result<Array3<f64>> {
        CpuBackend.amplitude_spectrum(image)
    }

    fn correlate_rows(&self, a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> Result<Vec<f64>> {
        CpuBackend.correlate_rows(a, b)
    }

    fn batch_aligner(&self) -> Result<Box<dyn BatchAligner>> {
        Ok(Box::new(WgpuBatchAligner {
            ctx: Arc::clone(&self.ctx),
            stack: None,
        }))
    }
}

// ---------------------------------------------------------------------------
// Batch aligner
// ---------------------------------------------------------------------------

pub struct WgpuBatchAligner {
    ctx: Arc<GpuContext>,
    stack: Option<DeviceStack>,
}

/// Device-resident working set sized at `setup`. Slot `i` owns the ring sets
/// of image `i` at every grid offset, contiguous in `rings`.
struct DeviceStack {
    dims: (usize, usize),
    geometry: BatchGeometry,
    offsets: Vec<(i64, i64)>,
    rings: wgpu::Buffer,
    reference: wgpu::Buffer,
    output: wgpu::Buffer,
    params: wgpu::Buffer,
    /// Ring-set norms, `offsets.len()` per slot.
    norms: Vec<f64>,
    filled: Vec<bool>,
}

impl DeviceStack {
    fn count(&self) -> usize {
        self.filled.len()
    }

    fn plane_len(&self) -> usize {
        self.geometry.ring_length * self.geometry.ring_count
    }
}

impl WgpuBatchAligner {
    fn stack(&self) -> Result<&DeviceStack> {
        self.stack.as_ref().ok_or_else(not_set_up)
    }
}

impl BatchAligner for WgpuBatchAligner {
    fn name(&self) -> &str {
        "wgpu batch"
    }

    fn setup(&mut self, count: usize, dims: (usize, usize), geometry: BatchGeometry) -> Result<()> {
        check_setup(count, dims, &geometry)?;
        self.stack = None;

        let offsets = geometry.offsets();
        let len = geometry.ring_length;
        let plane_len = len * geometry.ring_count;
        let items = count
            .checked_mul(offsets.len())
            .ok_or_else(|| AlignError::Backend("batch too large".into()))?;
        let ring_bytes = items
            .checked_mul(plane_len * std::mem::size_of::<f32>())
            .ok_or_else(|| AlignError::Backend("batch too large".into()))? as u64;
        let out_bytes = (items * len * 2 * std::mem::size_of::<f32>()) as u64;

        let limits = self.ctx.device.limits();
        let limit = self.ctx.max_binding_bytes().min(limits.max_buffer_size);
        if ring_bytes > limit || out_bytes > limit {
            return Err(AlignError::Backend(format!(
                "batch needs {ring_bytes} bytes of rings, device limit is {limit}"
            )));
        }
        if items as u64 > MAX_DISPATCH as u64 {
            return Err(AlignError::Backend(format!(
                "{items} ring sets exceed the dispatch limit of {MAX_DISPATCH}"
            )));
        }

        let mut norms = Vec::new();
        norms
            .try_reserve_exact(items)
            .map_err(|e| AlignError::Backend(format!("cannot allocate ring norms: {e}")))?;
        norms.resize(items, 0.0);

        let ctx = &self.ctx;
        self.stack = Some(DeviceStack {
            dims,
            geometry,
            offsets,
            rings: ctx.create_storage_uninit(ring_bytes),
            reference: ctx.create_storage_uninit((2 * plane_len * std::mem::size_of::<f32>()) as u64),
            output: ctx.create_storage_uninit(out_bytes),
            params: ctx.create_uniform(&RingParams {
                ring_length: len as u32,
                ring_count: geometry.ring_count as u32,
                items: items as u32,
                _pad: 0,
            }),
            norms,
            filled: vec![false; count],
        });
        Ok(())
    }

    fn insert_image(&mut self, image: &Image, index: usize) -> Result<()> {
        let ctx = Arc::clone(&self.ctx);
        let stack = self.stack.as_mut().ok_or_else(not_set_up)?;
        check_insert(image, index, stack.count(), stack.dims)?;

        let g = stack.geometry;
        let plane = image.plane();
        let sets: Vec<Vec<f32>> = stack
            .offsets
            .par_iter()
            .map(|&(sx, sy)| {
                unwrap(
                    &plane,
                    g.inner_radius(),
                    g.outer_radius(),
                    g.ring_length,
                    sx as f64,
                    sy as f64,
                    Span::Full,
                )
                .into_iter()
                .collect()
            })
            .collect();

        let per_slot = stack.offsets.len() * stack.plane_len();
        let mut rings: Vec<f32> = Vec::new();
        rings
            .try_reserve_exact(per_slot)
            .map_err(|e| AlignError::Backend(format!("cannot stage ring data: {e}")))?;
        let first_norm = index * stack.offsets.len();
        for (i, set) in sets.iter().enumerate() {
            stack.norms[first_norm + i] = ring_norm(set);
            rings.extend_from_slice(set);
        }

        let offset = (index * per_slot * std::mem::size_of::<f32>()) as u64;
        ctx.queue.write_buffer(&stack.rings, offset, bytemuck::cast_slice(&rings));
        stack.filled[index] = true;
        Ok(())
    }

    fn align_to_reference(&mut self, reference: &Image) -> Result<Vec<BatchAlignment>> {
        let stack = self.stack()?;
        let g = stack.geometry;
        let (ref_rings, flip_rings) = reference_rings(&g, stack.dims, reference)?;
        if let Some(i) = stack.filled.iter().position(|f| !f) {
            return Err(empty_slot(i));
        }

        let target_norms = [ring_norm(&ref_rings), ring_norm(&flip_rings)];
        let mut reference_data: Vec<f32> = ref_rings.iter().copied().collect();
        reference_data.extend(flip_rings.iter().copied());

        let ctx = &self.ctx;
        ctx.queue
            .write_buffer(&stack.reference, 0, bytemuck::cast_slice(&reference_data));

        let len = g.ring_length;
        let items = stack.count() * stack.offsets.len();
        ctx.dispatch(
            &ctx.ring_ccf_pipeline,
            &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: stack.rings.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: stack.reference.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: stack.output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: stack.params.as_entire_binding(),
                },
            ],
            (div_ceil(len as u32, WORKGROUP), items as u32, 1),
        );
        let scores = ctx.download_f32(&stack.output)?;

        let per_image = stack.offsets.len() * len * 2;
        Ok(scores
            .chunks(per_image)
            .zip(stack.norms.chunks(stack.offsets.len()))
            .map(|(image_scores, image_norms)| {
                pick_best(image_scores, image_norms, target_norms, &stack.offsets, len)
            })
            .collect())
    }
}

/// Scan offsets in grid order, straight before mirrored, keeping the first
/// strict maximum of the normalized correlation.
fn pick_best(
    scores: &[f32],
    norms: &[f64],
    target_norms: [f64; 2],
    offsets: &[(i64, i64)],
    len: usize,
) -> BatchAlignment {
    let mut best = BatchAlignment {
        angle: 0.0,
        sx: 0.0,
        sy: 0.0,
        mirror: false,
        score: f64::NEG_INFINITY,
    };
    for (o, &(sx, sy)) in offsets.iter().enumerate() {
        for (mirror, lane) in [(false, 0usize), (true, 1usize)] {
            let values = (0..len).map(|k| scores[(o * len + k) * 2 + lane] as f64);
            let (k, v) = values
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |acc, (k, v)| if v > acc.1 { (k, v) } else { acc });
            let v = normalized_score(v, norms[o], target_norms[lane]);
            if v > best.score {
                best = BatchAlignment {
                    angle: bin_to_degrees(k, len),
                    sx: sx as f64,
                    sy: sy as f64,
                    mirror,
                    score: v,
                };
            }
        }
    }
    best
}
