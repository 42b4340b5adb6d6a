//! GPU implementation of [`ComputeBackend`] built on [`wgpu`].
//!
//! Kernels are compiled from the WGSL in [`crate::shaders`] the first time
//! they are dispatched and cached per [`Kernel`] variant. Dispatch waits for
//! its output like the CPU backend does. Readback copies are asynchronous:
//! [`ComputeBackend::begin_copy`] submits the copy and arms `map_async`, and
//! [`ComputeBackend::map_read`] only polls the device, so a copy that has
//! not landed yet reports `MapFailed` and is retried at the next commit.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use wgpu::util::DeviceExt;

use crate::cpu_backend::validate_bindings;
use crate::{layout, shaders, BufferView, ComputeBackend, ComputeError, Kernel};

// Bindings are uploaded in whole 16-byte rows so packed u8/u16 images and
// uniform blocks meet the buffer size rules.
const BINDING_ALIGNMENT: usize = 16;

const COPY_IN_FLIGHT: ComputeError = ComputeError::MapFailed("copy still in flight");

struct KernelPipeline {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

type MapSlot = Arc<Mutex<Option<Result<(), wgpu::BufferAsyncError>>>>;

/// A readback copy submitted by `begin_copy`, keyed by the host data of the
/// view it was made from.
struct StagingCopy {
    source: Weak<[u8]>,
    buffer: wgpu::Buffer,
    len: usize,
    mapped: MapSlot,
}

impl StagingCopy {
    fn is_for(&self, view: &BufferView) -> bool {
        Weak::ptr_eq(&self.source, &Arc::downgrade(&view.data))
    }
}

/// GPU-backed implementation of [`ComputeBackend`] built on `wgpu`.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    pipelines: Mutex<HashMap<Kernel, Arc<KernelPipeline>>>,
    copies: Mutex<Vec<StagingCopy>>,
}

impl WgpuBackend {
    /// Opens the high-performance adapter. `WGPU_BACKEND` narrows the
    /// native APIs that are tried.
    pub fn try_new() -> Result<Self, ComputeError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or(ComputeError::BackendUnavailable)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("sonar compute device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|err| {
            tracing::warn!(%err, "wgpu device request failed");
            ComputeError::BackendUnavailable
        })?;

        let adapter_name = adapter.get_info().name;
        tracing::info!(adapter = %adapter_name, "wgpu device ready");
        Ok(Self {
            device,
            queue,
            adapter_name,
            pipelines: Mutex::new(HashMap::new()),
            copies: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn pipeline(&self, kernel: &Kernel) -> Result<Arc<KernelPipeline>, ComputeError> {
        let mut cache = self.pipelines.lock();
        if let Some(pipeline) = cache.get(kernel) {
            return Ok(Arc::clone(pipeline));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sonar kernel"),
            source: wgpu::ShaderSource::Wgsl(shaders::source(kernel).into()),
        });
        let entries: Vec<_> = (0..kernel.binding_count())
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: binding_type(kernel, binding),
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();
        let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sonar kernel bindings"),
            entries: &entries,
        });
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sonar kernel layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("sonar kernel pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: shaders::ENTRY_POINT,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            tracing::error!(kernel = ?kernel, %err, "kernel pipeline rejected");
            return Err(ComputeError::BackendUnavailable);
        }

        tracing::debug!(kernel = ?kernel, "kernel pipeline compiled");
        let pipeline = Arc::new(KernelPipeline {
            bind_group_layout,
            pipeline,
        });
        cache.insert(*kernel, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    fn upload(&self, data: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sonar binding"),
            contents: &padded(data),
            usage,
        })
    }

    fn staging_buffer(&self, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sonar staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Maps `staging` and waits for the device.
    fn read_blocking(&self, staging: &wgpu::Buffer, len: usize) -> Result<Vec<u8>, ComputeError> {
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(%err, "kernel output map failed");
                return Err(ComputeError::MapFailed("kernel output could not be mapped"));
            }
            Err(_) => return Err(ComputeError::MapFailed("map callback was dropped")),
        }
        let bytes = slice.get_mapped_range()[..len].to_vec();
        staging.unmap();
        Ok(bytes)
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter_name)
            .finish_non_exhaustive()
    }
}

/// Params are uniform, the output slot is writable, everything else is a
/// read-only storage input.
fn binding_type(kernel: &Kernel, binding: u32) -> wgpu::BufferBindingType {
    if binding + 1 == kernel.binding_count() {
        wgpu::BufferBindingType::Uniform
    } else {
        wgpu::BufferBindingType::Storage {
            read_only: binding != layout::output_binding(kernel),
        }
    }
}

fn padded(data: &[u8]) -> Cow<'_, [u8]> {
    let len = data.len().max(1).next_multiple_of(BINDING_ALIGNMENT);
    if len == data.len() {
        Cow::Borrowed(data)
    } else {
        let mut bytes = data.to_vec();
        bytes.resize(len, 0);
        Cow::Owned(bytes)
    }
}

impl ComputeBackend for WgpuBackend {
    fn dispatch(
        &self,
        shader: &Kernel,
        binds: &[BufferView],
        workgroups: [u32; 3],
    ) -> Result<Vec<Vec<u8>>, ComputeError> {
        validate_bindings(shader, binds)?;
        let pipeline = self.pipeline(shader)?;

        let params = binds.len() - 1;
        let buffers: Vec<wgpu::Buffer> = binds
            .iter()
            .enumerate()
            .map(|(i, view)| {
                let usage = if i == params {
                    wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST
                } else {
                    wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC
                };
                self.upload(&view.data, usage)
            })
            .collect();
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .zip(0u32..)
            .map(|(buffer, binding)| wgpu::BindGroupEntry {
                binding,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sonar kernel bind group"),
            layout: &pipeline.bind_group_layout,
            entries: &entries,
        });

        let out = layout::output_binding(shader) as usize;
        let output = &buffers[out];
        let staging = self.staging_buffer(output.size());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("sonar kernel pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups[0], workgroups[1], workgroups[2]);
        }
        encoder.copy_buffer_to_buffer(output, 0, &staging, 0, output.size());
        self.queue.submit(Some(encoder.finish()));
        tracing::trace!(kernel = ?shader, ?workgroups, "wgpu dispatch");

        Ok(vec![self.read_blocking(&staging, binds[out].data.len())?])
    }

    fn begin_copy(&self, staging: &BufferView) -> Result<(), ComputeError> {
        let mut copies = self.copies.lock();
        // copies whose view was dropped were replaced by a newer request
        copies.retain(|copy| copy.source.strong_count() > 0);
        if copies.iter().any(|copy| copy.is_for(staging)) {
            return Ok(());
        }

        let source = self.upload(&staging.data, wgpu::BufferUsages::COPY_SRC);
        let buffer = self.staging_buffer(source.size());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_buffer_to_buffer(&source, 0, &buffer, 0, source.size());
        self.queue.submit(Some(encoder.finish()));

        let mapped = MapSlot::default();
        let slot = Arc::clone(&mapped);
        buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            *slot.lock() = Some(result);
        });
        copies.push(StagingCopy {
            source: Arc::downgrade(&staging.data),
            buffer,
            len: staging.data.len(),
            mapped,
        });
        Ok(())
    }

    fn map_read(&self, staging: &BufferView) -> Result<Vec<u8>, ComputeError> {
        if staging.data.len() != staging.byte_len() {
            return Err(ComputeError::ShapeMismatch(
                "Staging buffer length does not match its shape",
            ));
        }
        let _ = self.device.poll(wgpu::Maintain::Poll);

        let mut copies = self.copies.lock();
        let Some(at) = copies.iter().position(|copy| copy.is_for(staging)) else {
            drop(copies);
            self.begin_copy(staging)?;
            return Err(COPY_IN_FLIGHT);
        };
        let state = copies[at].mapped.lock().take();
        match state {
            None => Err(COPY_IN_FLIGHT),
            Some(Err(err)) => {
                tracing::warn!(%err, "readback map failed");
                copies.swap_remove(at);
                Err(ComputeError::MapFailed("staging buffer map was rejected"))
            }
            Some(Ok(())) => {
                let copy = copies.swap_remove(at);
                let bytes = copy.buffer.slice(..).get_mapped_range()[..copy.len].to_vec();
                copy.buffer.unmap();
                Ok(bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{EncodeParams, ShiftParams};
    use crate::{CpuBackend, SampleFormat};

    // Hosts without an adapter skip the device tests.
    fn gpu() -> Option<WgpuBackend> {
        match WgpuBackend::try_new() {
            Ok(backend) => Some(backend),
            Err(err) => {
                eprintln!("skipping wgpu test: {err}");
                None
            }
        }
    }

    #[test]
    fn padding_rounds_to_whole_rows() {
        assert_eq!(padded(&[1, 2, 3]).len(), 16);
        assert_eq!(padded(&[]).len(), 16);
        assert!(matches!(padded(&[0u8; 32]), Cow::Borrowed(_)));
    }

    #[test]
    fn only_the_output_slot_is_writable() {
        let kernel = Kernel::Visualize(SampleFormat::U8);
        assert_eq!(
            binding_type(&kernel, 2),
            wgpu::BufferBindingType::Storage { read_only: false }
        );
        assert_eq!(
            binding_type(&kernel, 1),
            wgpu::BufferBindingType::Storage { read_only: true }
        );
        assert_eq!(binding_type(&kernel, 3), wgpu::BufferBindingType::Uniform);
    }

    #[test]
    fn encode_matches_cpu_backend() {
        let Some(gpu) = gpu() else { return };
        let hist: Vec<f32> = (0..35).map(|i| i as f32 / 30.0).collect();
        let params = EncodeParams {
            width: 7,
            height: 5,
            ..EncodeParams::default()
        };
        for format in SampleFormat::ALL {
            let binds = [
                BufferView::from_slice(&hist, vec![5, 7]),
                BufferView::zeroed(vec![5, 7], format.bytes_per_texel()),
                BufferView::uniform(&params),
            ];
            let kernel = Kernel::FlsEncode(format);
            let workgroups = layout::linear(layout::packed_words(35, format));
            let expected = CpuBackend::new().dispatch(&kernel, &binds, workgroups).unwrap();
            let actual = gpu.dispatch(&kernel, &binds, workgroups).unwrap();
            assert_eq!(actual, expected, "{format:?}");
        }
    }

    #[test]
    fn shift_matches_cpu_backend_for_packed_texels() {
        let Some(gpu) = gpu() else { return };
        let src: Vec<u8> = (1..=15).collect();
        let binds = [
            BufferView::from_slice(&src, vec![3, 5]),
            BufferView::zeroed(vec![3, 5], 1),
            BufferView::uniform(&ShiftParams { width: 5, height: 3 }),
        ];
        let kernel = Kernel::SssShift(SampleFormat::U8);
        let workgroups = layout::linear(layout::packed_words(15, SampleFormat::U8));
        let expected = CpuBackend::new().dispatch(&kernel, &binds, workgroups).unwrap();
        assert_eq!(gpu.dispatch(&kernel, &binds, workgroups).unwrap(), expected);
    }

    #[test]
    fn copy_is_mapped_once_the_device_has_finished() {
        let Some(gpu) = gpu() else { return };
        let view = BufferView::from_slice(&[3u16, 1, 4, 1, 5], vec![5]);
        gpu.begin_copy(&view).unwrap();
        let mut mapped = gpu.map_read(&view);
        for _ in 0..1000 {
            if mapped != Err(COPY_IN_FLIGHT) {
                break;
            }
            let _ = gpu.device.poll(wgpu::Maintain::Wait);
            mapped = gpu.map_read(&view);
        }
        assert_eq!(mapped.unwrap(), view.data.to_vec());
        assert!(gpu.copies.lock().is_empty());
    }

    #[test]
    fn unrequested_view_starts_a_copy() {
        let Some(gpu) = gpu() else { return };
        let view = BufferView::from_slice(&[9u8; 6], vec![6]);
        assert_eq!(gpu.map_read(&view), Err(COPY_IN_FLIGHT));
        assert_eq!(gpu.copies.lock().len(), 1);
    }
}
