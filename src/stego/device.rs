// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Data-parallel kernel execution and timing.
//!
//! A [`Device`] is acquired at the start of each embed/extract call and
//! released when it is dropped, on success and failure alike. With the
//! `parallel` feature it owns a dedicated rayon thread pool; without it every
//! kernel runs on the calling thread. Either way the pipeline sees the same
//! interface:
//!
//! 1. [`Device::upload`] stages a copy of the host image.
//! 2. Kernels ([`KernelOp::Hash`], [`KernelOp::Embed`], [`KernelOp::Extract`])
//!    run over an index space: border samples for `hash`, plan slots for
//!    `embed`/`extract`. Each launch returns only once every work item has
//!    finished.
//! 3. [`Device::download`] hands the (possibly modified) copy back.
//!
//! Only time spent inside kernel launches counts as device time. Staging,
//! planning and I/O show up in the total time.

use core::fmt;
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::raster::Image;
use crate::stego::border::{self, BorderRegion, Fingerprint};
use crate::stego::error::StegoError;
use crate::stego::permute::{EmbeddingPlan, Slot};

/// The kernels a [`Device`] can launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelOp {
    /// Per-border-sample fingerprint partials, reduced to one sum.
    Hash,
    /// Per-slot LSB write.
    Embed,
    /// Per-slot LSB read.
    Extract,
}

impl KernelOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Embed => "embed",
            Self::Extract => "extract",
        }
    }
}

impl fmt::Display for KernelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device-kernel and end-to-end latency of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingRecord {
    gpu: Duration,
    total: Duration,
}

impl TimingRecord {
    /// Build a record. `total` is raised to `gpu` if it is smaller.
    pub fn new(gpu: Duration, total: Duration) -> Self {
        Self { gpu, total: total.max(gpu) }
    }

    pub fn gpu(&self) -> Duration {
        self.gpu
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// Device-kernel time in milliseconds.
    pub fn gpu_ms(&self) -> f64 {
        self.gpu.as_secs_f64() * 1000.0
    }

    /// End-to-end time in milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.total.as_secs_f64() * 1000.0
    }
}

impl fmt::Display for TimingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPU time: {:.2} ms\nTotal time: {:.2} ms", self.gpu_ms(), self.total_ms())
    }
}

/// An image staged on the device.
pub struct DeviceImage {
    image: Image,
}

impl DeviceImage {
    pub fn image(&self) -> &Image {
        &self.image
    }
}

/// Call-scoped execution resource.
pub struct Device {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
    acquired: Instant,
    kernel_time: Duration,
    launches: u32,
}

impl Device {
    /// Acquire a device for one call.
    ///
    /// # Errors
    /// [`StegoError::Device`] if the worker pool cannot be started.
    pub fn acquire() -> Result<Self, StegoError> {
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("borderhash-kernel-{i}"))
            .build()
            .map_err(|e| StegoError::Device(e.to_string()))?;

        let device = Self {
            #[cfg(feature = "parallel")]
            pool,
            acquired: Instant::now(),
            kernel_time: Duration::ZERO,
            launches: 0,
        };
        debug!(workers = device.workers(), "device acquired");
        Ok(device)
    }

    /// Number of concurrent workers kernels are spread across.
    pub fn workers(&self) -> usize {
        #[cfg(feature = "parallel")]
        return self.pool.current_num_threads();
        #[cfg(not(feature = "parallel"))]
        return 1;
    }

    /// Copy a host image into device memory.
    pub fn upload(&self, img: &Image) -> DeviceImage {
        DeviceImage { image: img.clone() }
    }

    /// Copy a staged image back to the host.
    pub fn download(&self, buf: DeviceImage) -> Image {
        buf.image
    }

    /// Run `kernel` on the device and account its wall time as device time.
    fn launch<R, K>(&mut self, op: KernelOp, items: usize, kernel: K) -> R
    where
        R: Send,
        K: FnOnce() -> R + Send,
    {
        let start = Instant::now();

        #[cfg(feature = "parallel")]
        let out = self.pool.install(kernel);
        #[cfg(not(feature = "parallel"))]
        let out = kernel();

        let elapsed = start.elapsed();
        self.kernel_time += elapsed;
        self.launches += 1;
        debug!(kernel = %op, items, micros = elapsed.as_micros() as u64, "kernel finished");
        out
    }

    /// Fingerprint the border of a staged image.
    pub fn hash(&mut self, buf: &DeviceImage, region: &BorderRegion) -> Fingerprint {
        let img = &buf.image;
        let items = border::element_count(img, region);
        let sum = self.launch(KernelOp::Hash, items, || border::reduce_border(img, region));
        border::finalize(sum, img)
    }

    /// Write `bits[i]` into the LSB of `plan` slot `i`.
    ///
    /// # Panics
    /// If `plan.len() != bits.len()` or a slot lies outside the image. Both
    /// indicate a plan built for a different stream or image.
    pub fn embed(&mut self, buf: &mut DeviceImage, plan: &EmbeddingPlan, bits: &[u8]) {
        assert_eq!(plan.len(), bits.len(), "plan length must match bit stream length");
        let img = &mut buf.image;
        let (width, channels) = (img.width() as usize, img.channels() as usize);
        let height = img.height();
        for slot in plan.iter() {
            assert!(
                (slot.x as usize) < width && slot.y < height && (slot.channel as usize) < channels,
                "slot {slot:?} outside image"
            );
        }
        let samples = img.as_raw_mut();

        self.launch(KernelOp::Embed, plan.len(), move || {
            write_lsbs(samples, width, channels, plan, bits)
        });
    }

    /// Read the LSB of every `plan` slot, in plan order.
    pub fn extract(&mut self, buf: &DeviceImage, plan: &EmbeddingPlan) -> Vec<u8> {
        let img = &buf.image;
        self.launch(KernelOp::Extract, plan.len(), || read_lsbs(img, plan))
    }

    /// Kernel launches so far.
    pub fn launches(&self) -> u32 {
        self.launches
    }

    /// Timing of this call so far, with total measured from acquisition.
    pub fn timing(&self) -> TimingRecord {
        TimingRecord::new(self.kernel_time, self.acquired.elapsed())
    }

    /// Timing with total measured from an earlier `start` (e.g. before I/O).
    pub fn timing_since(&self, start: Instant) -> TimingRecord {
        TimingRecord::new(self.kernel_time, start.elapsed())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        debug!(
            launches = self.launches,
            kernel_micros = self.kernel_time.as_micros() as u64,
            "device released"
        );
    }
}

#[inline]
fn sample_index(width: usize, channels: usize, slot: &Slot) -> usize {
    (slot.y as usize * width + slot.x as usize) * channels + slot.channel as usize
}

#[cfg(feature = "parallel")]
fn write_lsbs(samples: &mut [u8], width: usize, channels: usize, plan: &EmbeddingPlan, bits: &[u8]) {
    let ptr = SamplePtr(samples.as_mut_ptr());
    plan.slots().par_iter().zip(bits.par_iter()).for_each(|(slot, &bit)| {
        let idx = sample_index(width, channels, slot);
        // Safety: plan slots are unique, so every index is written by exactly
        // one work item, and the caller bounds-checked every slot.
        unsafe { ptr.write_lsb(idx, bit) }
    });
}

#[cfg(not(feature = "parallel"))]
fn write_lsbs(samples: &mut [u8], width: usize, channels: usize, plan: &EmbeddingPlan, bits: &[u8]) {
    for (slot, &bit) in plan.iter().zip(bits) {
        let idx = sample_index(width, channels, slot);
        samples[idx] = (samples[idx] & !1) | (bit & 1);
    }
}

#[cfg(feature = "parallel")]
fn read_lsbs(img: &Image, plan: &EmbeddingPlan) -> Vec<u8> {
    plan.slots().par_iter().map(|s| img.get(s.x, s.y, s.channel) & 1).collect()
}

#[cfg(not(feature = "parallel"))]
fn read_lsbs(img: &Image, plan: &EmbeddingPlan) -> Vec<u8> {
    plan.iter().map(|s| img.get(s.x, s.y, s.channel) & 1).collect()
}

/// Raw sample pointer shared across rayon workers for disjoint writes.
#[cfg(feature = "parallel")]
struct SamplePtr(*mut u8);
#[cfg(feature = "parallel")]
unsafe impl Send for SamplePtr {}
#[cfg(feature = "parallel")]
unsafe impl Sync for SamplePtr {}

#[cfg(feature = "parallel")]
impl SamplePtr {
    /// Replace the least-significant bit of the sample at `idx`.
    ///
    /// # Safety
    /// `idx` must be in bounds and no other worker may touch the same index.
    unsafe fn write_lsb(&self, idx: usize, bit: u8) {
        let p = self.0.add(idx);
        *p = (*p & !1) | (bit & 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stego::border::fingerprint_sequential;
    use crate::stego::permute::plan;

    fn sample_image() -> Image {
        Image::from_fn(48, 40, 3, |x, y, c| (x * 5 + y * 3 + c as u32 * 17) as u8).unwrap()
    }

    #[test]
    fn hash_kernel_matches_reference() {
        let img = sample_image();
        let mut dev = Device::acquire().unwrap();
        let buf = dev.upload(&img);
        let region = BorderRegion::of(&img).unwrap();
        assert_eq!(dev.hash(&buf, &region), fingerprint_sequential(&img).unwrap());
    }

    #[test]
    fn embed_then_extract_same_plan() {
        let img = sample_image();
        let region = BorderRegion::of(&img).unwrap();
        let p = plan(Fingerprint(77), region.interior(3), 200).unwrap();
        let bits: Vec<u8> = (0..200).map(|i| ((i * 7) % 3 == 0) as u8).collect();

        let mut dev = Device::acquire().unwrap();
        let mut buf = dev.upload(&img);
        dev.embed(&mut buf, &p, &bits);
        assert_eq!(dev.extract(&buf, &p), bits);

        let out = dev.download(buf);
        for slot in p.iter() {
            let before = img.get(slot.x, slot.y, slot.channel);
            let after = out.get(slot.x, slot.y, slot.channel);
            assert_eq!(before & !1, after & !1, "only the LSB may change");
        }
    }

    #[test]
    fn embed_touches_only_plan_slots() {
        let img = sample_image();
        let region = BorderRegion::of(&img).unwrap();
        let p = plan(Fingerprint(5), region.interior(3), 64).unwrap();
        let bits = vec![1u8; 64];

        let mut dev = Device::acquire().unwrap();
        let mut buf = dev.upload(&img);
        dev.embed(&mut buf, &p, &bits);
        let out = dev.download(buf);

        let in_plan: std::collections::HashSet<_> =
            p.iter().map(|s| (s.x, s.y, s.channel)).collect();
        for y in 0..img.height() {
            for x in 0..img.width() {
                for c in 0..3 {
                    if !in_plan.contains(&(x, y, c)) {
                        assert_eq!(img.get(x, y, c), out.get(x, y, c));
                    }
                }
            }
        }
    }

    #[test]
    fn upload_does_not_alias_host() {
        let img = sample_image();
        let region = BorderRegion::of(&img).unwrap();
        let p = plan(Fingerprint(1), region.interior(3), 32).unwrap();
        let mut dev = Device::acquire().unwrap();
        let mut buf = dev.upload(&img);
        let inverted: Vec<u8> = dev.extract(&buf, &p).iter().map(|b| b ^ 1).collect();
        dev.embed(&mut buf, &p, &inverted);
        assert_ne!(buf.image(), &img);
        assert_eq!(img, sample_image());
    }

    #[test]
    #[should_panic(expected = "plan length must match")]
    fn length_mismatch_panics() {
        let img = sample_image();
        let region = BorderRegion::of(&img).unwrap();
        let p = plan(Fingerprint(1), region.interior(3), 10).unwrap();
        let mut dev = Device::acquire().unwrap();
        let mut buf = dev.upload(&img);
        dev.embed(&mut buf, &p, &[0; 9]);
    }

    #[test]
    fn timing_total_covers_kernels() {
        let img = sample_image();
        let region = BorderRegion::of(&img).unwrap();
        let mut dev = Device::acquire().unwrap();
        let buf = dev.upload(&img);
        let _ = dev.hash(&buf, &region);
        let t = dev.timing();
        assert!(t.total() >= t.gpu());
        assert!(t.gpu() > Duration::ZERO);
        assert_eq!(dev.launches(), 1);
    }

    #[test]
    fn timing_record_clamps_and_formats() {
        let t = TimingRecord::new(Duration::from_micros(2500), Duration::from_micros(1000));
        assert_eq!(t.total(), t.gpu());
        let t = TimingRecord::new(Duration::from_micros(1234), Duration::from_micros(5678));
        assert_eq!(t.to_string(), "GPU time: 1.23 ms\nTotal time: 5.68 ms");
    }

    #[test]
    fn kernel_names() {
        assert_eq!(KernelOp::Hash.to_string(), "hash");
        assert_eq!(KernelOp::Embed.name(), "embed");
        assert_eq!(KernelOp::Extract.name(), "extract");
    }
}
