//! rank_cu.rs
//! CUDA offload for list ranking.
//!
//! Design:
//! - Pack, walk and combine run as kernels on one device; `next`, the working
//!   buffer and the rank array stay resident between them.
//! - The reducer runs on the host through the same `Reducer` strategy as the
//!   CPU path: metadata is copied down after the walk and base offsets are
//!   copied back up before the combine (the only two host/device barriers).
//! - The walk kernel takes `next` as `const unsigned int* __restrict__`, so
//!   NVCC may issue each successor load ahead of the previous slot store.
//!
//! NOTE: This module is only built with `--features gpu` and needs `cudarc`
//! plus a CUDA toolkit with NVRTC.

use std::time::Instant;

use anyhow::{Context, Result, ensure};
use cudarc::driver::{CudaContext, CudaSlice, LaunchConfig, PushKernelArg};
use cudarc::nvrtc::compile_ptx;
use log::{debug, info};

use crate::boundary::Boundaries;
use crate::list::{Index, SublistMeta};
use crate::rank::{RankOptions, check_args, try_filled};
use crate::validate::validate_list;
use crate::walk::WalkMode;

#[derive(Clone, Debug)]
pub struct GpuOptions {
    /// CUDA device ordinal.
    pub device: usize,
    /// Threads per block for every kernel. Typical: 128, 256, 512.
    pub block_size: u32,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            device: 0,
            block_size: 256,
        }
    }
}

/// How many CUDA devices are visible.
pub fn device_count() -> Result<usize> {
    Ok(CudaContext::device_count()? as usize)
}

/// GPU version of [`crate::rank_list_into`]. Same preconditions, same output.
pub fn rank_list_gpu(
    next: &[Index],
    head: Index,
    rank: &mut [Index],
    opts: &RankOptions,
    gpu: &GpuOptions,
) -> Result<()> {
    let n = next.len();
    let k = check_args(next, head, rank, opts.sublists)?;
    ensure!(gpu.block_size > 0, "block size must be positive");
    let visible = device_count()?;
    ensure!(
        gpu.device < visible,
        "requested CUDA device {} but only {} devices available",
        gpu.device,
        visible
    );
    if opts.validate {
        validate_list(next, head).context("input is not a single list")?;
    }

    let bounds = Boundaries::new(head, k as Index);
    let reducer = opts.reducer.reducer();
    let mut h_size = try_filled(k, 0 as Index, "sublist sizes")?;
    let mut h_next = try_filled(k, 0 as Index, "sublist links")?;
    let mut base = try_filled(k, 0 as Index, "base offsets")?;

    info!(
        "GPU: n={} k={} walk={:?} reducer={} device={}",
        n,
        k,
        opts.walk,
        reducer.name(),
        gpu.device
    );
    let t_all = Instant::now();

    let ctx = CudaContext::new(gpu.device)?;
    let stream = ctx.default_stream();
    let ptx = compile_ptx(KERNEL_SRC)?;
    let module = ctx.load_module(ptx)?;
    let f_pack = module
        .load_function("listrank_pack")
        .context("load kernel listrank_pack")?;
    let f_walk = match opts.walk {
        WalkMode::Split => module
            .load_function("listrank_walk")
            .context("load kernel listrank_walk")?,
        WalkMode::InPlace => module
            .load_function("listrank_walk_in_place")
            .context("load kernel listrank_walk_in_place")?,
    };
    let f_combine = module
        .load_function("listrank_combine")
        .context("load kernel listrank_combine")?;

    let n_u32 = n as u32;
    let k_u32 = k as u32;
    let last_u32 = bounds.element(k_u32 - 1);

    // device buffers; the working buffer is n (sublist, offset) pairs
    let d_next: CudaSlice<u32> = stream.clone_htod(next)?;
    let mut d_buf: CudaSlice<u32> = stream.alloc_zeros(2 * n)?;
    let mut d_size: CudaSlice<u32> = stream.alloc_zeros(k)?;
    let mut d_link: CudaSlice<u32> = stream.alloc_zeros(k)?;
    let mut d_rank: CudaSlice<u32> = stream.alloc_zeros(n)?;

    let over_n = launch_cfg(n_u32, gpu.block_size);
    let over_k = launch_cfg(k_u32, gpu.block_size);

    // ---------- pack ----------
    let t = Instant::now();
    {
        let mut launch = stream.launch_builder(&f_pack);
        launch.arg(&d_next);
        launch.arg(&mut d_buf);
        launch.arg(&n_u32);
        unsafe { launch.launch(over_n) }?;
    }

    // ---------- walk ----------
    {
        let mut launch = stream.launch_builder(&f_walk);
        if opts.walk == WalkMode::Split {
            launch.arg(&d_next);
        }
        launch.arg(&mut d_buf);
        launch.arg(&mut d_size);
        launch.arg(&mut d_link);
        launch.arg(&k_u32);
        launch.arg(&last_u32);
        unsafe { launch.launch(over_k) }?;
    }
    stream.synchronize()?;
    info!("GPU: pack+walk {:>6} ms", t.elapsed().as_millis());

    // ---------- reduce on host ----------
    let t = Instant::now();
    stream.memcpy_dtoh(&d_size, &mut h_size)?;
    stream.memcpy_dtoh(&d_link, &mut h_next)?;
    let meta: Vec<SublistMeta> = h_size
        .iter()
        .zip(&h_next)
        .map(|(&size, &next)| SublistMeta { size, next })
        .collect();
    reducer.base_offsets(&meta, bounds.head_id(), &mut base);
    let d_base: CudaSlice<u32> = stream.clone_htod(&base)?;
    debug!("GPU: reduce (incl. transfers) {:>6} ms", t.elapsed().as_millis());

    // ---------- combine ----------
    let t = Instant::now();
    {
        let mut launch = stream.launch_builder(&f_combine);
        launch.arg(&d_buf);
        launch.arg(&d_base);
        launch.arg(&mut d_rank);
        launch.arg(&n_u32);
        unsafe { launch.launch(over_n) }?;
    }
    stream.synchronize()?;
    stream.memcpy_dtoh(&d_rank, rank)?;
    debug!("GPU: combine+download {:>6} ms", t.elapsed().as_millis());

    info!("GPU: total wall time {} ms", t_all.elapsed().as_millis());
    Ok(())
}

fn launch_cfg(items: u32, block: u32) -> LaunchConfig {
    LaunchConfig {
        grid_dim: (items.div_ceil(block), 1, 1),
        block_dim: (block, 1, 1),
        shared_mem_bytes: 0,
    }
}

// ------------------------- CUDA kernels -------------------------

const KERNEL_SRC: &str = r#"
#define LR_NONE 0xFFFFFFFFu

__device__ __forceinline__ unsigned int boundary_id(
    unsigned int e, unsigned int k, unsigned int last
){
    if (e < k - 1u) return e;
    if (e == last) return k - 1u;
    return LR_NONE;
}

extern "C" __global__
void listrank_pack(
    const unsigned int* __restrict__ next,  // [n]
    uint2* __restrict__ buf,                // [n] (succ, 0)
    unsigned int n
){
    unsigned int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i >= n) return;
    buf[i] = make_uint2(next[i], 0u);
}

extern "C" __global__
void listrank_walk(
    const unsigned int* __restrict__ next,  // [n], read only
    uint2* __restrict__ buf,                // [n] (sublist, offset)
    unsigned int* __restrict__ size,        // [k]
    unsigned int* __restrict__ link,        // [k]
    unsigned int k,
    unsigned int last                       // element owned by id k-1
){
    unsigned int id = blockIdx.x * blockDim.x + threadIdx.x;
    if (id >= k) return;

    unsigned int cur = (id + 1u == k) ? last : id;
    unsigned int off = 0u;
    for (;;) {
        unsigned int succ = next[cur];
        buf[cur] = make_uint2(id, off);
        ++off;
        unsigned int reached = boundary_id(succ, k, last);
        if (succ == LR_NONE || reached != LR_NONE) {
            size[id] = off;
            link[id] = reached;
            return;
        }
        cur = succ;
    }
}

extern "C" __global__
void listrank_walk_in_place(
    uint2* buf,                             // [n] packed (succ, 0)
    unsigned int* __restrict__ size,
    unsigned int* __restrict__ link,
    unsigned int k,
    unsigned int last
){
    unsigned int id = blockIdx.x * blockDim.x + threadIdx.x;
    if (id >= k) return;

    unsigned int cur = (id + 1u == k) ? last : id;
    unsigned int off = 0u;
    for (;;) {
        unsigned int succ = buf[cur].x;
        buf[cur] = make_uint2(id, off);
        ++off;
        unsigned int reached = boundary_id(succ, k, last);
        if (succ == LR_NONE || reached != LR_NONE) {
            size[id] = off;
            link[id] = reached;
            return;
        }
        cur = succ;
    }
}

extern "C" __global__
void listrank_combine(
    const uint2* __restrict__ buf,          // [n]
    const unsigned int* __restrict__ base,  // [k]
    unsigned int* __restrict__ rank,        // [n]
    unsigned int n
){
    unsigned int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i >= n) return;
    uint2 s = buf[i];
    rank[i] = base[s.x] + s.y;
}
"#;
