use criterion::*;
use std::hint::black_box;

use gpu_kernel_bench::gpu::{execute, run_kernel, DispatchPipeline, DispatchRequest, KernelModule};
use gpu_kernel_bench::{MatrixParams, Workgroups, XorShift64};

mod gpu_common;
use gpu_common::*;

fn gpu_dispatch_benchmark(c: &mut Criterion) {
    let Some(mut context) = context() else { return };
    let kernel = matmul_kernel();

    let params = MatrixParams::default();
    let mut rng = XorShift64::new(3);
    let a = rng.f32_vec(params.a_len());
    let b = rng.f32_vec(params.b_len());
    let inputs: [&[u8]; 2] = [bytemuck::cast_slice(&a), bytemuck::cast_slice(&b)];
    let workgroups = Workgroups::for_matmul(&params);

    let mut group = c.benchmark_group("gpu_matmul");
    group.sample_size(20);

    // Full one-shot path: load, upload, build, dispatch, download, teardown.
    group.bench_function("run_kernel_32x128x128x128", |bench| {
        let request = DispatchRequest {
            kernel: kernel.path(),
            inputs: &inputs,
            params: bytemuck::bytes_of(&params),
            workgroups,
        };
        let mut out = vec![0u8; params.c_len() * 4];
        bench.iter(|| {
            run_kernel(&mut context, &request, &mut out).unwrap();
            black_box(&out);
        });
    });

    // Dispatch only, on a pipeline built once.
    let module = KernelModule::load(&context, kernel.path()).unwrap();
    let pipeline = DispatchPipeline::build(
        &context,
        module,
        &inputs,
        (params.c_len() * 4) as u64,
        std::mem::size_of::<MatrixParams>(),
    )
    .unwrap();

    group.bench_function("execute_32x128x128x128", |bench| {
        bench.iter(|| {
            black_box(execute(&mut context, &pipeline, bytemuck::bytes_of(&params), workgroups).unwrap())
        });
    });

    group.finish();
    drop(pipeline);
    context.cleanup().unwrap();
}

criterion_group!(benches, gpu_dispatch_benchmark);
criterion_main!(benches);
