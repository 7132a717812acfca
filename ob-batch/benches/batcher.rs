use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use ob_batch::{BatchModel, BatchRunner, ModelError};
use ob_core::{stack, unstack, Tensor, TensorMap};

struct EchoModel;

impl BatchModel for EchoModel {
    fn invoke(&self, _method: &str, batch: &TensorMap) -> Result<TensorMap, ModelError> {
        Ok(batch.clone())
    }

    fn initial_hidden(&self, batch_size: usize) -> TensorMap {
        let mut out = TensorMap::new();
        out.insert("h0", Tensor::zeros(vec![batch_size, 16]));
        out
    }
}

fn request(dim: usize) -> TensorMap {
    let mut m = TensorMap::new();
    m.insert("priv_s", Tensor::from_vec(vec![0.5; dim]));
    m.insert("h0", Tensor::zeros(vec![1, 16]));
    m
}

fn bench_stack_unstack(c: &mut Criterion) {
    let rows: Vec<TensorMap> = (0..32).map(|_| request(64)).collect();
    let refs: Vec<&TensorMap> = rows.iter().collect();
    c.bench_function("stack_unstack_32x64", |b| {
        b.iter(|| {
            let batch = stack(&refs).unwrap();
            unstack(&batch, refs.len()).unwrap()
        })
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let runner = BatchRunner::new(Arc::new(EchoModel) as Arc<dyn BatchModel>);
    runner.register_method("act", 8).unwrap();
    runner.start().unwrap();
    c.bench_function("submit_recv_round_trip", |b| {
        b.iter(|| {
            let fut = runner.submit("act", request(64)).unwrap();
            fut.recv().unwrap()
        })
    });
    runner.stop();
}

criterion_group!(benches, bench_stack_unstack, bench_round_trip);
criterion_main!(benches);
