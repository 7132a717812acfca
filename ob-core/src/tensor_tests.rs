use crate::tensor::{stack, unstack, Tensor, TensorError, TensorMap};

fn row(tag: f32) -> TensorMap {
    let mut m = TensorMap::new();
    m.insert("priv_s", Tensor::from_vec(vec![tag, tag + 0.5]));
    m.insert("tag", Tensor::scalar(tag));
    m
}

#[test]
fn stack_preserves_row_order() {
    let rows = [row(0.0), row(1.0), row(2.0)];
    let refs: Vec<&TensorMap> = rows.iter().collect();
    let batch = stack(&refs).unwrap();

    let tag = batch.get("tag").unwrap();
    assert_eq!(tag.shape(), &[3]);
    assert_eq!(tag.data(), &[0.0, 1.0, 2.0]);

    let priv_s = batch.get("priv_s").unwrap();
    assert_eq!(priv_s.shape(), &[3, 2]);
    assert_eq!(priv_s.data(), &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
}

#[test]
fn unstack_round_trips_rows() {
    let rows = [row(4.0), row(7.0)];
    let refs: Vec<&TensorMap> = rows.iter().collect();
    let batch = stack(&refs).unwrap();
    let back = unstack(&batch, 2).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back[0], rows[0]);
    assert_eq!(back[1], rows[1]);
}

#[test]
fn stack_rejects_key_mismatch() {
    let a = row(0.0);
    let mut b = row(1.0);
    b.insert("extra", Tensor::scalar(9.0));
    let refs = [&a, &b];
    assert!(matches!(stack(&refs), Err(TensorError::KeyMismatch(_))));
}

#[test]
fn stack_rejects_shape_mismatch() {
    let a = row(0.0);
    let mut b = row(1.0);
    b.insert("priv_s", Tensor::from_vec(vec![1.0, 2.0, 3.0]));
    let refs = [&a, &b];
    assert!(matches!(stack(&refs), Err(TensorError::RowShapeMismatch(_))));
}

#[test]
fn unstack_rejects_wrong_row_count() {
    let rows = [row(0.0), row(1.0)];
    let refs: Vec<&TensorMap> = rows.iter().collect();
    let batch = stack(&refs).unwrap();
    assert!(matches!(
        unstack(&batch, 3),
        Err(TensorError::SplitMismatch { .. })
    ));
}

#[test]
fn scalar_accessor() {
    let m = row(3.0);
    assert_eq!(m.scalar("tag").unwrap(), 3.0);
    assert!(matches!(m.scalar("nope"), Err(TensorError::MissingKey(_))));
    assert!(matches!(m.scalar("priv_s"), Err(TensorError::NotScalar(_))));
}

#[test]
fn argmax_breaks_ties_low() {
    let t = Tensor::from_vec(vec![0.0, 2.0, 2.0, 1.0]);
    assert_eq!(t.argmax(), Some(1));
    assert_eq!(Tensor::from_vec(Vec::new()).argmax(), None);
}
