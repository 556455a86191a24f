use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Build an integer matrix from row-major values
pub fn int_matrix<B: Backend>(
    values: Vec<i64>,
    shape: [usize; 2],
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let data: Data<B::IntElem, 2> = Data::new(
        values.into_iter().map(|value| value.elem()).collect(),
        Shape::new(shape),
    );

    Tensor::from_data(data, device)
}

/// Build a float matrix from row-major values
pub fn float_matrix<B: Backend>(
    values: Vec<f32>,
    shape: [usize; 2],
    device: &B::Device,
) -> Tensor<B, 2> {
    let data: Data<B::FloatElem, 2> = Data::new(
        values.into_iter().map(|value| value.elem()).collect(),
        Shape::new(shape),
    );

    Tensor::from_data(data, device)
}

/// Read an integer matrix back into host rows
pub fn int_rows<B: Backend>(tensor: Tensor<B, 2, Int>) -> Vec<Vec<i64>> {
    let [batch_size, seq_length] = tensor.dims();
    let values = tensor.into_data().convert::<i64>().value;

    into_rows(values, batch_size, seq_length)
}

/// Read a float matrix back into host rows
pub fn float_rows<B: Backend>(tensor: Tensor<B, 2>) -> Vec<Vec<f32>> {
    let [batch_size, width] = tensor.dims();
    let values = tensor.into_data().convert::<f32>().value;

    into_rows(values, batch_size, width)
}

fn into_rows<E: Clone>(values: Vec<E>, rows: usize, width: usize) -> Vec<Vec<E>> {
    if width == 0 {
        return vec![Vec::new(); rows];
    }

    values.chunks(width).map(<[E]>::to_vec).collect()
}
