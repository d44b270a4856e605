//! Python bindings for the espalier extractor engine.

use std::sync::{Arc, Mutex};

use espalier_core::error::Error;
use espalier_core::{
    parallelize, BridgeOptions, BridgedMatrix, ConsecutiveOracle, Matrix, Oracle, Subset,
};
use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyModule;

mod seed;

use seed::PySeed;

fn to_py_err(err: Error) -> PyErr {
    match err {
        Error::BoundaryCallFailed { .. } => PyErr::new::<PyRuntimeError, _>(err.to_string()),
        _ => PyErr::new::<PyValueError, _>(err.to_string()),
    }
}

/// A matrix-like Python object behind the chunk-aware caching engine.
#[pyclass(module = "espalier")]
struct BridgedSeed {
    inner: BridgedMatrix<PySeed>,
}

impl BridgedSeed {
    fn target_dim(&self, by_row: bool) -> usize {
        if by_row {
            self.inner.nrow()
        } else {
            self.inner.ncol()
        }
    }

    fn non_target_dim(&self, by_row: bool) -> usize {
        if by_row {
            self.inner.ncol()
        } else {
            self.inner.nrow()
        }
    }

    fn scan_oracle(&self, by_row: bool, oracle: bool) -> Option<Arc<dyn Oracle>> {
        oracle.then(|| {
            Arc::new(ConsecutiveOracle::new(0, self.target_dim(by_row))) as Arc<dyn Oracle>
        })
    }

    fn extract_dense_matrix<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        subset: Subset,
        oracle: bool,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let targets = self.target_dim(by_row);
        let width = subset.len(self.non_target_dim(by_row));
        let oracle = self.scan_oracle(by_row, oracle);
        let inner = &self.inner;

        let data = py
            .detach(move || {
                let mut extractor = inner.dense(by_row, subset, oracle)?;
                let mut out = vec![0.0f64; targets * width];
                for i in 0..targets {
                    extractor.fetch(i, &mut out[i * width..(i + 1) * width])?;
                }
                Ok::<_, Error>(out)
            })
            .map_err(to_py_err)?;

        let arr = Array2::from_shape_vec((targets, width), data)
            .map_err(|_| PyErr::new::<PyValueError, _>("output shape mismatch"))?;
        Ok(arr.into_pyarray(py))
    }

    #[allow(clippy::type_complexity)]
    fn extract_sparse_matrix<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        subset: Subset,
        oracle: bool,
        needs_value: bool,
        needs_index: bool,
    ) -> PyResult<(
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<f64>>,
    )> {
        let targets = self.target_dim(by_row);
        let width = subset.len(self.non_target_dim(by_row));
        let oracle = self.scan_oracle(by_row, oracle);
        let inner = &self.inner;

        let (offsets, indices, values) = py
            .detach(move || {
                let mut extractor =
                    inner.sparse(by_row, subset, oracle, needs_value, needs_index)?;
                let mut offsets = Vec::with_capacity(targets + 1);
                offsets.push(0i64);
                let mut all_indices = Vec::new();
                let mut all_values = Vec::new();
                let mut value_buffer = vec![0.0f64; width];
                let mut index_buffer = vec![0usize; width];
                for i in 0..targets {
                    let count = extractor.fetch(i, &mut value_buffer, &mut index_buffer)?;
                    offsets.push(offsets.last().copied().unwrap_or(0) + count as i64);
                    if needs_index {
                        all_indices.extend(index_buffer[..count].iter().map(|&ix| ix as i64));
                    }
                    if needs_value {
                        all_values.extend_from_slice(&value_buffer[..count]);
                    }
                }
                Ok::<_, Error>((offsets, all_indices, all_values))
            })
            .map_err(to_py_err)?;

        Ok((
            PyArray1::from_vec(py, offsets),
            PyArray1::from_vec(py, indices),
            PyArray1::from_vec(py, values),
        ))
    }
}

#[pymethods]
impl BridgedSeed {
    #[new]
    #[pyo3(signature = (seed, *, maximum_cache_size=None, require_minimum_cache=None))]
    fn new(
        py: Python<'_>,
        seed: Bound<'_, PyAny>,
        maximum_cache_size: Option<usize>,
        require_minimum_cache: Option<bool>,
    ) -> PyResult<Self> {
        let mut options = BridgeOptions::default();
        if let Some(bytes) = maximum_cache_size {
            options.maximum_cache_size = bytes;
        }
        if let Some(minimum) = require_minimum_cache {
            options.require_minimum_cache = minimum;
        }
        let seed = PySeed::new(py, seed)?;
        let inner = BridgedMatrix::new(seed, options).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn nrow(&self) -> usize {
        self.inner.nrow()
    }

    fn ncol(&self) -> usize {
        self.inner.ncol()
    }

    fn is_sparse(&self) -> bool {
        self.inner.is_sparse()
    }

    fn prefer_rows(&self) -> bool {
        self.inner.prefer_rows()
    }

    fn uses_oracle(&self) -> bool {
        self.inner.uses_oracle()
    }

    #[pyo3(signature = (by_row, oracle=false))]
    fn dense_full<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        oracle: bool,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        self.extract_dense_matrix(py, by_row, Subset::Full, oracle)
    }

    #[pyo3(signature = (by_row, start, length, oracle=false))]
    fn dense_block<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        start: usize,
        length: usize,
        oracle: bool,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        self.extract_dense_matrix(py, by_row, Subset::Block { start, length }, oracle)
    }

    #[pyo3(signature = (by_row, indices, oracle=false))]
    fn dense_indexed<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        indices: Vec<usize>,
        oracle: bool,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        self.extract_dense_matrix(py, by_row, Subset::Index(indices), oracle)
    }

    #[allow(clippy::type_complexity)]
    #[pyo3(signature = (by_row, oracle=false, needs_value=true, needs_index=true))]
    fn sparse_full<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        oracle: bool,
        needs_value: bool,
        needs_index: bool,
    ) -> PyResult<(
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<f64>>,
    )> {
        self.extract_sparse_matrix(py, by_row, Subset::Full, oracle, needs_value, needs_index)
    }

    #[allow(clippy::type_complexity)]
    #[pyo3(signature = (by_row, start, length, oracle=false, needs_value=true, needs_index=true))]
    fn sparse_block<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        start: usize,
        length: usize,
        oracle: bool,
        needs_value: bool,
        needs_index: bool,
    ) -> PyResult<(
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<f64>>,
    )> {
        self.extract_sparse_matrix(
            py,
            by_row,
            Subset::Block { start, length },
            oracle,
            needs_value,
            needs_index,
        )
    }

    #[allow(clippy::type_complexity)]
    #[pyo3(signature = (by_row, indices, oracle=false, needs_value=true, needs_index=true))]
    fn sparse_indexed<'py>(
        &self,
        py: Python<'py>,
        by_row: bool,
        indices: Vec<usize>,
        oracle: bool,
        needs_value: bool,
        needs_index: bool,
    ) -> PyResult<(
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<i64>>,
        Bound<'py, PyArray1<f64>>,
    )> {
        self.extract_sparse_matrix(
            py,
            by_row,
            Subset::Index(indices),
            oracle,
            needs_value,
            needs_index,
        )
    }

    /// Row sums computed across a thread pool, with every boundary crossing
    /// re-entering the interpreter through the host lock.
    #[pyo3(signature = (threads=1))]
    fn row_sums<'py>(&self, py: Python<'py>, threads: usize) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let nrow = self.inner.nrow();
        let ncol = self.inner.ncol();
        let inner = &self.inner;

        let sums = py.detach(move || {
            let sums = Mutex::new(vec![0.0f64; nrow]);
            let failure: Mutex<Option<Error>> = Mutex::new(None);
            parallelize(nrow, threads, |_worker, start, length| {
                let run = || -> Result<(), Error> {
                    let mut extractor = inner.dense(true, Subset::Full, None)?;
                    let mut buffer = vec![0.0f64; ncol];
                    for i in start..start + length {
                        extractor.fetch(i, &mut buffer)?;
                        sums.lock().unwrap()[i] = buffer.iter().sum();
                    }
                    Ok(())
                };
                if let Err(err) = run() {
                    failure.lock().unwrap().get_or_insert(err);
                }
            });
            match failure.into_inner().unwrap() {
                Some(err) => Err(err),
                None => Ok(sums.into_inner().unwrap()),
            }
        });

        Ok(PyArray1::from_vec(py, sums.map_err(to_py_err)?))
    }
}

#[pymodule]
fn espalier(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("version", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<BridgedSeed>()?;
    Ok(())
}
