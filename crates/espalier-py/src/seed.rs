//! The Python side of the boundary: a delayedarray-protocol object plus its
//! extraction callables, exposed to the engine as a [`ForeignMatrix`].
//!
//! Every trait method attaches to the interpreter on its own; the engine
//! additionally serializes calls through its host lock, so at most one
//! thread is ever waiting on the interpreter here.

use espalier_core::error::{Error, Result};
use espalier_core::foreign::{
    ArrayBuf, DensePayload, ForeignMatrix, MemoryOrder, SparseLeaf, SparsePayload,
};
use numpy::{PyArray1, PyArray2, PyArrayMethods, PyUntypedArray, PyUntypedArrayMethods};
use pyo3::prelude::*;
use pyo3::types::{PyList, PyTuple};

/// A matrix-like Python object wrapped for consumption by the engine.
pub struct PySeed {
    seed: Py<PyAny>,
    is_sparse: Py<PyAny>,
    chunk_grid: Py<PyAny>,
    dense_extractor: Py<PyAny>,
    sparse_extractor: Py<PyAny>,
}

impl PySeed {
    /// Wrap `seed`, resolving the delayedarray callables. Must be called
    /// while attached to the interpreter.
    pub fn new(py: Python<'_>, seed: Bound<'_, PyAny>) -> PyResult<Self> {
        let module = py.import("delayedarray")?;
        Ok(Self {
            is_sparse: module.getattr("is_sparse")?.unbind(),
            chunk_grid: module.getattr("chunk_grid")?.unbind(),
            dense_extractor: module.getattr("extract_dense_array")?.unbind(),
            sparse_extractor: module.getattr("extract_sparse_array")?.unbind(),
            seed: seed.unbind(),
        })
    }

    fn boundary_error(&self, err: &PyErr) -> Error {
        Error::BoundaryCallFailed {
            class: self.class_name(),
            payload: err.to_string(),
        }
    }

    fn subset_tuple<'py>(
        &self,
        py: Python<'py>,
        rows: &[usize],
        cols: &[usize],
    ) -> PyResult<Bound<'py, PyTuple>> {
        let rows: Vec<i64> = rows.iter().map(|&v| v as i64).collect();
        let cols: Vec<i64> = cols.iter().map(|&v| v as i64).collect();
        PyTuple::new(
            py,
            [PyArray1::from_vec(py, rows), PyArray1::from_vec(py, cols)],
        )
    }
}

fn class_name_of(obj: &Bound<'_, PyAny>) -> String {
    let Ok(class) = obj.getattr("__class__") else {
        return "unknown".to_string();
    };
    class
        .getattr("__name__")
        .and_then(|name| name.extract::<String>())
        .unwrap_or_else(|_| "unnamed".to_string())
}

macro_rules! decode_dense_array {
    ($any:expr, $order:expr, $( $t:ty => $variant:ident ),+ $(,)?) => {
        $(
            if let Ok(typed) = $any.downcast::<PyArray2<$t>>() {
                let readonly = typed.readonly();
                let view = readonly.as_array();
                let data = match $order {
                    MemoryOrder::RowMajor => view.iter().copied().collect::<Vec<$t>>(),
                    MemoryOrder::ColumnMajor => view.t().iter().copied().collect::<Vec<$t>>(),
                };
                return Ok(DensePayload {
                    nrows: view.nrows(),
                    ncols: view.ncols(),
                    order: $order,
                    data: ArrayBuf::$variant(data),
                });
            }
        )+
    };
}

macro_rules! decode_vector {
    ($any:expr, $( $t:ty => $variant:ident ),+ $(,)?) => {
        $(
            if let Ok(typed) = $any.downcast::<PyArray1<$t>>() {
                let readonly = typed.readonly();
                return Ok(ArrayBuf::$variant(readonly.as_array().iter().copied().collect()));
            }
        )+
    };
}

fn unsupported_dtype(class: &str, any: &Bound<'_, PyAny>) -> Error {
    let dtype = any
        .downcast::<PyUntypedArray>()
        .ok()
        .and_then(|arr| arr.dtype().str().ok().map(|s| s.to_string()))
        .unwrap_or_else(|| class_name_of(any));
    Error::DecodeTypeUnsupported {
        class: class.to_string(),
        dtype,
    }
}

fn decode_dense_payload(class: &str, any: &Bound<'_, PyAny>) -> Result<DensePayload> {
    let untyped = any
        .downcast::<PyUntypedArray>()
        .map_err(|_| Error::BoundaryCallFailed {
            class: class.to_string(),
            payload: "extract_dense_array did not return a numpy array".to_string(),
        })?;
    let order = if untyped.is_c_contiguous() {
        MemoryOrder::RowMajor
    } else if untyped.is_fortran_contiguous() {
        MemoryOrder::ColumnMajor
    } else {
        return Err(Error::BoundaryCallFailed {
            class: class.to_string(),
            payload: "numpy array contents should be contiguous".to_string(),
        });
    };

    decode_dense_array!(
        any, order,
        f64 => F64, f32 => F32,
        i64 => I64, i32 => I32, i16 => I16, i8 => I8,
        u64 => U64, u32 => U32, u16 => U16, u8 => U8,
    );
    Err(unsupported_dtype(class, any))
}

fn decode_vector_payload(class: &str, any: &Bound<'_, PyAny>) -> Result<ArrayBuf> {
    decode_vector!(
        any,
        f64 => F64, f32 => F32,
        i64 => I64, i32 => I32, i16 => I16, i8 => I8,
        u64 => U64, u32 => U32, u16 => U16, u8 => U8,
    );
    Err(unsupported_dtype(class, any))
}

fn decode_sparse_payload(class: &str, any: &Bound<'_, PyAny>) -> Result<SparsePayload> {
    let contents = any
        .getattr("contents")
        .map_err(|err| Error::BoundaryCallFailed {
            class: class.to_string(),
            payload: err.to_string(),
        })?;
    if contents.is_none() {
        return Ok(SparsePayload {
            ncols: 0,
            leaves: None,
        });
    }

    let list = contents
        .downcast::<PyList>()
        .map_err(|_| Error::MalformedSparseLeaf {
            class: class.to_string(),
            reason: "contents should be None or a list".to_string(),
        })?;

    let mut leaves = Vec::with_capacity(list.len());
    for item in list.iter() {
        if item.is_none() {
            leaves.push(None);
            continue;
        }
        let pair = item
            .downcast::<PyTuple>()
            .ok()
            .filter(|tuple| tuple.len() == 2)
            .ok_or_else(|| Error::MalformedSparseLeaf {
                class: class.to_string(),
                reason: "each leaf should be a tuple of length 2 or None".to_string(),
            })?;
        let indices = decode_vector_payload(class, &pair.get_item(0).map_err(|err| {
            Error::MalformedSparseLeaf {
                class: class.to_string(),
                reason: err.to_string(),
            }
        })?)?;
        let values = decode_vector_payload(class, &pair.get_item(1).map_err(|err| {
            Error::MalformedSparseLeaf {
                class: class.to_string(),
                reason: err.to_string(),
            }
        })?)?;
        leaves.push(Some(SparseLeaf { indices, values }));
    }

    Ok(SparsePayload {
        ncols: leaves.len(),
        leaves: Some(leaves),
    })
}

impl ForeignMatrix for PySeed {
    fn class_name(&self) -> String {
        Python::attach(|py| class_name_of(self.seed.bind(py)))
    }

    fn shape(&self) -> Result<(usize, usize)> {
        Python::attach(|py| {
            let class = class_name_of(self.seed.bind(py));
            let shape = self
                .seed
                .bind(py)
                .getattr("shape")
                .map_err(|err| self.boundary_error(&err))?;
            let (nrow, ncol): (isize, isize) =
                shape.extract().map_err(|_| Error::ShapeOutOfRange {
                    class: class.clone(),
                    reason: "shape should be a tuple of two integers".to_string(),
                })?;
            if nrow < 0 || ncol < 0 {
                return Err(Error::ShapeOutOfRange {
                    class,
                    reason: "shape entries should be non-negative".to_string(),
                });
            }
            Ok((nrow as usize, ncol as usize))
        })
    }

    fn is_sparse(&self) -> Result<bool> {
        Python::attach(|py| {
            self.is_sparse
                .bind(py)
                .call1((self.seed.bind(py),))
                .and_then(|flag| flag.extract::<bool>())
                .map_err(|err| self.boundary_error(&err))
        })
    }

    fn chunk_boundaries(&self) -> Result<(Vec<usize>, Vec<usize>)> {
        Python::attach(|py| {
            let class = class_name_of(self.seed.bind(py));
            let grid = self
                .chunk_grid
                .bind(py)
                .call1((self.seed.bind(py),))
                .map_err(|err| self.boundary_error(&err))?;
            let bounds = grid
                .getattr("boundaries")
                .map_err(|err| self.boundary_error(&err))?;
            let pair = bounds
                .downcast::<PyTuple>()
                .ok()
                .filter(|tuple| tuple.len() == 2)
                .ok_or_else(|| Error::MalformedChunkGrid {
                    class: class.clone(),
                    reason: "boundaries should be a tuple of length 2".to_string(),
                })?;

            let mut axes = Vec::with_capacity(2);
            for axis in 0..2 {
                let raw = pair.get_item(axis).map_err(|err| self.boundary_error(&err))?;
                let mut ticks = Vec::new();
                let iter = raw.try_iter().map_err(|_| Error::MalformedChunkGrid {
                    class: class.clone(),
                    reason: "boundaries should be iterables of integers".to_string(),
                })?;
                for tick in iter {
                    let tick = tick
                        .and_then(|t| t.extract::<i64>())
                        .map_err(|_| Error::MalformedChunkGrid {
                            class: class.clone(),
                            reason: "boundary ticks should be integers".to_string(),
                        })?;
                    let tick = usize::try_from(tick).map_err(|_| Error::MalformedChunkGrid {
                        class: class.clone(),
                        reason: format!("boundary tick {tick} does not fit the index type"),
                    })?;
                    ticks.push(tick);
                }
                axes.push(ticks);
            }
            let cols = axes.pop().expect("two axes");
            let rows = axes.pop().expect("two axes");
            Ok((rows, cols))
        })
    }

    fn extract_dense(&self, rows: &[usize], cols: &[usize]) -> Result<DensePayload> {
        Python::attach(|py| {
            let class = class_name_of(self.seed.bind(py));
            let subset = self
                .subset_tuple(py, rows, cols)
                .map_err(|err| self.boundary_error(&err))?;
            let block = self
                .dense_extractor
                .bind(py)
                .call1((self.seed.bind(py), subset))
                .map_err(|err| self.boundary_error(&err))?;
            decode_dense_payload(&class, &block)
        })
    }

    fn extract_sparse(&self, rows: &[usize], cols: &[usize]) -> Result<SparsePayload> {
        Python::attach(|py| {
            let class = class_name_of(self.seed.bind(py));
            let subset = self
                .subset_tuple(py, rows, cols)
                .map_err(|err| self.boundary_error(&err))?;
            let block = self
                .sparse_extractor
                .bind(py)
                .call1((self.seed.bind(py), subset))
                .map_err(|err| self.boundary_error(&err))?;
            decode_sparse_payload(&class, &block)
        })
    }
}
