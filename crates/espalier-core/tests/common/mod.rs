#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use espalier_core::error::{Error, Result};
use espalier_core::foreign::{
    ArrayBuf, DensePayload, ForeignMatrix, MemoryOrder, SparseLeaf, SparsePayload,
};

#[derive(Debug, Clone, Copy)]
pub enum Dtype {
    F64,
    F32,
    I64,
    I32,
    I16,
    I8,
    U64,
    U32,
    U16,
    U8,
}

pub fn buf_from_f64(dtype: Dtype, values: &[f64]) -> ArrayBuf {
    match dtype {
        Dtype::F64 => ArrayBuf::F64(values.to_vec()),
        Dtype::F32 => ArrayBuf::F32(values.iter().map(|&v| v as f32).collect()),
        Dtype::I64 => ArrayBuf::I64(values.iter().map(|&v| v as i64).collect()),
        Dtype::I32 => ArrayBuf::I32(values.iter().map(|&v| v as i32).collect()),
        Dtype::I16 => ArrayBuf::I16(values.iter().map(|&v| v as i16).collect()),
        Dtype::I8 => ArrayBuf::I8(values.iter().map(|&v| v as i8).collect()),
        Dtype::U64 => ArrayBuf::U64(values.iter().map(|&v| v as u64).collect()),
        Dtype::U32 => ArrayBuf::U32(values.iter().map(|&v| v as u32).collect()),
        Dtype::U16 => ArrayBuf::U16(values.iter().map(|&v| v as u16).collect()),
        Dtype::U8 => ArrayBuf::U8(values.iter().map(|&v| v as u8).collect()),
    }
}

/// An in-process stand-in for a foreign matrix, with call logging and
/// fault injection.
pub struct MockMatrix {
    pub nrow: usize,
    pub ncol: usize,
    pub sparse: bool,
    pub row_bounds: Vec<usize>,
    pub col_bounds: Vec<usize>,
    pub data: Vec<f64>,
    pub order: MemoryOrder,
    pub dtype: Dtype,
    pub none_contents: bool,
    fail_next: AtomicBool,
    dense_log: Mutex<Vec<(Vec<usize>, Vec<usize>)>>,
    sparse_log: Mutex<Vec<(Vec<usize>, Vec<usize>)>>,
}

impl MockMatrix {
    pub fn dense(
        nrow: usize,
        ncol: usize,
        data: Vec<f64>,
        row_bounds: Vec<usize>,
        col_bounds: Vec<usize>,
    ) -> Self {
        assert_eq!(data.len(), nrow * ncol);
        Self {
            nrow,
            ncol,
            sparse: false,
            row_bounds,
            col_bounds,
            data,
            order: MemoryOrder::RowMajor,
            dtype: Dtype::F64,
            none_contents: false,
            fail_next: AtomicBool::new(false),
            dense_log: Mutex::new(Vec::new()),
            sparse_log: Mutex::new(Vec::new()),
        }
    }

    pub fn sparse(
        nrow: usize,
        ncol: usize,
        data: Vec<f64>,
        row_bounds: Vec<usize>,
        col_bounds: Vec<usize>,
    ) -> Self {
        let mut out = Self::dense(nrow, ncol, data, row_bounds, col_bounds);
        out.sparse = true;
        out
    }

    pub fn with_order(mut self, order: MemoryOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_none_contents(mut self) -> Self {
        self.none_contents = true;
        self
    }

    pub fn value(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.ncol + c]
    }

    /// Arm a one-shot failure for the next extraction call.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn dense_calls(&self) -> usize {
        self.dense_log.lock().unwrap().len()
    }

    pub fn sparse_calls(&self) -> usize {
        self.sparse_log.lock().unwrap().len()
    }

    pub fn boundary_calls(&self) -> usize {
        self.dense_calls() + self.sparse_calls()
    }

    pub fn dense_log(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        self.dense_log.lock().unwrap().clone()
    }

    pub fn sparse_log(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        self.sparse_log.lock().unwrap().clone()
    }

    /// The row (or column) `i` restricted to `non_target`, straight from the
    /// backing data.
    pub fn expected_slice(&self, by_row: bool, i: usize, non_target: &[usize]) -> Vec<f64> {
        non_target
            .iter()
            .map(|&j| {
                if by_row {
                    self.value(i, j)
                } else {
                    self.value(j, i)
                }
            })
            .collect()
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(Error::BoundaryCallFailed {
                class: self.class_name(),
                payload: "simulated extraction failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl ForeignMatrix for MockMatrix {
    fn class_name(&self) -> String {
        "MockMatrix".to_string()
    }

    fn shape(&self) -> Result<(usize, usize)> {
        Ok((self.nrow, self.ncol))
    }

    fn is_sparse(&self) -> Result<bool> {
        Ok(self.sparse)
    }

    fn chunk_boundaries(&self) -> Result<(Vec<usize>, Vec<usize>)> {
        Ok((self.row_bounds.clone(), self.col_bounds.clone()))
    }

    fn extract_dense(&self, rows: &[usize], cols: &[usize]) -> Result<DensePayload> {
        self.dense_log
            .lock()
            .unwrap()
            .push((rows.to_vec(), cols.to_vec()));
        self.check_failure()?;

        let values = match self.order {
            MemoryOrder::RowMajor => {
                let mut values = Vec::with_capacity(rows.len() * cols.len());
                for &r in rows {
                    for &c in cols {
                        values.push(self.value(r, c));
                    }
                }
                values
            }
            MemoryOrder::ColumnMajor => {
                let mut values = Vec::with_capacity(rows.len() * cols.len());
                for &c in cols {
                    for &r in rows {
                        values.push(self.value(r, c));
                    }
                }
                values
            }
        };

        Ok(DensePayload {
            nrows: rows.len(),
            ncols: cols.len(),
            order: self.order,
            data: buf_from_f64(self.dtype, &values),
        })
    }

    fn extract_sparse(&self, rows: &[usize], cols: &[usize]) -> Result<SparsePayload> {
        self.sparse_log
            .lock()
            .unwrap()
            .push((rows.to_vec(), cols.to_vec()));
        self.check_failure()?;

        if self.none_contents {
            return Ok(SparsePayload {
                ncols: cols.len(),
                leaves: None,
            });
        }

        let mut leaves = Vec::with_capacity(cols.len());
        for &c in cols {
            let mut indices = Vec::new();
            let mut values = Vec::new();
            for (local, &r) in rows.iter().enumerate() {
                let v = self.value(r, c);
                if v != 0.0 {
                    indices.push(local as i32);
                    values.push(v);
                }
            }
            if indices.is_empty() {
                leaves.push(None);
            } else {
                leaves.push(Some(SparseLeaf {
                    indices: ArrayBuf::I32(indices),
                    values: buf_from_f64(self.dtype, &values),
                }));
            }
        }

        Ok(SparsePayload {
            ncols: cols.len(),
            leaves: Some(leaves),
        })
    }
}
