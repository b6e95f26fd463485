//! Python face of [`EditorSession`]. Node ids cross the boundary as plain integers and
//! attributes as `(column, text)` pairs, the way the editor's table hands them over.

use numpy::PyArray1;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use stimcompiler_backend::*;

use crate::session::EditorSession;

fn value_err(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

#[pyclass(name = "Session")]
pub struct PySession {
    inner: EditorSession,
}

#[pymethods]
impl PySession {
    #[new]
    #[pyo3(signature = (sample_rate=SAMPLE_RATE, preview_points=PREVIEW_POINTS, seed=0, insert_delay_gaps=false))]
    fn new(
        sample_rate: f64,
        preview_points: usize,
        seed: u64,
        insert_delay_gaps: bool,
    ) -> PyResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0. {
            return Err(value_err(format!(
                "sample_rate should be a positive number, got {}",
                sample_rate
            )));
        }
        let policy = if insert_delay_gaps {
            DelayPolicy::InsertGap
        } else {
            DelayPolicy::Metadata
        };
        let config = SynthConfig::new(sample_rate)
            .with_preview_points(preview_points)
            .with_seed(seed)
            .with_delay_policy(policy);
        Ok(Self {
            inner: EditorSession::new(config),
        })
    }

    fn first_stimulation(&mut self) -> u64 {
        self.inner.first_stimulation().raw()
    }

    fn add_sibling(&mut self) -> PyResult<u64> {
        self.inner.add_sibling().map(|id| id.raw()).map_err(value_err)
    }

    fn add_child(&mut self) -> PyResult<u64> {
        self.inner.add_child().map(|id| id.raw()).map_err(value_err)
    }

    fn delete_selected(&mut self) -> PyResult<()> {
        self.inner.delete_selected().map_err(value_err)
    }

    #[pyo3(signature = (node=None))]
    fn select(&mut self, node: Option<u64>) -> PyResult<()> {
        self.inner
            .select(node.map(NodeId::from_raw))
            .map_err(value_err)
    }

    fn selection(&self) -> Option<u64> {
        self.inner.selection().map(|id| id.raw())
    }

    /// Writes `text` into column `field` of the selected node.
    fn set_attribute(&mut self, field: &str, text: &str) -> PyResult<()> {
        self.inner.set_attribute_text(field, text).map_err(value_err)
    }

    /// Tree-view label of a node.
    fn label(&self, node: u64) -> PyResult<String> {
        let handle = self.inner.handle();
        let protocol = handle.read();
        let entry = protocol
            .entry(Some(NodeId::from_raw(node)))
            .map_err(value_err)?;
        Ok(entry.attrs().name.label().to_string())
    }

    /// Node ids in tree-view order.
    fn nodes(&self) -> Vec<u64> {
        let handle = self.inner.handle();
        let order = handle.read().depth_first();
        order
            .into_iter()
            .map(|id| id.raw())
            .collect()
    }

    /// Current preview as `(times, amplitudes)`.
    fn preview<'py>(&self, py: Python<'py>) -> (Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>) {
        let preview = self.inner.preview();
        (
            PyArray1::from_slice(py, preview.times()),
            PyArray1::from_slice(py, preview.amplitudes()),
        )
    }

    /// Reason of the last failed refresh, `None` if the preview is current.
    fn last_error(&self) -> Option<String> {
        self.inner.last_error().map(|err| err.to_string())
    }

    fn refresh(&mut self) -> PyResult<()> {
        self.inner.refresh().map_err(value_err)
    }
}
