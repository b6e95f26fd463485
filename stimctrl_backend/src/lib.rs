pub mod session;
#[cfg(feature = "python")]
pub mod py;

pub use crate::session::EditorSession;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn stimctrl_backend(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();
    m.add_class::<py::PySession>()?;
    Ok(())
}
