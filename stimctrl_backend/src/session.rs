//! # Editing session with live preview
//!
//! [`EditorSession`] is what an editor front end drives: it owns a [`Protocol`], tracks which
//! node is selected, and keeps an up-to-date preview of the whole protocol.
//!
//! ## Selection
//! Structural edits are anchored at the current selection and select the node they create.
//! Deleting the selected node clears the selection. The protocol itself never sees the
//! selection, every call into it passes the anchor explicitly.
//!
//! ## Preview refresh
//! Every successful edit or selection change calls [`EditorSession::refresh`], which
//! 1. takes a read lock and copies the forest into a [`ProtocolTree`],
//! 2. releases the lock,
//! 3. synthesizes and downsamples the copy.
//!
//! A failed synthesis stores an empty preview and keeps the [`SynthError`] for the caller. The
//! edit that triggered it still succeeds: the protocol is intact and the operator can fix the
//! offending node.
//!
//! ## Sharing
//! The protocol sits behind an `Arc<RwLock<_>>`. [`EditorSession::handle`] hands out the shared
//! handle so other threads can take snapshots while the session keeps editing.

use std::sync::Arc;

use parking_lot::RwLock;

use stimcompiler_backend::*;

pub struct EditorSession {
    protocol: Arc<RwLock<Protocol>>,
    synth: Synthesizer,
    selection: Option<NodeId>,
    preview: Waveform,
    last_error: Option<SynthError>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(SynthConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: SynthConfig) -> Self {
        Self {
            protocol: Arc::new(RwLock::new(Protocol::new())),
            synth: Synthesizer::new(config),
            selection: None,
            preview: Waveform::default(),
            last_error: None,
        }
    }

    /// Shared handle to the protocol being edited.
    pub fn handle(&self) -> Arc<RwLock<Protocol>> {
        Arc::clone(&self.protocol)
    }

    pub fn config(&self) -> &SynthConfig {
        self.synth.config()
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    /// Preview of the protocol as of the last refresh. Empty after a failed synthesis.
    pub fn preview(&self) -> &Waveform {
        &self.preview
    }

    /// Why the last refresh produced an empty preview, if it failed.
    pub fn last_error(&self) -> Option<&SynthError> {
        self.last_error.as_ref()
    }

    /// Deep copy of the selected subtree, e.g. to fill an attribute panel.
    pub fn selected_node(&self) -> Result<ProtocolNode> {
        self.protocol.read().get_subtree(self.selection)
    }

    /// Deep copy of the whole forest.
    pub fn snapshot(&self) -> ProtocolTree {
        self.protocol.read().snapshot()
    }

    /// Appends a new top-level Stimulation and selects it.
    pub fn first_stimulation(&mut self) -> NodeId {
        let id = self.protocol.write().create_root_node(NodeName::Unnamed);
        self.selection = Some(id);
        log::debug!("created top-level node {}", id);
        self.refresh_after_edit();
        id
    }

    /// Inserts a Stimulation right after the selected node and selects it.
    pub fn add_sibling(&mut self) -> Result<NodeId> {
        let id = self.protocol.write().add_sibling(self.selection)?;
        self.selection = Some(id);
        self.refresh_after_edit();
        Ok(id)
    }

    /// Appends a Stimulation under the selected node and selects it.
    pub fn add_child(&mut self) -> Result<NodeId> {
        let id = self.protocol.write().add_child(self.selection)?;
        self.selection = Some(id);
        self.refresh_after_edit();
        Ok(id)
    }

    /// Deletes the selected subtree and clears the selection.
    pub fn delete_selected(&mut self) -> Result<()> {
        self.protocol.write().delete(self.selection)?;
        log::debug!("deleted node {:?}", self.selection);
        self.selection = None;
        self.refresh_after_edit();
        Ok(())
    }

    /// Changes the selection. `None` clears it; an id that is not in the protocol is rejected.
    pub fn select(&mut self, node: Option<NodeId>) -> Result<()> {
        if let Some(id) = node {
            if !self.protocol.read().contains(id) {
                return Err(ProtocolError::NoSelection);
            }
        }
        self.selection = node;
        self.refresh_after_edit();
        Ok(())
    }

    pub fn set_attribute(&mut self, attr: &Attribute) -> Result<()> {
        self.protocol.write().set_attribute(self.selection, attr)?;
        self.refresh_after_edit();
        Ok(())
    }

    /// Parses an editor cell and writes it into the selected node.
    pub fn set_attribute_text(&mut self, field: &str, text: &str) -> Result<()> {
        let attr = Attribute::parse(field, text)?;
        self.set_attribute(&attr)
    }

    /// Refresh run by every successful edit. The edit itself has already been applied, so a
    /// synthesis failure does not fail the edit: it is kept in [`EditorSession::last_error`]
    /// and the preview is left empty.
    fn refresh_after_edit(&mut self) {
        if let Err(err) = self.refresh() {
            log::debug!("edit kept, preview left empty: {}", err);
        }
    }

    /// Recomputes the preview from a fresh snapshot. On failure the preview is emptied and the
    /// error is both returned and kept.
    pub fn refresh(&mut self) -> std::result::Result<(), SynthError> {
        let tree = self.protocol.read().snapshot();
        match self.synth.preview(&tree) {
            Ok(preview) => {
                self.preview = preview;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                log::warn!("{}", err);
                self.preview = Waveform::default();
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}
