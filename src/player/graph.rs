//! Audio graph attachment with reuse of already-wired handles.
//!
//! A platform audio graph (analyser, equalizer) can only wrap a given
//! playback handle once; a second attempt fails. [`GraphRegistry`] records
//! which handles are wired and hands back the existing node instead.

use std::collections::HashMap;

use super::handle::HandleId;

/// Node id assigned by the audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("{0} is already connected to the audio graph")]
    AlreadyConnected(HandleId),

    #[error("audio graph unavailable: {0}")]
    Unavailable(String),
}

/// External audio processing graph.
pub trait AudioGraph {
    /// Wrap `handle` in a source node. Fails if it was wrapped before.
    fn connect(&mut self, handle: HandleId) -> Result<NodeId, GraphError>;
}

/// Handle → node registry with explicit release.
#[derive(Debug, Default)]
pub struct GraphRegistry {
    nodes: HashMap<HandleId, NodeId>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for `handle`, connecting it only if it isn't wired yet.
    pub fn attach(
        &mut self,
        graph: &mut dyn AudioGraph,
        handle: HandleId,
    ) -> Result<NodeId, GraphError> {
        if let Some(node) = self.nodes.get(&handle) {
            tracing::debug!(%handle, "reusing existing graph node");
            return Ok(*node);
        }
        let node = graph.connect(handle)?;
        self.nodes.insert(handle, node);
        Ok(node)
    }

    /// Forget `handle` (called when the handle is disposed).
    pub fn release(&mut self, handle: HandleId) -> Option<NodeId> {
        self.nodes.remove(&handle)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Graph that fails on a second connect, like the platform does.
    #[derive(Default)]
    pub(crate) struct StrictGraph {
        pub connected: HashSet<HandleId>,
        pub connect_calls: usize,
    }

    impl AudioGraph for StrictGraph {
        fn connect(&mut self, handle: HandleId) -> Result<NodeId, GraphError> {
            self.connect_calls += 1;
            if !self.connected.insert(handle) {
                return Err(GraphError::AlreadyConnected(handle));
            }
            Ok(NodeId(u64::from(handle.0) + 100))
        }
    }

    #[test]
    fn test_attach_reuses_node() {
        let mut graph = StrictGraph::default();
        let mut registry = GraphRegistry::new();

        let first = registry.attach(&mut graph, HandleId(1)).unwrap();
        let second = registry.attach(&mut graph, HandleId(1)).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.connect_calls, 1);
    }

    #[test]
    fn test_release() {
        let mut graph = StrictGraph::default();
        let mut registry = GraphRegistry::new();
        registry.attach(&mut graph, HandleId(2)).unwrap();
        assert_eq!(registry.release(HandleId(2)), Some(NodeId(102)));
        assert_eq!(registry.release(HandleId(2)), None);
    }
}
