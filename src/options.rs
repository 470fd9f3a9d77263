use crate::env::env_flag;

/// Options which control how external nodes are lowered into a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportOptions {
    /// Accept operators configured to keep reduced dimensions.
    ///
    /// When false, ArgMax nodes must set `keepdims` to zero. When true, an
    /// ArgMax over a 1D input is recorded in the graph with shape `[1]`, but
    /// running it produces a scalar. See [`Graph::run_op`](crate::Graph::run_op).
    pub allow_keep_dims: bool,

    /// Log a warning for attributes that an operator never reads.
    pub warn_unused_attrs: bool,

    /// Reuse an existing operator node when a new node has the same
    /// operator configuration and inputs.
    pub dedup_nodes: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            allow_keep_dims: false,
            warn_unused_attrs: true,
            dedup_nodes: false,
        }
    }
}

impl ImportOptions {
    /// Create options from the `GRAFT_ALLOW_KEEPDIMS`,
    /// `GRAFT_WARN_UNUSED_ATTRS` and `GRAFT_DEDUP_NODES` environment
    /// variables, using the defaults for any that are unset.
    pub fn from_env() -> ImportOptions {
        let defaults = ImportOptions::default();
        ImportOptions {
            allow_keep_dims: env_flag("GRAFT_ALLOW_KEEPDIMS", defaults.allow_keep_dims),
            warn_unused_attrs: env_flag("GRAFT_WARN_UNUSED_ATTRS", defaults.warn_unused_attrs),
            dedup_nodes: env_flag("GRAFT_DEDUP_NODES", defaults.dedup_nodes),
        }
    }

    pub fn with_allow_keep_dims(mut self, allow: bool) -> Self {
        self.allow_keep_dims = allow;
        self
    }

    pub fn with_warn_unused_attrs(mut self, warn: bool) -> Self {
        self.warn_unused_attrs = warn;
        self
    }

    pub fn with_dedup_nodes(mut self, dedup: bool) -> Self {
        self.dedup_nodes = dedup;
        self
    }
}
