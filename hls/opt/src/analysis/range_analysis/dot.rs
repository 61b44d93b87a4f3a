use super::{NodeContainer, Op};
use hls_idx::IndexRef;
use hls_utils::OutputFile;
use petgraph::{
    dot::{Config, Dot},
    graph::Graph,
};
use std::io::{self, Write};

impl NodeContainer {
    /// Bipartite graph of values and operations. Values are labeled with
    /// their current range, operations with their kind.
    fn graph(&self) -> Graph<String, &'static str> {
        let mut graph = Graph::new();
        let vars = self
            .vars
            .values()
            .map(|v| {
                graph.add_node(format!("{}: {}", v.get_value(), v.get_range()))
            })
            .collect::<Vec<_>>();
        for op in self.ops.values() {
            let label = match op.op() {
                Op::Binary { op: bin, .. } => format!("{bin}"),
                Op::Unary { op: un, .. } => format!("{un}"),
                Op::Sigma { pred, .. } => {
                    format!("sigma {}", pred.as_str())
                }
                _ => op.kind().to_string(),
            };
            let node = graph.add_node(label);
            for s in op.sources() {
                graph.add_edge(vars[s.index()], node, "");
            }
            for t in op.targets() {
                graph.add_edge(node, vars[t.index()], "");
            }
        }
        graph
    }

    /// The constraint graph in dot format.
    pub fn to_dot(&self) -> String {
        let config = &[Config::EdgeNoLabel];
        format!("{}", Dot::with_config(&self.graph(), config))
    }

    pub fn write_dot(&self, out: &OutputFile) -> io::Result<()> {
        let mut w = out.get_write()?;
        w.write_all(self.to_dot().as_bytes())?;
        w.flush()
    }
}
