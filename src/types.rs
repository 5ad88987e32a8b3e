use std::collections::{HashMap, VecDeque};

/// One converter invocation: argv[0] plus any fixed arguments. Stage reads
/// its input on stdin, writes its output on stdout.
#[derive(Debug, Clone)]
pub struct ConverterInvocation {
    pub argv: Vec<String>,
}

struct Edge {
    to: usize,
    invocation: ConverterInvocation,
}

/// Registry of declared file types and the converter edges between them.
///
/// Types are identified by name and indexed densely so the conversion
/// planner can run BFS over plain integers rather than string comparisons.
#[derive(Default)]
pub struct TypeRegistry {
    names: Vec<String>,
    index_by_name: HashMap<String, usize>,
    edges: HashMap<usize, Vec<Edge>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file type. Returns its index. Re-declaring an existing
    /// type is a no-op that returns the existing index.
    pub fn declare(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.index_by_name.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index_by_name.insert(name.to_string(), idx);
        self.edges.insert(idx, Vec::new());
        idx
    }

    pub fn find_type(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn name_of(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    /// Infer a type from a file path by its extension. Returns `None` if
    /// the extension has no declared type.
    pub fn infer_type(&self, path: &str) -> Option<usize> {
        let ext = path.rsplit('.').next()?;
        if ext == path {
            return None; // no '.' in the path
        }
        self.find_type(ext)
    }

    /// Register a conversion edge `from -> to` executed by `argv`.
    pub fn add_conversion(&mut self, from: usize, to: usize, argv: Vec<String>) {
        self.edges
            .entry(from)
            .or_default()
            .push(Edge { to, invocation: ConverterInvocation { argv } });
    }

    /// Shortest chain of converter invocations bridging `from` to `to`, or
    /// `None` if no path exists. Returns an empty chain if `from == to`.
    pub fn find_conversion_path(
        &self,
        from: usize,
        to: usize,
    ) -> Option<Vec<ConverterInvocation>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut visited = vec![false; self.names.len()];
        let mut parent: HashMap<usize, (usize, ConverterInvocation)> = HashMap::new();
        let mut queue = VecDeque::new();
        visited[from] = true;
        queue.push_back(from);

        while let Some(node) = queue.pop_front() {
            let Some(edges) = self.edges.get(&node) else {
                continue;
            };
            for edge in edges {
                if visited[edge.to] {
                    continue;
                }
                visited[edge.to] = true;
                parent.insert(edge.to, (node, edge.invocation.clone()));
                if edge.to == to {
                    return Some(reconstruct_path(from, to, &parent));
                }
                queue.push_back(edge.to);
            }
        }

        None
    }

    /// `true` iff a printer with native type `printer_type` can accept a
    /// source of type `source_type` (directly or via conversion).
    pub fn is_compatible(&self, source_type: usize, printer_type: usize) -> bool {
        source_type == printer_type || self.find_conversion_path(source_type, printer_type).is_some()
    }
}

fn reconstruct_path(
    from: usize,
    to: usize,
    parent: &HashMap<usize, (usize, ConverterInvocation)>,
) -> Vec<ConverterInvocation> {
    let mut chain = Vec::new();
    let mut cur = to;
    while cur != from {
        let (prev, invocation) = parent.get(&cur).expect("path reconstruction");
        chain.push(invocation.clone());
        cur = *prev;
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_type_matches_extension() {
        let mut reg = TypeRegistry::new();
        let pdf = reg.declare("pdf");
        assert_eq!(reg.infer_type("doc.pdf"), Some(pdf));
        assert_eq!(reg.infer_type("noext"), None);
        assert_eq!(reg.infer_type("doc.jpg"), None);
    }

    #[test]
    fn direct_match_has_empty_chain() {
        let mut reg = TypeRegistry::new();
        let pdf = reg.declare("pdf");
        assert_eq!(reg.find_conversion_path(pdf, pdf), Some(Vec::new()));
    }

    #[test]
    fn single_hop_conversion_found() {
        let mut reg = TypeRegistry::new();
        let ps = reg.declare("ps");
        let pdf = reg.declare("pdf");
        reg.add_conversion(ps, pdf, vec!["ps2pdf".to_string()]);
        let chain = reg.find_conversion_path(ps, pdf).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].argv, vec!["ps2pdf".to_string()]);
    }

    #[test]
    fn shortest_path_preferred_over_longer_detour() {
        let mut reg = TypeRegistry::new();
        let a = reg.declare("a");
        let b = reg.declare("b");
        let c = reg.declare("c");
        let d = reg.declare("d");
        reg.add_conversion(a, d, vec!["direct".to_string()]);
        reg.add_conversion(a, b, vec!["ab".to_string()]);
        reg.add_conversion(b, c, vec!["bc".to_string()]);
        reg.add_conversion(c, d, vec!["cd".to_string()]);
        let chain = reg.find_conversion_path(a, d).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].argv, vec!["direct".to_string()]);
    }

    #[test]
    fn no_path_returns_none() {
        let mut reg = TypeRegistry::new();
        let jpg = reg.declare("jpg");
        let pdf = reg.declare("pdf");
        assert_eq!(reg.find_conversion_path(jpg, pdf), None);
    }

    #[test]
    fn is_compatible_checks_direct_and_conversion() {
        let mut reg = TypeRegistry::new();
        let ps = reg.declare("ps");
        let pdf = reg.declare("pdf");
        let jpg = reg.declare("jpg");
        reg.add_conversion(ps, pdf, vec!["ps2pdf".to_string()]);
        assert!(reg.is_compatible(pdf, pdf));
        assert!(reg.is_compatible(ps, pdf));
        assert!(!reg.is_compatible(jpg, pdf));
    }
}
