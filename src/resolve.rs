//! Dependency resolution: linear emission order over the non-lazy reference
//! graph, cycle reporting via SCCs.
//!
//! Edges reached through `OptionalOf` or through union membership are lazy:
//! they are satisfied by forward type references in the emitted artifact and
//! impose no ordering constraint. Only by-value embedding (record field,
//! alias target, array/set/tuple/dict element) orders declarations.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::schema::SchemaModel;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// A genuine non-lazy cycle: declarations embedding each other by value.
    #[error("cyclic dependency: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

impl ResolveError {
    pub fn cycle_members(&self) -> &[String] {
        match self {
            ResolveError::Cycle { path } => path,
        }
    }
}

/// The resolved linear emission order plus reverse index lookup.
#[derive(Debug)]
pub struct EmissionOrder {
    order: Vec<String>,
    index: HashMap<String, usize>,
}

impl EmissionOrder {
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Emission index of a qualified name. Every model declaration has one.
    pub fn index_of(&self, qualified: &str) -> Option<usize> {
        self.index.get(qualified).copied()
    }
}

/// Compute the emission order for the whole model.
///
/// Kahn's algorithm with an insertion-order tie-break so output is stable
/// across runs. Fails before any emission when a non-lazy cycle exists,
/// reporting the offending cycle members (smallest SCC found).
pub fn emission_order(model: &SchemaModel) -> Result<EmissionOrder, ResolveError> {
    let (graph, node_of, name_of) = non_lazy_graph(model);

    // indegree per node
    let mut indegree: HashMap<NodeIndex, usize> = HashMap::with_capacity(graph.node_count());
    for idx in graph.node_indices() {
        indegree.insert(idx, 0);
    }
    for edge in graph.edge_indices() {
        let (_, to) = graph.edge_endpoints(edge).unwrap();
        *indegree.get_mut(&to).unwrap() += 1;
    }

    let mut order = Vec::with_capacity(model.len());
    let mut emitted: BTreeSet<NodeIndex> = BTreeSet::new();

    // Repeatedly scan declarations in input order, emitting every ready one.
    // Quadratic in the worst case, fine at schema scale, and deterministic.
    loop {
        let mut progressed = false;
        for name in model.names() {
            let idx = node_of[name.as_str()];
            if emitted.contains(&idx) || indegree[&idx] > 0 {
                continue;
            }
            emitted.insert(idx);
            order.push(name.clone());
            for succ in graph.neighbors_directed(idx, petgraph::Direction::Outgoing) {
                *indegree.get_mut(&succ).unwrap() -= 1;
            }
            progressed = true;
        }
        if order.len() == model.len() {
            break;
        }
        if !progressed {
            return Err(cycle_error(&graph, &name_of, &emitted));
        }
    }

    let index = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect();
    Ok(EmissionOrder { order, index })
}

/// Per-module dependency sets, derived from references that cross module
/// boundaries (lazy or not; imports are needed either way).
pub fn module_dependencies(model: &SchemaModel) -> BTreeMap<String, BTreeSet<String>> {
    let mut deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (_, decl) in model.iter() {
        let entry = deps.entry(decl.module.clone()).or_default();
        decl.walk_named(&mut |referenced, _lazy| {
            if let Some(target) = model.get(referenced) {
                if target.module != decl.module {
                    entry.insert(target.module.clone());
                }
            }
        });
    }
    deps
}

/// Build the directed graph of non-lazy edges, dependency -> dependent.
fn non_lazy_graph(
    model: &SchemaModel,
) -> (
    DiGraph<(), ()>,
    HashMap<&str, NodeIndex>,
    HashMap<NodeIndex, String>,
) {
    let mut graph = DiGraph::<(), ()>::new();
    let mut node_of: HashMap<&str, NodeIndex> = HashMap::with_capacity(model.len());
    let mut name_of: HashMap<NodeIndex, String> = HashMap::with_capacity(model.len());

    for name in model.names() {
        let idx = graph.add_node(());
        node_of.insert(name.as_str(), idx);
        name_of.insert(idx, name.clone());
    }

    for (qualified, decl) in model.iter() {
        let this = node_of[qualified.as_str()];
        let mut edges: BTreeSet<NodeIndex> = BTreeSet::new();
        decl.walk_named(&mut |referenced, lazy| {
            if lazy || referenced == qualified {
                return; // forward type reference suffices
            }
            if let Some(&dep) = node_of.get(referenced) {
                edges.insert(dep);
            }
        });
        for dep in edges {
            graph.add_edge(dep, this, ());
        }
    }

    (graph, node_of, name_of)
}

/// Pick the offending cycle out of the stuck graph: smallest SCC of size > 1
/// among nodes that could not be emitted.
fn cycle_error(
    graph: &DiGraph<(), ()>,
    name_of: &HashMap<NodeIndex, String>,
    emitted: &BTreeSet<NodeIndex>,
) -> ResolveError {
    let mut cycles: Vec<Vec<String>> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 && scc.iter().all(|n| !emitted.contains(n)))
        .map(|scc| {
            let mut names: Vec<String> = scc.iter().map(|n| name_of[n].clone()).collect();
            names.sort();
            names
        })
        .collect();
    cycles.sort_by_key(|c| (c.len(), c.first().cloned()));

    let path = cycles
        .into_iter()
        .next()
        .unwrap_or_else(|| vec!["<unknown>".to_string()]);
    ResolveError::Cycle { path }
}

// --------------------------------- Tests ---------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeclKind, Declaration, Field, TypeRef};

    fn record(name: &str, fields: Vec<Field>) -> Declaration {
        Declaration {
            module: "api".into(),
            name: name.into(),
            kind: DeclKind::Record { fields },
        }
    }

    #[test]
    fn dependencies_precede_dependents() {
        // Bar embeds Name by value; Name must come first even though Bar is
        // declared first.
        let model = SchemaModel::build(vec![
            record(
                "Bar",
                vec![Field::required("name", TypeRef::Named("Name".into()))],
            ),
            record("Name", vec![Field::required("value", TypeRef::Str)]),
        ])
        .unwrap();

        let order = emission_order(&model).unwrap();
        assert!(order.index_of("api.Name").unwrap() < order.index_of("api.Bar").unwrap());
    }

    #[test]
    fn input_order_is_kept_when_unconstrained() {
        let model = SchemaModel::build(vec![
            record("C", vec![]),
            record("A", vec![]),
            record("B", vec![]),
        ])
        .unwrap();
        let order = emission_order(&model).unwrap();
        let names: Vec<&String> = order.iter().collect();
        assert_eq!(names, ["api.C", "api.A", "api.B"]);
    }

    #[test]
    fn direct_mutual_embedding_is_a_cycle() {
        let model = SchemaModel::build(vec![
            record("A", vec![Field::required("b", TypeRef::Named("B".into()))]),
            record("B", vec![Field::required("a", TypeRef::Named("A".into()))]),
        ])
        .unwrap();

        let err = emission_order(&model).unwrap_err();
        let members = err.cycle_members();
        assert!(members.contains(&"api.A".to_string()));
        assert!(members.contains(&"api.B".to_string()));
    }

    #[test]
    fn optional_breaks_the_cycle() {
        let model = SchemaModel::build(vec![
            record("A", vec![Field::required("b", TypeRef::Named("B".into()))]),
            record(
                "B",
                vec![Field::required(
                    "a",
                    TypeRef::OptionalOf(Box::new(TypeRef::Named("A".into()))),
                )],
            ),
        ])
        .unwrap();

        let order = emission_order(&model).unwrap();
        assert!(order.index_of("api.B").unwrap() < order.index_of("api.A").unwrap());
    }

    #[test]
    fn union_membership_imposes_no_ordering() {
        // Transport lists BusLine, declared after it. Union edges are lazy
        // so this resolves; members may land after the union itself.
        let model = SchemaModel::build(vec![
            Declaration {
                module: "api".into(),
                name: "Transport".into(),
                kind: DeclKind::Union {
                    members: vec![TypeRef::Named("BusLine".into())],
                },
            },
            record("BusLine", vec![Field::required("id", TypeRef::Num)]),
        ])
        .unwrap();
        let order = emission_order(&model).unwrap();
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn self_reference_is_allowed() {
        let model = SchemaModel::build(vec![record(
            "Node",
            vec![Field::required(
                "children",
                TypeRef::ArrayOf(Box::new(TypeRef::Named("Node".into()))),
            )],
        )])
        .unwrap();
        assert!(emission_order(&model).is_ok());
    }

    #[test]
    fn module_dependency_sets() {
        let model = SchemaModel::build(vec![
            Declaration {
                module: "common".into(),
                name: "Name".into(),
                kind: DeclKind::Alias { target: TypeRef::Str },
            },
            Declaration {
                module: "api".into(),
                name: "Bar".into(),
                kind: DeclKind::Record {
                    fields: vec![Field::required("name", TypeRef::Named("common.Name".into()))],
                },
            },
        ])
        .unwrap();

        let deps = module_dependencies(&model);
        assert!(deps["api"].contains("common"));
        assert!(deps["common"].is_empty());
    }
}
