use crate::model::Model;
use crate::relation::Relation;
use crate::variable::VariableList;

/// An edge of the junction tree: two clique indices and their separator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TreeEdge {
    pub a: usize,
    pub b: usize,
    pub separator: Relation,
}

/// A clique tree over the relations of a decomposable model.
///
/// The tree is unrooted; for traversal each connected component is rooted at
/// its lowest-index clique and the pre/post orders are precomputed. Entries
/// are `(clique index, edge index toward the parent)`, with `None` for
/// roots.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JunctionTree {
    cliques: Vec<Relation>,
    edges: Vec<TreeEdge>,
    pre_order: Vec<(usize, Option<usize>)>,
    post_order: Vec<(usize, Option<usize>)>,
}

impl JunctionTree {
    pub fn cliques(&self) -> &[Relation] {
        &self.cliques
    }

    pub fn edges(&self) -> &[TreeEdge] {
        &self.edges
    }

    /// Roots first, children after their parent.
    pub fn pre_order(&self) -> &[(usize, Option<usize>)] {
        &self.pre_order
    }

    /// Children before their parent, roots last.
    pub fn post_order(&self) -> &[(usize, Option<usize>)] {
        &self.post_order
    }

    /// The other endpoint of an edge.
    pub fn neighbor_of(&self, edge: usize, clique: usize) -> usize {
        let e = &self.edges[edge];
        if e.a == clique { e.b } else { e.a }
    }

    /// Smallest clique containing `var`, by member count then index.
    pub fn smallest_clique_containing(
        &self,
        var: crate::types::VariableIndex,
    ) -> Option<usize> {
        self.cliques
            .iter()
            .enumerate()
            .filter(|(_, c)| c.contains(var))
            .min_by_key(|(i, c)| (c.len(), *i))
            .map(|(i, _)| i)
    }
}

/// Outcome of a junction-tree construction attempt.
#[derive(Clone, Debug)]
pub struct JunctionTreeBuild {
    pub valid: bool,
    pub tree: Option<JunctionTree>,
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }
}

/// Build a clique tree for `model` and validate it.
///
/// 1. Cliques are the model's relations.
/// 2. The junction graph connects cliques sharing at least one variable,
///    weighted by the shared count; Kruskal picks a maximum-weight spanning
///    forest, breaking ties toward lower clique indices so the tree shape is
///    deterministic.
/// 3. Each tree edge's separator is the endpoint intersection.
/// 4. Validation: every separator must be a proper subset of both endpoint
///    cliques, and for every variable the cliques containing it must form a
///    connected subtree (running intersection). A clique pair where one
///    contains the other yields a separator equal to the smaller clique and
///    fails, which is how duplicated containment like `AB:ABC` is reported
///    as having loops.
pub fn build_junction_tree(model: &Model, vars: &VariableList) -> JunctionTreeBuild {
    let cliques: Vec<Relation> = model.relations().to_vec();
    let n = cliques.len();

    if n <= 1 {
        let tree = JunctionTree {
            pre_order: (0..n).map(|i| (i, None)).collect(),
            post_order: (0..n).map(|i| (i, None)).collect(),
            cliques,
            edges: Vec::new(),
        };
        return JunctionTreeBuild {
            valid: true,
            tree: Some(tree),
        };
    }

    // junction graph edges sorted by weight descending, then lower indices
    let mut candidates = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let separator = cliques[i].intersection(&cliques[j]);
            if !separator.is_empty() {
                candidates.push((separator.len(), i, j, separator));
            }
        }
    }
    candidates.sort_by(|x, y| y.0.cmp(&x.0).then(x.1.cmp(&y.1)).then(x.2.cmp(&y.2)));

    let mut forest = DisjointSet::new(n);
    let mut edges = Vec::new();
    for (_, i, j, separator) in candidates {
        if forest.union(i, j) {
            edges.push(TreeEdge { a: i, b: j, separator });
        }
    }

    let mut valid = true;

    for edge in &edges {
        let sep = &edge.separator;
        if sep.len() == cliques[edge.a].len() || sep.len() == cliques[edge.b].len() {
            valid = false;
        }
    }

    // running intersection: within the forest, the cliques holding a
    // variable are connected iff the edges carrying it number one less
    for v in vars.indices() {
        let holding = cliques.iter().filter(|c| c.contains(v)).count();
        if holding == 0 {
            continue;
        }
        let carrying = edges.iter().filter(|e| e.separator.contains(v)).count();
        if holding - carrying != 1 {
            valid = false;
        }
    }

    // traversal orders, one component at a time, rooted at lowest index
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for (ei, edge) in edges.iter().enumerate() {
        adjacency[edge.a].push((edge.b, ei));
        adjacency[edge.b].push((edge.a, ei));
    }
    let mut seen = vec![false; n];
    let mut pre_order = Vec::with_capacity(n);
    let mut post_order = Vec::with_capacity(n);
    for root in 0..n {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        let mut stack = vec![(root, None)];
        let mut component = Vec::new();
        while let Some((node, parent_edge)) = stack.pop() {
            component.push((node, parent_edge));
            for &(next, ei) in &adjacency[node] {
                if !seen[next] {
                    seen[next] = true;
                    stack.push((next, Some(ei)));
                }
            }
        }
        pre_order.extend(component.iter().copied());
        post_order.extend(component.iter().rev().copied());
    }

    JunctionTreeBuild {
        valid,
        tree: Some(JunctionTree {
            cliques,
            edges,
            pre_order,
            post_order,
        }),
    }
}
