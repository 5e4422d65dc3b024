use rand::{Rng, SeedableRng, rngs::StdRng};

/// Synthetic directed edge list over nodes `0..node_count`.
#[derive(Clone, Debug)]
pub struct EdgeDataset {
    pub node_count: usize,
    pub edges: Vec<(u32, u32)>,
}

impl EdgeDataset {
    pub fn nodes(&self) -> usize {
        self.node_count
    }

    pub fn edges(&self) -> usize {
        self.edges.len()
    }

    pub fn out_degrees(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.node_count];
        for &(from, _) in &self.edges {
            counts[from as usize] += 1;
        }
        counts
    }

    pub fn in_degrees(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.node_count];
        for &(_, to) in &self.edges {
            counts[to as usize] += 1;
        }
        counts
    }

    pub fn hub_index(&self) -> usize {
        let mut best = (0usize, 0usize);
        for (idx, deg) in self.out_degrees().into_iter().enumerate() {
            if deg > best.0 {
                best = (deg, idx);
            }
        }
        best.1
    }

    /// Edges with nodes rendered as strings, the shape most callers cache.
    pub fn string_edges(&self) -> Vec<(String, String)> {
        self.edges
            .iter()
            .map(|&(from, to)| (node_name(from), node_name(to)))
            .collect()
    }
}

pub fn node_name(idx: u32) -> String {
    format!("n{idx}")
}

#[derive(Clone, Debug)]
pub enum GraphShape {
    Line,
    Star,
    RandomErdosRenyi { edges: usize },
    ScaleFree { m: usize },
}

/// Edges are emitted in generation order, not sorted, so that a node's
/// outgoing edges are interleaved with other nodes' edges.
pub fn generate_edges(shape: GraphShape, node_count: usize, seed: u64) -> EdgeDataset {
    assert!(node_count > 1, "node_count must exceed 1");
    let edges = match shape {
        GraphShape::Line => (0..node_count - 1).map(|idx| edge(idx, idx + 1)).collect(),
        GraphShape::Star => (1..node_count).map(|leaf| edge(0, leaf)).collect(),
        GraphShape::RandomErdosRenyi { edges } => generate_random_edges(node_count, edges, seed),
        GraphShape::ScaleFree { m } => generate_scale_free_edges(node_count, m, seed),
    };
    EdgeDataset { node_count, edges }
}

fn generate_random_edges(node_count: usize, edge_count: usize, seed: u64) -> Vec<(u32, u32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..edge_count)
        .map(|_| {
            let from = rng.gen_range(0..node_count);
            let to = rng.gen_range(0..node_count);
            edge(from, to)
        })
        .collect()
}

fn generate_scale_free_edges(node_count: usize, m: usize, seed: u64) -> Vec<(u32, u32)> {
    assert!(m > 0, "m must be positive");
    assert!(node_count > m + 1, "node_count must exceed m + 1");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut degrees = vec![0usize; node_count];
    let mut edges = Vec::new();
    let seed_nodes = m + 1;
    for u in 0..seed_nodes {
        for v in (u + 1)..seed_nodes {
            edges.push(edge(u, v));
            degrees[u] += 1;
            degrees[v] += 1;
        }
    }
    let mut total_degree: usize = degrees.iter().sum();
    for new_node in seed_nodes..node_count {
        let mut targets = Vec::with_capacity(m);
        while targets.len() < m {
            let pick = rng.gen_range(0..total_degree);
            let mut cumulative = 0usize;
            for (candidate, degree) in degrees.iter().enumerate().take(new_node) {
                cumulative += degree;
                if pick < cumulative {
                    if !targets.contains(&candidate) {
                        targets.push(candidate);
                    }
                    break;
                }
            }
        }
        for target in targets {
            edges.push(edge(new_node, target));
            degrees[target] += 1;
            degrees[new_node] += 1;
            total_degree += 2;
        }
    }
    edges
}

fn edge(from: usize, to: usize) -> (u32, u32) {
    (from as u32, to as u32)
}
