//! Average-linkage hierarchical clustering on correlation distance.

/// Correlation distance `1 - r` with `r` the Pearson correlation of `a` and `b`.
///
/// Not finite if one of the vectors has zero variance.
pub fn correlation_distance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    1.0 - cov / (var_a * var_b).sqrt()
}

/// One merge of two clusters.
///
/// Leaves are clusters `0..n`, the cluster created by the `i`-th merge is `n + i`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MergeStep {
    /// Smaller id of the merged clusters.
    pub left: usize,
    /// Larger id of the merged clusters.
    pub right: usize,
    /// Average distance between the merged clusters.
    pub distance: f64,
    /// Number of leaves in the new cluster.
    pub size: usize,
}

/// Agglomerate all points with average linkage.
///
/// `dist` is the full symmetric distance matrix.  Ties are resolved towards the
/// pair with the smallest ids.
pub fn average_linkage(dist: &[Vec<f64>]) -> Vec<MergeStep> {
    let n = dist.len();
    if n < 2 {
        return Vec::new();
    }

    // Working matrix over all cluster ids, including the ones created by merges.
    let mut work = vec![vec![0.0; 2 * n - 1]; 2 * n - 1];
    for (i, row) in dist.iter().enumerate() {
        work[i][..n].copy_from_slice(row);
    }
    let mut sizes = vec![1usize; n];
    let mut active: Vec<usize> = (0..n).collect();
    let mut result = Vec::with_capacity(n - 1);

    while active.len() > 1 {
        let mut best = (f64::INFINITY, 0, 0);
        for (ai, &a) in active.iter().enumerate() {
            for &b in &active[ai + 1..] {
                if work[a][b] < best.0 {
                    best = (work[a][b], a, b);
                }
            }
        }
        let (distance, a, b) = best;

        let id = n + result.len();
        let (size_a, size_b) = (sizes[a] as f64, sizes[b] as f64);
        active.retain(|&c| c != a && c != b);
        for &c in &active {
            let d = (work[a][c] * size_a + work[b][c] * size_b) / (size_a + size_b);
            work[id][c] = d;
            work[c][id] = d;
        }
        sizes.push(sizes[a] + sizes[b]);
        active.push(id);

        result.push(MergeStep {
            left: a.min(b),
            right: a.max(b),
            distance,
            size: sizes[id],
        });
    }

    result
}

/// Leaves of the dendrogram from left to right, the left child of each merge first.
pub fn leaf_order(merges: &[MergeStep], n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(n);
    let mut stack = vec![n - 1 + merges.len()];
    while let Some(id) = stack.pop() {
        if id < n {
            result.push(id);
        } else {
            let merge = &merges[id - n];
            stack.push(merge.right);
            stack.push(merge.left);
        }
    }
    result
}
