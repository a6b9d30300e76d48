/// Disjoint sets over `0..n`, tracking how many sets remain.
/// Uses path splitting in [`ComponentSet::find`] and union by rank.
#[derive(Debug, Clone)]
pub struct ComponentSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    count: usize,
}

impl ComponentSet {
    /// Creates `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            count: n,
        }
    }

    /// Representative of the set containing `u`.
    pub fn find(&mut self, u: usize) -> usize {
        let mut r = u;
        while self.parent[r] != r {
            self.parent[r] = self.parent[self.parent[r]];
            r = self.parent[r];
        }
        r
    }

    /// Merges the sets containing `x` and `y`. Returns `false` if they were
    /// already the same set.
    pub fn union(&mut self, x: usize, y: usize) -> bool {
        let u = self.find(x);
        let v = self.find(y);
        if u == v {
            return false;
        }

        let (low, high) = if self.rank[u] < self.rank[v] {
            (u, v)
        } else {
            (v, u)
        };
        self.parent[low] = high;
        if self.rank[low] == self.rank[high] {
            self.rank[high] += 1;
        }
        self.count -= 1;
        true
    }

    /// Number of disjoint sets.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}
