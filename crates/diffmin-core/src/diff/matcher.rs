//! Node matching between two low-level trees.
//!
//! Matching runs top-down from the paired synthetic roots:
//! - **Anchors**: identical subtrees (same structural hash) are aligned by
//!   longest common subsequence over each ordered child list.
//! - **Ordered gaps**: between two anchors, Yang's weighted LCS pairs the
//!   most similar remaining children; same-kind leftovers in the gap are then
//!   paired positionally, which is what turns an edited literal into an
//!   update instead of a delete and an insert.
//! - **Unordered children** (modifier lists, thrown types): maximum weight
//!   bipartite assignment (Hungarian algorithm).
//! - **Move recovery**: once the top-down pass is done, identical unmatched
//!   subtrees anywhere in the two trees are paired.

use std::collections::{HashMap, VecDeque};

use crate::config::MatchSettings;

use super::lowlevel::{ListOrdering, LowId, LowTree};

/// A bidirectional partial matching between two low-level trees.
#[derive(Debug, Default, Clone)]
pub struct Matching {
    src_to_dst: HashMap<LowId, LowId>,
    dst_to_src: HashMap<LowId, LowId>,
    pairs: Vec<(LowId, LowId)>,
}

impl Matching {
    fn add(&mut self, src: LowId, dst: LowId) -> bool {
        if self.src_to_dst.contains_key(&src) || self.dst_to_src.contains_key(&dst) {
            return false;
        }
        self.src_to_dst.insert(src, dst);
        self.dst_to_src.insert(dst, src);
        self.pairs.push((src, dst));
        true
    }

    pub fn dst_of(&self, src: LowId) -> Option<LowId> {
        self.src_to_dst.get(&src).copied()
    }

    pub fn src_of(&self, dst: LowId) -> Option<LowId> {
        self.dst_to_src.get(&dst).copied()
    }

    /// Matched pairs in the order they were found.
    pub fn pairs(&self) -> &[(LowId, LowId)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Match `src` against `dst`. The synthetic roots are always paired.
pub fn match_trees(src: &LowTree, dst: &LowTree, settings: &MatchSettings) -> Matching {
    let mut matching = Matching::default();
    matching.add(src.root(), dst.root());

    let mut queue = VecDeque::from([(src.root(), dst.root())]);
    while let Some((s, d)) = queue.pop_front() {
        let child_pairs = match src.node(s).ordering {
            ListOrdering::Ordered => ordered_match(src, dst, src.children(s), dst.children(d)),
            ListOrdering::Unordered => bipartite_match(src, dst, src.children(s), dst.children(d)),
        };
        for (cs, cd) in child_pairs {
            if matching.add(cs, cd) {
                queue.push_back((cs, cd));
            }
        }
    }
    let top_down = matching.len();

    recover_moves(src, dst, settings.min_move_size, &mut matching);
    tracing::debug!(
        top_down,
        moved = matching.len() - top_down,
        "matched low-level trees"
    );
    matching
}

/// Anchors by structural identity, then similarity matching inside each gap.
fn ordered_match(
    src: &LowTree,
    dst: &LowTree,
    left: &[LowId],
    right: &[LowId],
) -> Vec<(LowId, LowId)> {
    let anchors = lcs_pairs(left, right, |&l, &r| {
        src.node(l).kind == dst.node(r).kind && src.structural_hash(l) == dst.structural_hash(r)
    });

    let mut pairs = Vec::new();
    let (mut li, mut ri) = (0, 0);
    for &(la, ra) in anchors.iter().chain(std::iter::once(&(left.len(), right.len()))) {
        let gap_left = &left[li..la];
        let gap_right = &right[ri..ra];
        let mut gap = yang_match(src, dst, gap_left, gap_right);
        pair_leftovers(src, dst, gap_left, gap_right, &mut gap);
        gap.sort_unstable();
        pairs.extend(gap.into_iter().map(|(l, r)| (gap_left[l], gap_right[r])));
        if la < left.len() {
            pairs.push((left[la], right[ra]));
        }
        li = la + 1;
        ri = ra + 1;
    }
    pairs
}

/// Pair same-kind children that similarity matching left behind, keeping the
/// pairing order-preserving with respect to the pairs already found.
fn pair_leftovers(
    src: &LowTree,
    dst: &LowTree,
    left: &[LowId],
    right: &[LowId],
    gap: &mut Vec<(usize, usize)>,
) {
    let mut taken_left = vec![false; left.len()];
    let mut taken_right = vec![false; right.len()];
    for &(l, r) in gap.iter() {
        taken_left[l] = true;
        taken_right[r] = true;
    }
    for (l, &left_id) in left.iter().enumerate() {
        if taken_left[l] {
            continue;
        }
        // Stay between the neighbouring pairs so the result remains monotone.
        let lower = gap.iter().filter(|&&(pl, _)| pl < l).map(|&(_, pr)| pr + 1).max().unwrap_or(0);
        let upper = gap.iter().filter(|&&(pl, _)| pl > l).map(|&(_, pr)| pr).min().unwrap_or(right.len());
        let candidate = (lower..upper)
            .find(|&r| !taken_right[r] && can_match(src, dst, left_id, right[r]));
        if let Some(r) = candidate {
            taken_right[r] = true;
            gap.push((l, r));
        }
    }
}

/// Yang's algorithm: weighted LCS where matching two nodes scores their
/// subtree similarity. Returns index pairs into `left` and `right`.
fn yang_match(
    src: &LowTree,
    dst: &LowTree,
    left: &[LowId],
    right: &[LowId],
) -> Vec<(usize, usize)> {
    let n = left.len();
    let m = right.len();
    if n == 0 || m == 0 {
        return Vec::new();
    }

    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    let mut choice = vec![vec![0u8; m + 1]; n + 1]; // 1=match, 2=skip-left, 3=skip-right

    for i in 1..=n {
        for j in 1..=m {
            let similarity = tree_similarity(src, dst, left[i - 1], right[j - 1]);
            let match_score = if similarity > 0 {
                dp[i - 1][j - 1] + similarity
            } else {
                0
            };
            let skip_left = dp[i - 1][j];
            let skip_right = dp[i][j - 1];

            if match_score >= skip_left && match_score >= skip_right && match_score > 0 {
                dp[i][j] = match_score;
                choice[i][j] = 1;
            } else if skip_left >= skip_right {
                dp[i][j] = skip_left;
                choice[i][j] = 2;
            } else {
                dp[i][j] = skip_right;
                choice[i][j] = 3;
            }
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        match choice[i][j] {
            1 => {
                pairs.push((i - 1, j - 1));
                i -= 1;
                j -= 1;
            }
            2 => i -= 1,
            3 => j -= 1,
            _ => break,
        }
    }
    pairs.reverse();
    pairs
}

/// Maximum weight matching for children whose order carries no meaning.
fn bipartite_match(
    src: &LowTree,
    dst: &LowTree,
    left: &[LowId],
    right: &[LowId],
) -> Vec<(LowId, LowId)> {
    let n = left.len();
    let m = right.len();
    if n == 0 || m == 0 {
        return Vec::new();
    }

    let size = n.max(m);
    let mut weights = vec![vec![0i64; size]; size];
    for (i, &l) in left.iter().enumerate() {
        for (j, &r) in right.iter().enumerate() {
            weights[i][j] = tree_similarity(src, dst, l, r) as i64;
        }
    }

    let assignment = hungarian_max(&weights, size);
    assignment
        .iter()
        .enumerate()
        .filter(|&(i, &j)| i < n && j < m && weights[i][j] > 0)
        .map(|(i, &j)| (left[i], right[j]))
        .collect()
}

/// Terminal can't match non-terminal, and kinds must be identical.
fn can_match(src: &LowTree, dst: &LowTree, l: LowId, r: LowId) -> bool {
    src.is_terminal(l) == dst.is_terminal(r) && src.node(l).kind == dst.node(r).kind
}

/// Number of leaves the two subtrees have in common, in order.
pub fn tree_similarity(src: &LowTree, dst: &LowTree, l: LowId, r: LowId) -> usize {
    if !can_match(src, dst, l, r) {
        return 0;
    }
    if src.is_terminal(l) {
        return usize::from(src.node(l).label == dst.node(r).label);
    }
    if src.structural_hash(l) == dst.structural_hash(r) {
        return src.leaf_labels(l).len();
    }
    lcs_length(&src.leaf_labels(l), &dst.leaf_labels(r))
}

/// Length of the longest common subsequence of two sequences.
fn lcs_length<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let n = a.len();
    let m = b.len();
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[n][m]
}

/// Index pairs of one longest common subsequence under `eq`.
pub(crate) fn lcs_pairs<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> Vec<(usize, usize)> {
    let n = a.len();
    let m = b.len();
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if eq(&a[i], &b[j]) {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if eq(&a[i], &b[j]) {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

/// Hungarian algorithm for maximum weight matching on a square matrix.
fn hungarian_max(weights: &[Vec<i64>], n: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }

    // Cost minimization: subtract each weight from the largest one.
    let max_w = weights
        .iter()
        .flat_map(|row| row.iter())
        .copied()
        .max()
        .unwrap_or(0);

    let mut cost = vec![vec![0i64; n]; n];
    for i in 0..n {
        for j in 0..n {
            cost[i][j] = max_w - weights[i][j];
        }
    }

    // Kuhn-Munkres with row potentials `u` and column potentials `v`.
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    let mut p = vec![0usize; n + 1]; // p[j] = row assigned to col j
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![i64::MAX; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = i64::MAX;
            let mut j1 = 0usize;

            for j in 1..=n {
                if !used[j] {
                    let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the root.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    // result[i] = column assigned to row i
    let mut result = vec![0usize; n];
    for j in 1..=n {
        if p[j] > 0 {
            result[p[j] - 1] = j - 1;
        }
    }
    result
}

/// Pair identical subtrees that the top-down pass left entirely unmatched.
fn recover_moves(src: &LowTree, dst: &LowTree, min_size: usize, matching: &mut Matching) {
    let untouched = |tree: &LowTree, id: LowId, matched: &HashMap<LowId, LowId>| {
        tree.preorder(id).iter().all(|n| !matched.contains_key(n))
    };

    let mut candidates: HashMap<u64, Vec<LowId>> = HashMap::new();
    for s in src.preorder(src.root()) {
        if src.size(s) >= min_size && untouched(src, s, &matching.src_to_dst) {
            candidates.entry(src.structural_hash(s)).or_default().push(s);
        }
    }
    if candidates.is_empty() {
        return;
    }

    for d in dst.preorder(dst.root()) {
        if dst.size(d) < min_size || !untouched(dst, d, &matching.dst_to_src) {
            continue;
        }
        let Some(pool) = candidates.get(&dst.structural_hash(d)) else {
            continue;
        };
        let found = pool.iter().copied().find(|&s| {
            src.node(s).kind == dst.node(d).kind && untouched(src, s, &matching.src_to_dst)
        });
        if let Some(s) = found {
            for (ls, ld) in src.preorder(s).into_iter().zip(dst.preorder(d)) {
                matching.add(ls, ld);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    fn low(src: &str) -> LowTree {
        LowTree::project(&parse_source(src, Path::new("T.java")).unwrap())
    }

    fn find_all(tree: &LowTree, kind: &str) -> Vec<LowId> {
        tree.preorder(tree.root())
            .into_iter()
            .filter(|&n| tree.node(n).kind == kind)
            .collect()
    }

    #[test]
    fn test_identical_trees_fully_match() {
        let src = low("class C { void f() { g(1); } }");
        let dst = low("class C { void f() { g(1); } }");
        let matching = match_trees(&src, &dst, &MatchSettings::default());
        assert_eq!(matching.len(), src.len());
    }

    #[test]
    fn test_edited_literal_pairs_in_gap() {
        let src = low("class C { void f() { g(1); } }");
        let dst = low("class C { void f() { g(2); } }");
        let matching = match_trees(&src, &dst, &MatchSettings::default());
        let one = find_all(&src, "decimal_integer_literal")[0];
        let two = find_all(&dst, "decimal_integer_literal")[0];
        assert_eq!(matching.dst_of(one), Some(two));
        assert_eq!(matching.len(), src.len());
    }

    #[test]
    fn test_ordered_insert_keeps_neighbours() {
        let src = low("class C { void f() { a(); c(); } }");
        let dst = low("class C { void f() { a(); b(); c(); } }");
        let matching = match_trees(&src, &dst, &MatchSettings::default());
        let src_statements = find_all(&src, "expression_statement");
        let dst_statements = find_all(&dst, "expression_statement");
        assert_eq!(matching.dst_of(src_statements[0]), Some(dst_statements[0]));
        assert_eq!(matching.dst_of(src_statements[1]), Some(dst_statements[2]));
        assert_eq!(matching.src_of(dst_statements[1]), None);
    }

    #[test]
    fn test_unordered_modifiers() {
        let src = low("class C { public static int x; }");
        let dst = low("class C { static public int x; }");
        let matching = match_trees(&src, &dst, &MatchSettings::default());
        let modifiers = find_all(&src, "modifiers")[0];
        let first = src.children(modifiers)[0];
        let dst_modifiers = find_all(&dst, "modifiers")[0];
        assert_eq!(matching.dst_of(first), Some(dst.children(dst_modifiers)[1]));
    }

    #[test]
    fn test_moved_statement_is_recovered() {
        let src = low("class C { void f() { a(1); b(); c(); } }");
        let dst = low("class C { void f() { b(); c(); a(1); } }");
        let matching = match_trees(&src, &dst, &MatchSettings::default());
        let a = find_all(&src, "expression_statement")[0];
        let moved = find_all(&dst, "expression_statement")[2];
        assert_eq!(matching.dst_of(a), Some(moved));
    }

    #[test]
    fn test_hungarian_simple() {
        let weights = vec![vec![3, 1], vec![1, 3]];
        assert_eq!(hungarian_max(&weights, 2), vec![0, 1]);
        let crossed = vec![vec![0, 2], vec![2, 0]];
        assert_eq!(hungarian_max(&crossed, 2), vec![1, 0]);
    }

    #[test]
    fn test_lcs_pairs() {
        let pairs = lcs_pairs(&['a', 'b', 'c', 'd'], &['b', 'x', 'd'], |a, b| a == b);
        assert_eq!(pairs, vec![(1, 0), (3, 2)]);
        assert_eq!(lcs_length(&[1, 2, 3], &[3, 2, 1]), 1);
    }
}
