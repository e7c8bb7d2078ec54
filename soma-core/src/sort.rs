//! Sort/permutation utility for row labels

/// Stable sort of `labels`, returning the sorted labels and the permutation
///
/// `permutation[k]` is the original position of the `k`-th smallest label,
/// so `sorted[k] == labels[permutation[k]]`. Equal labels keep their
/// original relative order.
pub fn sort_and_permutation<S: AsRef<str>>(labels: &[S]) -> (Vec<&str>, Vec<usize>) {
    let mut permutation: Vec<usize> = (0..labels.len()).collect();
    permutation.sort_by(|&a, &b| labels[a].as_ref().cmp(labels[b].as_ref()));
    let sorted = permutation.iter().map(|&i| labels[i].as_ref()).collect();
    (sorted, permutation)
}

/// Inverse of a permutation: `inverse[permutation[k]] == k`
pub fn invert_permutation(permutation: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; permutation.len()];
    for (k, &p) in permutation.iter().enumerate() {
        inverse[p] = k;
    }
    inverse
}
