use std::fmt::Display;

use indexmap::{IndexMap, IndexSet};

use super::DecayTopology;

/// One term of the Bose symmetrization: final-state particle `i` takes the momentum of
/// particle `fs_part_perm_map[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoseSymTerm {
    /// Normalization of the term.
    pub factor: f64,
    /// The permutation of final-state indices.
    pub fs_part_perm_map: Vec<usize>,
}

impl BoseSymTerm {
    /// Whether this term is the identity permutation.
    pub fn is_identity(&self) -> bool {
        is_identity(&self.fs_part_perm_map)
    }
}

fn is_identity(permutation: &[usize]) -> bool {
    permutation
        .iter()
        .enumerate()
        .all(|(index, &target)| index == target)
}

/// All orderings of `items`, in lexicographic order of positions (so the input order comes
/// first).
fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for (position, &first) in items.iter().enumerate() {
        let mut rest = items.to_vec();
        rest.remove(position);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            result.push(tail);
        }
    }
    result
}

impl DecayTopology {
    /// Groups of final-state indices sharing a particle name, in order of first appearance.
    pub fn identical_fs_particle_groups(&self) -> Vec<Vec<usize>> {
        let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (index, particle) in self.fs_particles().enumerate() {
            groups.entry(particle.name.as_str()).or_default().push(index);
        }
        groups.into_values().collect()
    }

    /// The isobar assignment produced by `permutation`: for every decay vertex, the parent name
    /// and the (sorted) set of permuted final-state indices below it.
    fn isobar_assignment(&self, permutation: &[usize]) -> Vec<(String, Vec<usize>)> {
        let mut assignment: Vec<(String, Vec<usize>)> = self
            .isobar_decay_vertices()
            .iter()
            .map(|vertex| {
                let mut indices: Vec<usize> = self
                    .fs_part_indices_below(vertex.parent)
                    .iter()
                    .map(|&index| permutation[index])
                    .collect();
                indices.sort_unstable();
                (self.particle(vertex.parent).name.clone(), indices)
            })
            .collect();
        assignment.sort();
        assignment
    }

    /// The terms needed to symmetrize the decay amplitude under exchange of identical
    /// final-state particles.
    ///
    /// Candidates are all combinations of permutations within groups of identical particles.
    /// A candidate which leads to the same isobar assignment as an already accepted term
    /// describes the same decay tree and is dropped. The identity is always the first term and
    /// every term carries the factor $`1/\sqrt{n}`$.
    pub fn bose_symmetrization(&self) -> Vec<BoseSymTerm> {
        let n_fs = self.n_fs_particles();
        let group_permutations: Vec<(Vec<usize>, Vec<Vec<usize>>)> = self
            .identical_fs_particle_groups()
            .into_iter()
            .map(|group| {
                let orderings = permutations(&group);
                (group, orderings)
            })
            .collect();
        let mut choice = vec![0; group_permutations.len()];
        let mut assignments = IndexSet::new();
        let mut maps = Vec::new();
        loop {
            let mut permutation: Vec<usize> = (0..n_fs).collect();
            for ((group, orderings), &selected) in group_permutations.iter().zip(&choice) {
                for (&index, &target) in group.iter().zip(&orderings[selected]) {
                    permutation[index] = target;
                }
            }
            if assignments.insert(self.isobar_assignment(&permutation)) {
                maps.push(permutation);
            }
            // advance the mixed-radix counter over all groups
            let mut digit = 0;
            loop {
                if digit == choice.len() {
                    let factor = 1.0 / (maps.len() as f64).sqrt();
                    return maps
                        .into_iter()
                        .map(|fs_part_perm_map| BoseSymTerm {
                            factor,
                            fs_part_perm_map,
                        })
                        .collect();
                }
                choice[digit] += 1;
                if choice[digit] < group_permutations[digit].1.len() {
                    break;
                }
                choice[digit] = 0;
                digit += 1;
            }
        }
    }
}

/// Whether a permutation changes a decay vertex: the parent mass and the daughter angles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AffectedStatus {
    /// The parent's invariant mass differs from the unpermuted event.
    pub mass: bool,
    /// The daughters' angles differ from the unpermuted event.
    pub angles: bool,
}

impl AffectedStatus {
    /// Both observables are affected.
    pub const ALL: Self = Self {
        mass: true,
        angles: true,
    };
}

impl From<(bool, bool)> for AffectedStatus {
    fn from((mass, angles): (bool, bool)) -> Self {
        Self { mass, angles }
    }
}

/// For every Bose-symmetrization term, which observables of which decay vertex it changes.
///
/// The identity term affects everything, so each event fills every histogram once, and every
/// further term only fills histograms whose values it actually changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PermutationTable {
    entries: IndexMap<Vec<usize>, Vec<AffectedStatus>>,
}

impl PermutationTable {
    /// Build the table for all Bose-symmetrization terms of `topology`.
    pub fn new(topology: &DecayTopology) -> Self {
        Self::from_terms(topology, &topology.bose_symmetrization())
    }

    /// Build the table for the given terms.
    pub fn from_terms(topology: &DecayTopology, terms: &[BoseSymTerm]) -> Self {
        let entries = terms
            .iter()
            .map(|term| {
                let permutation = &term.fs_part_perm_map;
                let status = if term.is_identity() {
                    vec![AffectedStatus::ALL; topology.n_decay_vertices()]
                } else {
                    (0..topology.n_decay_vertices())
                        .map(|vertex| AffectedStatus {
                            mass: topology.isobar_is_affected_by_permutation(vertex, permutation),
                            angles: topology
                                .daughters_are_affected_by_permutation(vertex, permutation),
                        })
                        .collect()
                };
                (permutation.clone(), status)
            })
            .collect();
        Self { entries }
    }

    /// The number of permutations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The per-vertex status of a permutation.
    pub fn get(&self, permutation: &[usize]) -> Option<&[AffectedStatus]> {
        self.entries.get(permutation).map(Vec::as_slice)
    }

    /// Iterate over permutations and their per-vertex status, identity first.
    pub fn iter(&self) -> impl Iterator<Item = (&[usize], &[AffectedStatus])> {
        self.entries
            .iter()
            .map(|(permutation, status)| (permutation.as_slice(), status.as_slice()))
    }
}

impl Display for PermutationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, (permutation, status)) in self.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let flags: Vec<String> = status
                .iter()
                .map(|status| format!("({}, {})", status.mass, status.angles))
                .collect();
            write!(f, "{permutation:?}: {}", flags.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        particles::ParticleDataTable,
        topology::{tests::three_pi, tests::TABLE, DecayTemplate},
    };

    fn build(template: &str) -> DecayTopology {
        let table = ParticleDataTable::parse(TABLE);
        let template: DecayTemplate = serde_yaml_ng::from_str(template).unwrap();
        DecayTopology::from_template(&template, &table).unwrap()
    }

    #[test]
    fn test_permutations() {
        assert_eq!(permutations(&[4]), vec![vec![4]]);
        assert_eq!(
            permutations(&[1, 2, 3]),
            vec![
                vec![1, 2, 3],
                vec![1, 3, 2],
                vec![2, 1, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![3, 2, 1]
            ]
        );
        assert!(is_identity(&[0, 1, 2]));
        assert!(!is_identity(&[0, 2, 1]));
    }

    #[test]
    fn test_three_pi_terms() {
        let topology = three_pi();
        assert_eq!(topology.identical_fs_particle_groups(), vec![vec![0], vec![1, 2]]);
        let terms = topology.bose_symmetrization();
        assert_eq!(terms.len(), 2);
        assert!(terms[0].is_identity());
        assert_eq!(terms[1].fs_part_perm_map, vec![0, 2, 1]);
        for term in &terms {
            assert_relative_eq!(term.factor, 1.0 / 2.0_f64.sqrt());
        }
    }

    #[test]
    fn test_identical_daughters_collapse() {
        let topology = build(
            "\
productionVertex: {beam: pi-}
decay:
  name: X
  daughters:
    - name: f0(980)
      daughters: [{name: pi0}, {name: pi0}]
    - name: pi-
",
        );
        let terms = topology.bose_symmetrization();
        assert_eq!(terms.len(), 1);
        assert!(terms[0].is_identity());
        assert_relative_eq!(terms[0].factor, 1.0);
    }

    #[test]
    fn test_two_identical_isobars() {
        // X -> rho0 rho0, each rho0 -> pi+ pi-: swapping both pi+ and both pi- swaps the rho0s
        let topology = build(
            "\
productionVertex: {beam: pi-}
decay:
  name: X
  daughters:
    - name: rho0
      daughters: [{name: pi+}, {name: pi-}]
    - name: rho0
      daughters: [{name: pi+}, {name: pi-}]
",
        );
        assert_eq!(topology.identical_fs_particle_groups(), vec![vec![0, 2], vec![1, 3]]);
        let terms = topology.bose_symmetrization();
        let maps: Vec<Vec<usize>> = terms.into_iter().map(|t| t.fs_part_perm_map).collect();
        assert_eq!(maps, vec![vec![0, 1, 2, 3], vec![2, 1, 0, 3]]);
    }

    #[test]
    fn test_permutation_table() {
        let topology = three_pi();
        let table = PermutationTable::new(&topology);
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert_eq!(table.get(&[0, 1, 2]).unwrap(), &[AffectedStatus::ALL; 2]);
        assert_eq!(
            table.get(&[0, 2, 1]).unwrap(),
            &[AffectedStatus::from((false, true)), AffectedStatus::ALL]
        );
        assert!(table.get(&[1, 0, 2]).is_none());
        let order: Vec<&[usize]> = table.iter().map(|(permutation, _)| permutation).collect();
        assert_eq!(order, vec![&[0, 1, 2][..], &[0, 2, 1][..]]);
        assert_eq!(
            table.to_string(),
            "[0, 1, 2]: (true, true), (true, true)\n[0, 2, 1]: (false, true), (true, true)"
        );
    }

    #[test]
    fn test_non_identity_matches_queries() {
        let topology = build(
            "\
productionVertex: {beam: pi-}
decay:
  name: X
  daughters:
    - name: rho0
      daughters:
        - name: pi+
        - name: rho0
          daughters: [{name: pi+}, {name: pi-}]
    - name: pi-
",
        );
        let table = PermutationTable::new(&topology);
        assert!(table.len() > 1);
        for (permutation, status) in table.iter().skip(1) {
            for (vertex, status) in status.iter().enumerate() {
                assert_eq!(
                    status.mass,
                    topology.isobar_is_affected_by_permutation(vertex, permutation)
                );
                assert_eq!(
                    status.angles,
                    topology.daughters_are_affected_by_permutation(vertex, permutation)
                );
            }
        }
    }
}
