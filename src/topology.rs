use std::{collections::VecDeque, fmt::Display, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    particles::{ParticleDataTable, ParticleProperties},
    utils::{
        enums::Frame,
        list_to_name,
        transforms::LorentzTransform,
        vectors::{Vec3, Vec4},
    },
    AnglesError, AnglesResult,
};

/// Bose symmetrization of identical final-state particles.
pub mod symmetrization;

/// The production vertex of a decay template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductionTemplate {
    /// Name of the beam particle.
    pub beam: String,
    /// Name of the target particle (informational).
    #[serde(default)]
    pub target: Option<String>,
}

/// A node of the decay tree in a template. Nodes with daughters are isobars, nodes without are
/// final-state particles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecayNode {
    /// Particle name as listed in the particle data table.
    pub name: String,
    /// Relative orbital angular momentum of the daughters ($`\times 2`$).
    #[serde(rename = "L", default)]
    pub l: Option<i32>,
    /// Total spin of the daughters ($`\times 2`$).
    #[serde(rename = "S", default)]
    pub s: Option<i32>,
    /// The decay products.
    #[serde(default)]
    pub daughters: Vec<DecayNode>,
}

/// A decay template, read from YAML:
/// ```yaml
/// productionVertex: {beam: pi-, target: p+}
/// decay:
///   name: X
///   daughters:
///     - name: rho0
///       daughters: [{name: pi+}, {name: pi-}]
///     - name: pi-
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DecayTemplate {
    /// The production vertex.
    pub production_vertex: ProductionTemplate,
    /// The decay of the produced system $`X`$.
    pub decay: DecayNode,
}

impl DecayTemplate {
    /// Read a template from a YAML file.
    pub fn read_file<P: AsRef<Path>>(path: P) -> AnglesResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            AnglesError::topology(format!(
                "cannot read template file '{}' ({err})",
                path.display()
            ))
        })?;
        serde_yaml_ng::from_str(&text).map_err(|err| {
            AnglesError::topology(format!(
                "cannot parse template file '{}' ({err})",
                path.display()
            ))
        })
    }
}

/// The role a particle plays in a decay topology.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParticleKind {
    /// The beam particle of the production vertex.
    Beam,
    /// The produced system whose decay is analysed.
    X,
    /// An intermediate resonance.
    Isobar,
    /// A particle which is measured in the detector.
    FinalState,
}

/// A particle of a decay topology together with its current four-momentum.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Particle name.
    pub name: String,
    /// Table entry, if the particle is listed.
    pub properties: Option<ParticleProperties>,
    /// The particle's role.
    pub kind: ParticleKind,
    /// Current four-momentum.
    pub lz_vec: Vec4,
}

impl Particle {
    fn mass(&self) -> f64 {
        self.properties
            .as_ref()
            .map(|properties| properties.mass)
            .unwrap_or_default()
    }
}

/// A two-body decay `parent → daughters[0] daughters[1]`, given as particle indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsobarDecayVertex {
    /// Index of the decaying particle.
    pub parent: usize,
    /// Indices of the two decay products.
    pub daughters: [usize; 2],
    /// Orbital angular momentum of the daughters, if given in the template.
    pub l: Option<i32>,
    /// Total spin of the daughters, if given in the template.
    pub s: Option<i32>,
}

/// The production vertex: the beam particle (by particle index) and the optional target name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductionVertex {
    /// Index of the beam particle.
    pub beam: usize,
    /// Target name.
    pub target: Option<String>,
}

/// An isobar decay topology: a tree of two-body decays of the system $`X`$, produced by a beam.
///
/// Decay vertices are stored breadth-first starting with the decay of $`X`$, so every vertex
/// comes after all of its ancestors. Final-state particles are numbered depth-first from left
/// to right in template order; this numbering is what permutations act on.
#[derive(Clone, Debug)]
pub struct DecayTopology {
    particles: Vec<Particle>,
    production: ProductionVertex,
    x: usize,
    vertices: Vec<IsobarDecayVertex>,
    decay_vertex_of: Vec<Option<usize>>,
    fs_particles: Vec<usize>,
    fs_below: Vec<Vec<usize>>,
    fs_data_slots: Option<Vec<usize>>,
    beam_data: Vec3,
    fs_data: Vec<Vec3>,
}

impl DecayTopology {
    /// Read a template file and construct its topology.
    ///
    /// Every failure, including a missing or malformed template, is a
    /// [`AnglesError::TopologyError`].
    pub fn from_template_file<P: AsRef<Path>>(
        path: P,
        table: &ParticleDataTable,
    ) -> AnglesResult<Self> {
        Self::from_template(&DecayTemplate::read_file(path)?, table)
    }

    /// Construct the topology described by `template`.
    pub fn from_template(
        template: &DecayTemplate,
        table: &ParticleDataTable,
    ) -> AnglesResult<Self> {
        let beam_name = &template.production_vertex.beam;
        let beam_properties = table.entry(beam_name).cloned().ok_or_else(|| {
            AnglesError::topology(format!(
                "beam particle '{beam_name}' is not in the particle data table"
            ))
        })?;
        if template.decay.daughters.is_empty() {
            return Err(AnglesError::topology(format!(
                "'{}' has no decay",
                template.decay.name
            )));
        }
        let mut particles = vec![
            Particle {
                name: beam_name.clone(),
                properties: Some(beam_properties),
                kind: ParticleKind::Beam,
                lz_vec: Vec4::default(),
            },
            Particle {
                name: template.decay.name.clone(),
                properties: table.entry(&template.decay.name).cloned(),
                kind: ParticleKind::X,
                lz_vec: Vec4::default(),
            },
        ];
        let x = 1;
        let mut vertices = Vec::new();
        let mut queue: VecDeque<(&DecayNode, usize)> = VecDeque::from([(&template.decay, x)]);
        while let Some((node, parent)) = queue.pop_front() {
            if node.daughters.len() != 2 {
                return Err(AnglesError::topology(format!(
                    "'{}' decays into {} particles ({}), but isobar decays must be two-body",
                    node.name,
                    node.daughters.len(),
                    list_to_name(
                        &node
                            .daughters
                            .iter()
                            .map(|daughter| daughter.name.as_str())
                            .collect::<Vec<_>>()
                    )
                )));
            }
            let mut daughters = [0; 2];
            for (slot, daughter) in daughters.iter_mut().zip(&node.daughters) {
                let properties = table.entry(&daughter.name).cloned();
                let kind = if daughter.daughters.is_empty() {
                    if properties.is_none() {
                        return Err(AnglesError::topology(format!(
                            "final-state particle '{}' is not in the particle data table",
                            daughter.name
                        )));
                    }
                    ParticleKind::FinalState
                } else {
                    ParticleKind::Isobar
                };
                *slot = particles.len();
                particles.push(Particle {
                    name: daughter.name.clone(),
                    properties,
                    kind,
                    lz_vec: Vec4::default(),
                });
                if kind == ParticleKind::Isobar {
                    queue.push_back((daughter, *slot));
                }
            }
            vertices.push(IsobarDecayVertex {
                parent,
                daughters,
                l: node.l,
                s: node.s,
            });
        }

        let mut decay_vertex_of = vec![None; particles.len()];
        for (index, vertex) in vertices.iter().enumerate() {
            decay_vertex_of[vertex.parent] = Some(index);
        }
        let mut topology = Self {
            particles,
            production: ProductionVertex {
                beam: 0,
                target: template.production_vertex.target.clone(),
            },
            x,
            vertices,
            decay_vertex_of,
            fs_particles: Vec::new(),
            fs_below: Vec::new(),
            fs_data_slots: None,
            beam_data: Vec3::default(),
            fs_data: Vec::new(),
        };
        let mut fs_particles = Vec::new();
        topology.collect_fs_particles(x, &mut fs_particles);
        let mut fs_below = vec![Vec::new(); topology.particles.len()];
        for (fs_index, &particle) in fs_particles.iter().enumerate() {
            fs_below[particle].push(fs_index);
        }
        for vertex in topology.vertices.iter().rev() {
            let mut below: Vec<usize> = vertex
                .daughters
                .iter()
                .flat_map(|&daughter| fs_below[daughter].clone())
                .collect();
            below.sort_unstable();
            fs_below[vertex.parent] = below;
        }
        topology.fs_particles = fs_particles;
        topology.fs_below = fs_below;
        Ok(topology)
    }

    fn collect_fs_particles(&self, particle: usize, out: &mut Vec<usize>) {
        match self.decay_vertex_of[particle] {
            Some(vertex) => {
                for &daughter in &self.vertices[vertex].daughters {
                    self.collect_fs_particles(daughter, out);
                }
            }
            None => out.push(particle),
        }
    }

    /// All particles; the beam is particle 0 and $`X`$ particle 1.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The particle with the given index.
    pub fn particle(&self, index: usize) -> &Particle {
        &self.particles[index]
    }

    /// Intermediate particles (including $`X`$) which are not listed in the particle data table.
    pub fn unknown_isobars(&self) -> impl Iterator<Item = &Particle> {
        self.particles
            .iter()
            .filter(|particle| particle.properties.is_none())
    }

    /// The production vertex.
    pub fn production_vertex(&self) -> &ProductionVertex {
        &self.production
    }

    /// The beam particle.
    pub fn beam(&self) -> &Particle {
        &self.particles[self.production.beam]
    }

    /// The produced system $`X`$.
    pub fn x_particle(&self) -> &Particle {
        &self.particles[self.x]
    }

    /// The number of final-state particles.
    pub fn n_fs_particles(&self) -> usize {
        self.fs_particles.len()
    }

    /// Final-state particles in index order.
    pub fn fs_particles(&self) -> impl Iterator<Item = &Particle> {
        self.fs_particles.iter().map(|&index| &self.particles[index])
    }

    /// Names of the final-state particles in index order.
    pub fn fs_particle_names(&self) -> Vec<&str> {
        self.fs_particles().map(|particle| particle.name.as_str()).collect()
    }

    /// The number of isobar decay vertices.
    pub fn n_decay_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// All decay vertices, breadth-first; vertex 0 is the decay of $`X`$.
    pub fn isobar_decay_vertices(&self) -> &[IsobarDecayVertex] {
        &self.vertices
    }

    /// `vertex` followed by every vertex in the decay chain below it, breadth-first.
    pub fn sub_decay_vertices(&self, vertex: usize) -> Vec<usize> {
        let mut result = vec![vertex];
        let mut next = 0;
        while next < result.len() {
            for &daughter in &self.vertices[result[next]].daughters {
                if let Some(child) = self.decay_vertex_of[daughter] {
                    result.push(child);
                }
            }
            next += 1;
        }
        result
    }

    /// The frame in which the angles of the vertex's daughters are measured.
    pub fn vertex_frame(&self, vertex: usize) -> Frame {
        if vertex == 0 {
            Frame::GottfriedJackson
        } else {
            Frame::Helicity
        }
    }

    /// Sorted indices of the final-state particles produced by (or equal to) `particle`.
    pub fn fs_part_indices_below(&self, particle: usize) -> &[usize] {
        &self.fs_below[particle]
    }

    fn is_mapped_onto_itself(indices: &[usize], permutation: &[usize]) -> bool {
        let mut mapped: Vec<usize> = indices.iter().map(|&index| permutation[index]).collect();
        mapped.sort_unstable();
        mapped == indices
    }

    /// Whether the invariant mass of the vertex's parent changes under `permutation`, i.e. whether
    /// the set of final-state particles below the parent is not mapped onto itself.
    pub fn isobar_is_affected_by_permutation(&self, vertex: usize, permutation: &[usize]) -> bool {
        !Self::is_mapped_onto_itself(
            &self.fs_below[self.vertices[vertex].parent],
            permutation,
        )
    }

    /// Whether the daughters of the vertex change under `permutation`, i.e. whether for either
    /// daughter the set of final-state particles below it is not mapped onto itself.
    pub fn daughters_are_affected_by_permutation(
        &self,
        vertex: usize,
        permutation: &[usize],
    ) -> bool {
        self.vertices[vertex]
            .daughters
            .iter()
            .any(|&daughter| !Self::is_mapped_onto_itself(&self.fs_below[daughter], permutation))
    }

    /// Assign data slots to the beam and the final-state particles.
    ///
    /// The first production particle must be the beam. The decay names must contain every
    /// final-state particle exactly once; the k-th final-state particle called `N` is assigned
    /// the k-th data slot called `N`.
    pub fn init_kinematics_data<S: AsRef<str>>(
        &mut self,
        prod_names: &[S],
        decay_names: &[S],
    ) -> AnglesResult<()> {
        let beam_name = &self.beam().name;
        match prod_names.first() {
            Some(name) if name.as_ref() == beam_name => {}
            Some(name) => {
                return Err(AnglesError::Custom(format!(
                    "beam particle '{}' in data does not match '{beam_name}' in the topology",
                    name.as_ref()
                )))
            }
            None => {
                return Err(AnglesError::Custom(
                    "data contain no production particles".to_string(),
                ))
            }
        }
        if decay_names.len() != self.n_fs_particles() {
            return Err(AnglesError::LengthMismatch {
                context: format!(
                    "Decay particles in data ({})",
                    list_to_name(decay_names)
                ),
                expected: self.n_fs_particles(),
                actual: decay_names.len(),
            });
        }
        let mut used = vec![false; decay_names.len()];
        let mut slots = Vec::with_capacity(self.n_fs_particles());
        for particle in self.fs_particles() {
            let slot = decay_names
                .iter()
                .enumerate()
                .position(|(slot, name)| !used[slot] && name.as_ref() == particle.name)
                .ok_or_else(|| {
                    AnglesError::Custom(format!(
                        "final-state particles in data ({}) do not match the topology ({})",
                        list_to_name(decay_names),
                        list_to_name(&self.fs_particle_names())
                    ))
                })?;
            used[slot] = true;
            slots.push(slot);
        }
        self.fs_data_slots = Some(slots);
        Ok(())
    }

    /// Store the data momenta of one event. Requires [`DecayTopology::init_kinematics_data`].
    pub fn read_kinematics_data(
        &mut self,
        prod_momenta: &[Vec3],
        decay_momenta: &[Vec3],
    ) -> AnglesResult<()> {
        let slots = self.fs_data_slots.as_ref().ok_or_else(|| {
            AnglesError::Custom("kinematics data have not been initialized".to_string())
        })?;
        if decay_momenta.len() != slots.len() {
            return Err(AnglesError::LengthMismatch {
                context: "Decay momenta".to_string(),
                expected: slots.len(),
                actual: decay_momenta.len(),
            });
        }
        self.beam_data = *prod_momenta.first().ok_or_else(|| AnglesError::LengthMismatch {
            context: "Production momenta".to_string(),
            expected: 1,
            actual: 0,
        })?;
        self.fs_data = slots.iter().map(|&slot| decay_momenta[slot]).collect();
        let beam = self.production.beam;
        self.particles[beam].lz_vec = self.beam_data.with_mass(self.particles[beam].mass());
        Ok(())
    }

    /// Set the final-state four-momenta from the stored data, where final-state particle `i`
    /// takes the momentum read for particle `permutation[i]`.
    pub fn revert_momenta(&mut self, permutation: &[usize]) -> AnglesResult<()> {
        if permutation.len() != self.fs_data.len() {
            return Err(AnglesError::LengthMismatch {
                context: "Final-state permutation".to_string(),
                expected: self.fs_data.len(),
                actual: permutation.len(),
            });
        }
        let beam = self.production.beam;
        self.particles[beam].lz_vec = self.beam_data.with_mass(self.particles[beam].mass());
        for (fs_index, &source) in permutation.iter().enumerate() {
            let particle = &mut self.particles[self.fs_particles[fs_index]];
            particle.lz_vec = self.fs_data[source].with_mass(particle.mass());
        }
        Ok(())
    }

    /// Set every isobar's four-momentum (including $`X`$) to the sum of its daughters'.
    pub fn calc_isobar_lz_vecs(&mut self) {
        for vertex in self.vertices.iter().rev() {
            let [d1, d2] = vertex.daughters;
            self.particles[vertex.parent].lz_vec =
                self.particles[d1].lz_vec + self.particles[d2].lz_vec;
        }
    }

    /// Apply `transform` to both daughters of `vertex`.
    pub fn transform_out_particles(&mut self, vertex: usize, transform: &LorentzTransform) {
        for daughter in self.vertices[vertex].daughters {
            let lz_vec = transform.apply(&self.particles[daughter].lz_vec);
            self.particles[daughter].lz_vec = lz_vec;
        }
    }

    /// The current four-momentum of the vertex's parent.
    pub fn parent_lz_vec(&self, vertex: usize) -> Vec4 {
        self.particles[self.vertices[vertex].parent].lz_vec
    }

    /// The current four-momentum of the vertex's first daughter.
    pub fn daughter1_lz_vec(&self, vertex: usize) -> Vec4 {
        self.particles[self.vertices[vertex].daughters[0]].lz_vec
    }
}

impl Display for DecayTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "production vertex: beam {}", self.beam().name)?;
        if let Some(target) = &self.production.target {
            write!(f, ", target {target}")?;
        }
        writeln!(f)?;
        for (index, vertex) in self.vertices.iter().enumerate() {
            let [d1, d2] = vertex.daughters;
            write!(
                f,
                "decay vertex {index}: {} -> {} {} ({} frame)",
                self.particles[vertex.parent].name,
                self.particles[d1].name,
                self.particles[d2].name,
                self.vertex_frame(index)
            )?;
            if let (Some(l), Some(s)) = (vertex.l, vertex.s) {
                write!(f, " [L = {l}, S = {s}]")?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "final state: {}",
            list_to_name(&self.fs_particle_names())
        )
    }
}
