use crate::{
    config::Config,
    utils::{list_to_name, vectors::Vec3},
    AnglesError, AnglesResult,
};

/// Reading and writing event files (Parquet and ROOT).
pub mod io;

/// Particle names of the data slots of an event file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KinematicsNames {
    /// Names of the production particles; the first one is the beam.
    pub production: Vec<String>,
    /// Names of the decay (final-state) particles.
    pub decay: Vec<String>,
}

impl KinematicsNames {
    /// Create a new set of names.
    pub fn new<S: Into<String>, P: IntoIterator<Item = S>, D: IntoIterator<Item = S>>(
        production: P,
        decay: D,
    ) -> Self {
        Self {
            production: production.into_iter().map(Into::into).collect(),
            decay: decay.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a comma-separated list of names as stored in file metadata.
    pub fn parse_list(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Column layout and name sources used when reading event files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventReadOptions {
    /// Name of the event tree in ROOT files.
    pub tree: String,
    /// Column prefix of the production momenta.
    pub prod_momenta_leaf: String,
    /// Column prefix of the decay momenta.
    pub decay_momenta_leaf: String,
    /// Metadata key of the production particle names.
    pub prod_names_key: String,
    /// Metadata key of the decay particle names.
    pub decay_names_key: String,
    /// Production particle names used when a file carries none.
    pub prod_names: Option<Vec<String>>,
    /// Decay particle names used when a file carries none.
    pub decay_names: Option<Vec<String>>,
}

impl Default for EventReadOptions {
    fn default() -> Self {
        Self::from_config(&Config::new("", ""))
    }
}

impl EventReadOptions {
    /// Take the layout from the run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            tree: config.in_tree_name.clone(),
            prod_momenta_leaf: config.prod_kin_momenta_leaf_name.clone(),
            decay_momenta_leaf: config.decay_kin_momenta_leaf_name.clone(),
            prod_names_key: config.prod_kin_part_names_obj_name.clone(),
            decay_names_key: config.decay_kin_part_names_obj_name.clone(),
            prod_names: config.prod_kin_part_names.clone(),
            decay_names: config.decay_kin_part_names.clone(),
        }
    }

    /// The column name of momentum component `component` (`px`, `py` or `pz`) of data slot
    /// `slot` under the prefix `leaf`.
    pub fn column_name(leaf: &str, slot: usize, component: &str) -> String {
        format!("{leaf}_{slot}_{component}")
    }
}

/// The three momentum components of one data slot, one value per event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct P3Column {
    /// $`p_x`$ per event.
    pub px: Vec<f64>,
    /// $`p_y`$ per event.
    pub py: Vec<f64>,
    /// $`p_z`$ per event.
    pub pz: Vec<f64>,
}

impl P3Column {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            px: Vec::with_capacity(capacity),
            py: Vec::with_capacity(capacity),
            pz: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, p3: &Vec3) {
        self.px.push(p3.x);
        self.py.push(p3.y);
        self.pz.push(p3.z);
    }

    fn get(&self, event: usize) -> Vec3 {
        Vec3::new(self.px[event], self.py[event], self.pz[event])
    }

    fn len(&self) -> usize {
        self.px.len()
    }
}

/// The momenta of a single event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KinematicsEvent {
    /// Production momenta by data slot; slot 0 is the beam.
    pub production: Vec<Vec3>,
    /// Decay momenta by data slot.
    pub decay: Vec<Vec3>,
}

/// A column-oriented set of events with named production and decay slots.
#[derive(Clone, Debug, PartialEq)]
pub struct KinematicsDataset {
    names: KinematicsNames,
    production: Vec<P3Column>,
    decay: Vec<P3Column>,
    n_events: usize,
}

impl KinematicsDataset {
    /// Assemble a dataset from columns, checking that names and columns match.
    pub fn from_columns(
        names: KinematicsNames,
        production: Vec<P3Column>,
        decay: Vec<P3Column>,
    ) -> AnglesResult<Self> {
        if names.production.is_empty() {
            return Err(AnglesError::Custom(
                "Event data need at least one production particle".to_string(),
            ));
        }
        for (kind, names, columns) in [
            ("Production", &names.production, &production),
            ("Decay", &names.decay, &decay),
        ] {
            if names.len() != columns.len() {
                return Err(AnglesError::LengthMismatch {
                    context: format!("{kind} particle names ({})", list_to_name(names)),
                    expected: columns.len(),
                    actual: names.len(),
                });
            }
        }
        let n_events = production.first().map(P3Column::len).unwrap_or_default();
        for column in production.iter().chain(&decay) {
            for component in [&column.px, &column.py, &column.pz] {
                if component.len() != n_events {
                    return Err(AnglesError::LengthMismatch {
                        context: "Momentum columns".to_string(),
                        expected: n_events,
                        actual: component.len(),
                    });
                }
            }
        }
        Ok(Self {
            names,
            production,
            decay,
            n_events,
        })
    }

    /// Assemble a dataset from individual events.
    pub fn from_events(names: KinematicsNames, events: &[KinematicsEvent]) -> AnglesResult<Self> {
        let mut production = vec![P3Column::with_capacity(events.len()); names.production.len()];
        let mut decay = vec![P3Column::with_capacity(events.len()); names.decay.len()];
        for event in events {
            for (columns, momenta, kind) in [
                (&mut production, &event.production, "Production momenta"),
                (&mut decay, &event.decay, "Decay momenta"),
            ] {
                if momenta.len() != columns.len() {
                    return Err(AnglesError::LengthMismatch {
                        context: kind.to_string(),
                        expected: columns.len(),
                        actual: momenta.len(),
                    });
                }
                for (column, p3) in columns.iter_mut().zip(momenta) {
                    column.push(p3);
                }
            }
        }
        Self::from_columns(names, production, decay)
    }

    /// The particle names of the data slots.
    pub fn names(&self) -> &KinematicsNames {
        &self.names
    }

    /// The number of events.
    pub fn n_events(&self) -> usize {
        self.n_events
    }

    /// Whether there are no events.
    pub fn is_empty(&self) -> bool {
        self.n_events == 0
    }

    /// Production columns by slot.
    pub fn production_columns(&self) -> &[P3Column] {
        &self.production
    }

    /// Decay columns by slot.
    pub fn decay_columns(&self) -> &[P3Column] {
        &self.decay
    }

    /// The momenta of event `index`, or [`None`] if out of range.
    pub fn event(&self, index: usize) -> Option<KinematicsEvent> {
        (index < self.n_events).then(|| KinematicsEvent {
            production: self.production.iter().map(|c| c.get(index)).collect(),
            decay: self.decay.iter().map(|c| c.get(index)).collect(),
        })
    }

    /// Iterate over all events.
    pub fn events(&self) -> impl Iterator<Item = KinematicsEvent> + '_ {
        (0..self.n_events).filter_map(|index| self.event(index))
    }
}
