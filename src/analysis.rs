use std::{
    fmt::Display,
    io::IsTerminal,
    path::{Path, PathBuf},
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Config,
    data::{io::read_events, EventReadOptions},
    diagnostics::{Diagnostics, PrintingSummary},
    histograms::{
        io::{prepare_output, write_histograms},
        HistogramDirectory,
    },
    mass_bins::resolve_ranges,
    particles::ParticleDataTable,
    topology::{
        symmetrization::{AffectedStatus, PermutationTable},
        DecayTopology,
    },
    utils::transforms::{gj_transform, hf_transform},
    AnglesResult,
};

/// Inputs of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlotOptions {
    /// The histogram output file (`.root` or `.parquet`).
    pub output_file: PathBuf,
    /// The decay template.
    pub template_file: PathBuf,
    /// Mass-bin selections (`all`, `N` or `N-M`), one range each.
    pub mass_bins: Vec<String>,
    /// The configuration file.
    pub config_file: PathBuf,
    /// Whether to draw a progress bar per input file (only on a terminal).
    pub show_progress: bool,
}

impl PlotOptions {
    /// Options for all mass bins with the default configuration file `rootpwa.config`.
    pub fn new<O: Into<PathBuf>, T: Into<PathBuf>>(output_file: O, template_file: T) -> Self {
        Self {
            output_file: output_file.into(),
            template_file: template_file.into(),
            mass_bins: vec!["all".to_string()],
            config_file: PathBuf::from("rootpwa.config"),
            show_progress: true,
        }
    }

    /// Set the mass-bin selections; an empty list selects all bins.
    pub fn mass_bins<I, S>(mut self, mass_bins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mass_bins = mass_bins.into_iter().map(Into::into).collect();
        if self.mass_bins.is_empty() {
            self.mass_bins.push("all".to_string());
        }
        self
    }

    /// Set the configuration file.
    pub fn config_file<P: Into<PathBuf>>(mut self, config_file: P) -> Self {
        self.config_file = config_file.into();
        self
    }

    /// Enable or disable progress bars.
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// What a run did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Message counts.
    pub messages: PrintingSummary,
    /// The output file.
    pub output_file: PathBuf,
    /// Number of mass-bin ranges.
    pub ranges: usize,
    /// Number of input files read.
    pub files: usize,
    /// Number of events processed.
    pub events: u64,
    /// Number of Bose-symmetrization permutations evaluated per event.
    pub permutations: usize,
    /// Number of histogram entries (NaN values excluded).
    pub fills: u64,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "processed {} events from {} files in {} ranges ({} permutations per event, {} histogram entries) into '{}'",
            self.events,
            self.files,
            self.ranges,
            self.permutations,
            self.fills,
            self.output_file.display()
        )?;
        write!(f, "{}", self.messages)
    }
}

/// Bring every particle of the topology into the frame in which its angles are measured.
///
/// The isobar momenta are rebuilt from the final state, all daughters are moved into the
/// Gottfried-Jackson frame of $`X`$, and then each vertex below the first moves its whole
/// sub-decay into the helicity frame of its parent, top-down.
pub fn transform_to_decay_frames(topology: &mut DecayTopology) {
    topology.calc_isobar_lz_vecs();
    let gj = gj_transform(&topology.beam().lz_vec, &topology.x_particle().lz_vec);
    for vertex in 0..topology.n_decay_vertices() {
        topology.transform_out_particles(vertex, &gj);
    }
    for vertex in 1..topology.n_decay_vertices() {
        let hf = hf_transform(&topology.parent_lz_vec(vertex));
        for sub_vertex in topology.sub_decay_vertices(vertex) {
            topology.transform_out_particles(sub_vertex, &hf);
        }
    }
}

/// Fill the histograms of every vertex whose observables are affected, returning the number
/// of entries made.
pub fn fill_histograms(
    topology: &DecayTopology,
    status: &[AffectedStatus],
    histograms: &mut HistogramDirectory,
    diagnostics: &mut Diagnostics,
) -> u64 {
    let mut fills = 0;
    for (vertex, (status, hists)) in status
        .iter()
        .zip(histograms.vertices_mut().iter_mut())
        .enumerate()
    {
        if status.mass {
            let mass = topology.parent_lz_vec(vertex).m();
            match hists.mass.fill(mass) {
                Some(_) => fills += 1,
                None => diagnostics.debug(format!("skipping NaN mass at vertex {vertex}")),
            }
        }
        if status.angles {
            let daughter = topology.daughter1_lz_vec(vertex).vec3();
            for (histogram, value) in [
                (&mut hists.phi, daughter.phi()),
                (&mut hists.cos_theta, daughter.costheta()),
            ] {
                match histogram.fill(value) {
                    Some(_) => fills += 1,
                    None => diagnostics.debug(format!(
                        "skipping NaN value for '{}' at vertex {vertex}",
                        histogram.name()
                    )),
                }
            }
        }
    }
    fills
}

fn progress_bar(n_events: usize, file: &Path, show: bool) -> ProgressBar {
    if !show || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(n_events as u64);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} events {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar.set_message(
        file.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    bar
}

/// Run the full pipeline: read the configuration, particle table and template, resolve the
/// mass-bin ranges, histogram every event of every range under all Bose-symmetrization
/// permutations and write the histograms.
///
/// Nothing is written if any stage fails. Failing to build the topology yields an
/// [`AnglesError::TopologyError`](crate::AnglesError::TopologyError).
pub fn run(options: &PlotOptions, diagnostics: &mut Diagnostics) -> AnglesResult<RunSummary> {
    diagnostics.info(format!(
        "reading configuration from '{}'",
        options.config_file.display()
    ));
    let config = Config::read_file(&options.config_file)?;
    let table = ParticleDataTable::read_file(&config.pdg_file_name)?;
    for line in table.skipped_lines() {
        diagnostics.warn(format!(
            "could not parse line '{line}' of particle data table '{}', skipping it",
            config.pdg_file_name.display()
        ));
    }
    diagnostics.debug(format!(
        "read {} particles from '{}'",
        table.len(),
        config.pdg_file_name.display()
    ));

    let mut topology = DecayTopology::from_template_file(&options.template_file, &table)?;
    for isobar in topology.unknown_isobars() {
        diagnostics.debug(format!(
            "isobar '{}' is not in the particle data table",
            isobar.name
        ));
    }
    diagnostics.debug(format!("decay topology:\n{topology}"));

    let permutations = PermutationTable::new(&topology);
    diagnostics.info(format!(
        "{} Bose-symmetrization permutations of {} final-state particles",
        permutations.len(),
        topology.n_fs_particles()
    ));
    diagnostics.debug(format!("affected vertices per permutation:\n{permutations}"));

    let (output_file, format) = prepare_output(&options.output_file, &config.histograms)?;
    let mut ranges = resolve_ranges(
        &config,
        &options.mass_bins,
        topology.n_decay_vertices(),
        &config.histograms,
        diagnostics,
    )?;
    let read_options = EventReadOptions::from_config(&config);

    let mut summary = RunSummary {
        output_file: output_file.clone(),
        ranges: ranges.len(),
        permutations: permutations.len(),
        ..Default::default()
    };
    for range in ranges.values_mut() {
        diagnostics.info(format!("processing bin range {}", range.name));
        for file in &range.files {
            diagnostics.info(format!("opening input file '{}'", file.display()));
            let dataset = read_events(file, &read_options)?;
            topology.init_kinematics_data(&dataset.names().production, &dataset.names().decay)?;
            let bar = progress_bar(dataset.n_events(), file, options.show_progress);
            for event in dataset.events() {
                topology.read_kinematics_data(&event.production, &event.decay)?;
                for (permutation, status) in permutations.iter() {
                    topology.revert_momenta(permutation)?;
                    transform_to_decay_frames(&mut topology);
                    summary.fills +=
                        fill_histograms(&topology, status, &mut range.histograms, diagnostics);
                }
                summary.events += 1;
                bar.inc(1);
            }
            bar.finish_and_clear();
            summary.files += 1;
        }
    }

    write_histograms(
        &output_file,
        format,
        ranges.values().map(|range| &range.histograms),
    )?;
    diagnostics.success(format!(
        "wrote {} histogram directories to '{}'",
        ranges.len(),
        output_file.display()
    ));
    summary.messages = diagnostics.summary();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        histograms::HistogramSettings,
        topology::tests::three_pi,
        utils::vectors::{Vec3, Vec4},
    };

    fn prepared_topology() -> DecayTopology {
        let mut topology = three_pi();
        topology
            .init_kinematics_data(&["pi-"], &["pi+", "pi-", "pi-"])
            .unwrap();
        topology
            .read_kinematics_data(
                &[Vec3::new(0.0, 0.0, 190.0)],
                &[
                    Vec3::new(0.15, 0.22, 61.0),
                    Vec3::new(-0.31, 0.12, 72.0),
                    Vec3::new(0.21, -0.43, 54.0),
                ],
            )
            .unwrap();
        topology
    }

    #[test]
    fn test_plot_options() {
        let options = PlotOptions::new("out.root", "template.yaml");
        assert_eq!(options.mass_bins, vec!["all"]);
        assert_eq!(options.config_file, PathBuf::from("rootpwa.config"));
        let options = options
            .mass_bins(["1-3", "5"])
            .config_file("other.config")
            .show_progress(false);
        assert_eq!(options.mass_bins, vec!["1-3", "5"]);
        assert_eq!(options.config_file, PathBuf::from("other.config"));
        assert!(!options.show_progress);
        assert_eq!(
            options.mass_bins(Vec::<String>::new()).mass_bins,
            vec!["all"]
        );
    }

    #[test]
    fn test_decay_frames() {
        let mut topology = prepared_topology();
        topology.revert_momenta(&[0, 1, 2]).unwrap();
        transform_to_decay_frames(&mut topology);
        let vertices = topology.isobar_decay_vertices().to_vec();
        // X is left in the lab, its daughters are back to back in its rest frame
        let [rho, bachelor] = vertices[0].daughters.map(|d| topology.particle(d).lz_vec);
        assert_relative_eq!((rho.vec3() + bachelor.vec3()).mag(), 0.0, epsilon = 1e-9);
        // the rho0 daughters are back to back in the rho0 rest frame, with the rho0 itself at
        // rest along z
        let [pi_plus, pi_minus] = vertices[1].daughters.map(|d| topology.particle(d).lz_vec);
        assert_relative_eq!((pi_plus.vec3() + pi_minus.vec3()).mag(), 0.0, epsilon = 1e-9);
        let rho_rest: Vec4 = pi_plus + pi_minus;
        assert_relative_eq!(rho_rest.m(), rho.m(), epsilon = 1e-9);
    }

    #[test]
    fn test_fill_histograms() {
        let mut topology = prepared_topology();
        let table = PermutationTable::new(&topology);
        let mut histograms = HistogramDirectory::new("range", 2, &HistogramSettings::default());
        let mut diagnostics = Diagnostics::new();
        let mut fills = 0;
        for (permutation, status) in table.iter() {
            topology.revert_momenta(permutation).unwrap();
            transform_to_decay_frames(&mut topology);
            fills += fill_histograms(&topology, status, &mut histograms, &mut diagnostics);
        }
        // identity: 3 entries per vertex; swap: phi/theta at vertex 0, everything at vertex 1
        assert_eq!(fills, 6 + 2 + 3);
        let entries: Vec<u64> = histograms.histograms().map(|h| h.entries()).collect();
        assert_eq!(entries, vec![1, 2, 2, 2, 2, 2]);
        let m0 = histograms.get("m0").unwrap();
        let x_mass = topology.x_particle().lz_vec.m();
        assert_eq!(m0.axis().find_bin(x_mass).map(|bin| m0.content(bin)), Some(1.0));
    }

    #[test]
    fn test_missing_config_aborts() {
        let options = PlotOptions::new("out.parquet", "template.yaml")
            .config_file("/nonexistent/rootpwa.config");
        let mut diagnostics = Diagnostics::new();
        let err = run(&options, &mut diagnostics).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
