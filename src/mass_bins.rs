use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use indexmap::IndexMap;

use crate::{
    config::Config,
    data::io::EventFileFormat,
    diagnostics::Diagnostics,
    histograms::{HistogramDirectory, HistogramSettings},
    AnglesError, AnglesResult,
};

/// A `-b` argument: which of the (sorted) mass bins to process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MassBinSelection {
    /// Every mass bin.
    All,
    /// Mass bins `first..=last`, 1-based.
    Range(usize, usize),
}

impl FromStr for MassBinSelection {
    type Err = AnglesError;

    /// Parse `all`, `N` or `N-M` (1-based, inclusive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.trim();
        let invalid = |reason: &str| AnglesError::MissingMassBin {
            arg: s.to_string(),
            reason: reason.to_string(),
        };
        if arg.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let parse = |bound: &str| {
            bound
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid("expected 'all', 'N' or 'N-M'"))
        };
        let (first, last) = match arg.split_once('-') {
            Some((first, last)) => (parse(first)?, parse(last)?),
            None => {
                let bin = parse(arg)?;
                (bin, bin)
            }
        };
        if first == 0 {
            return Err(invalid("mass bins are counted from 1"));
        }
        if first > last {
            return Err(invalid("the first mass bin is after the last one"));
        }
        Ok(Self::Range(first, last))
    }
}

impl MassBinSelection {
    /// Select bins from `all_bins`.
    pub fn select<'a>(&self, all_bins: &'a [PathBuf], arg: &str) -> AnglesResult<&'a [PathBuf]> {
        let missing = |reason: String| AnglesError::MissingMassBin {
            arg: arg.to_string(),
            reason,
        };
        if all_bins.is_empty() {
            return Err(missing("no mass-bin directories found".to_string()));
        }
        match *self {
            Self::All => Ok(all_bins),
            Self::Range(first, last) if first == 0 || first > last => {
                Err(missing("invalid mass-bin range".to_string()))
            }
            Self::Range(first, last) if last <= all_bins.len() => Ok(&all_bins[first - 1..last]),
            Self::Range(_, last) => Err(missing(format!(
                "bin {last} requested, but there are only {} mass bins",
                all_bins.len()
            ))),
        }
    }
}

/// All mass-bin directories matching the configured pattern, sorted.
pub fn find_mass_bin_directories(config: &Config) -> AnglesResult<Vec<PathBuf>> {
    let mut bins: Vec<PathBuf> = glob::glob(&config.mass_bin_glob())?
        .filter_map(Result::ok)
        .filter(|path| path.is_dir())
        .collect();
    bins.sort();
    Ok(bins)
}

/// Resolve one `-b` argument to its mass-bin directories.
pub fn parse_mass_bin_arg<'a>(all_bins: &'a [PathBuf], arg: &str) -> AnglesResult<&'a [PathBuf]> {
    arg.parse::<MassBinSelection>()?.select(all_bins, arg)
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The name of a range of mass bins: `<first>_<last>` from the directory names.
pub fn range_name(bins: &[PathBuf]) -> String {
    match (bins.first(), bins.last()) {
        (Some(first), Some(last)) => format!("{}_{}", basename(first), basename(last)),
        _ => String::new(),
    }
}

/// Whether `path` names a data (rather than phase-space or acceptance) event file.
pub fn is_data_file(path: &Path, config: &Config) -> bool {
    if EventFileFormat::from_path(path).is_none() {
        return false;
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    [
        &config.phase_space_event_file_extension_quantifier,
        &config.acc_corr_ps_event_file_extension_quantifier,
    ]
    .iter()
    .all(|quantifier| !stem.ends_with(&format!(".{quantifier}")))
}

/// The data files in the given mass-bin directories, sorted per directory.
pub fn list_data_files(bins: &[PathBuf], config: &Config) -> AnglesResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for bin in bins {
        let mut bin_files = Vec::new();
        for entry in fs::read_dir(bin)? {
            let path = entry?.path();
            if path.is_file() && is_data_file(&path, config) {
                bin_files.push(path);
            }
        }
        bin_files.sort();
        files.extend(bin_files);
    }
    Ok(files)
}

/// A named range of mass bins with its input files and histograms.
#[derive(Clone, Debug, PartialEq)]
pub struct MassBinRange {
    /// The range name, see [`range_name`].
    pub name: String,
    /// The mass-bin directories of the range.
    pub mass_bins: Vec<PathBuf>,
    /// The data files of the range.
    pub files: Vec<PathBuf>,
    /// The histograms filled from the files.
    pub histograms: HistogramDirectory,
}

/// Resolve every `-b` argument to a [`MassBinRange`] with `n_vertices` booked histogram
/// triplets, in argument order.
///
/// A range whose name is already booked is skipped with a warning, as is a range without data
/// files (which is kept, but stays empty).
pub fn resolve_ranges<S: AsRef<str>>(
    config: &Config,
    args: &[S],
    n_vertices: usize,
    settings: &HistogramSettings,
    diagnostics: &mut Diagnostics,
) -> AnglesResult<IndexMap<String, MassBinRange>> {
    let all_bins = find_mass_bin_directories(config)?;
    diagnostics.debug(format!(
        "found {} mass bins matching '{}'",
        all_bins.len(),
        config.mass_bin_glob()
    ));
    let mut ranges = IndexMap::new();
    for arg in args {
        let arg = arg.as_ref();
        let bins = parse_mass_bin_arg(&all_bins, arg)?;
        let name = range_name(bins);
        if ranges.contains_key(&name) {
            diagnostics.warn(format!(
                "mass-bin argument '{arg}' selects range '{name}', which is already booked"
            ));
            continue;
        }
        let files = list_data_files(bins, config)?;
        if files.is_empty() {
            diagnostics.warn(format!("no data files found for range '{name}'"));
        }
        ranges.insert(
            name.clone(),
            MassBinRange {
                histograms: HistogramDirectory::new(name.clone(), n_vertices, settings),
                name,
                mass_bins: bins.to_vec(),
                files,
            },
        );
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::diagnostics::Level;

    fn bins(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|name| PathBuf::from("/data").join(name)).collect()
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!("all".parse::<MassBinSelection>().unwrap(), MassBinSelection::All);
        assert_eq!(
            "3".parse::<MassBinSelection>().unwrap(),
            MassBinSelection::Range(3, 3)
        );
        assert_eq!(
            "2-5".parse::<MassBinSelection>().unwrap(),
            MassBinSelection::Range(2, 5)
        );
        for arg in ["", "0", "0-2", "5-2", "x", "1-", "-3", "1.5"] {
            assert!(
                matches!(
                    arg.parse::<MassBinSelection>(),
                    Err(AnglesError::MissingMassBin { .. })
                ),
                "{arg}"
            );
        }
    }

    #[test]
    fn test_select_bins() {
        let all = bins(&["1000.1020", "1020.1040", "1040.1060", "1060.1080"]);
        assert_eq!(parse_mass_bin_arg(&all, "all").unwrap(), &all[..]);
        assert_eq!(parse_mass_bin_arg(&all, "2").unwrap(), &all[1..2]);
        assert_eq!(parse_mass_bin_arg(&all, "2-4").unwrap(), &all[1..4]);
        assert!(parse_mass_bin_arg(&all, "4-5").is_err());
        assert!(parse_mass_bin_arg(&[], "all").is_err());
        assert_eq!(
            range_name(parse_mass_bin_arg(&all, "2-4").unwrap()),
            "1020.1040_1060.1080"
        );
        assert_eq!(range_name(&all[..1]), "1000.1020_1000.1020");
        assert_eq!(range_name(&[]), "");
    }

    #[test]
    fn test_data_file_filter() {
        let config = Config::new("/data", "/pdg.txt");
        assert!(is_data_file(Path::new("/b/data.root"), &config));
        assert!(is_data_file(Path::new("/b/data.parquet"), &config));
        assert!(!is_data_file(Path::new("/b/data.genbod.root"), &config));
        assert!(!is_data_file(Path::new("/b/data.acc.parquet"), &config));
        assert!(!is_data_file(Path::new("/b/data.evt"), &config));
        assert!(is_data_file(Path::new("/b/genbod.root"), &config));
    }

    #[test]
    fn test_resolve_ranges() {
        let dir = env::temp_dir().join(format!("laddu_angles_bins_{}", fastrand::u64(..)));
        for (bin, files) in [
            ("1000.1100", vec!["b.root", "a.parquet", "ps.genbod.root", "notes.txt"]),
            ("1100.1200", vec!["a.parquet", "ps.acc.root"]),
            ("1200.1300", vec![]),
        ] {
            fs::create_dir_all(dir.join(bin)).unwrap();
            for file in files {
                fs::write(dir.join(bin).join(file), "").unwrap();
            }
        }
        fs::write(dir.join("stray.root"), "").unwrap();
        let config = Config::new(&dir, "/pdg.txt");
        assert_eq!(
            find_mass_bin_directories(&config).unwrap(),
            vec![dir.join("1000.1100"), dir.join("1100.1200"), dir.join("1200.1300")]
        );

        let mut diagnostics = Diagnostics::new();
        let ranges = resolve_ranges(
            &config,
            &["1-2", "3", "1-2", "all"],
            2,
            &HistogramSettings::default(),
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(
            ranges.keys().collect::<Vec<_>>(),
            vec!["1000.1100_1100.1200", "1200.1300_1200.1300", "1000.1100_1200.1300"]
        );
        let first = &ranges["1000.1100_1100.1200"];
        assert_eq!(
            first.files,
            vec![
                dir.join("1000.1100/a.parquet"),
                dir.join("1000.1100/b.root"),
                dir.join("1100.1200/a.parquet")
            ]
        );
        assert_eq!(first.mass_bins.len(), 2);
        assert_eq!(first.histograms.name(), "1000.1100_1100.1200");
        assert_eq!(first.histograms.vertices().len(), 2);
        assert!(ranges["1200.1300_1200.1300"].files.is_empty());
        // one duplicate range, one empty range
        assert_eq!(diagnostics.count(Level::Warning), 2);

        let mut diagnostics = Diagnostics::new();
        assert!(matches!(
            resolve_ranges(
                &config,
                &["7"],
                2,
                &HistogramSettings::default(),
                &mut diagnostics
            ),
            Err(AnglesError::MissingMassBin { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
