//! Histogram output: one ROOT tree or one block of Parquet rows per histogram directory.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use indexmap::IndexMap;
use oxyroot::{RootFile, WriterTree};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};

use super::{HistogramDirectory, HistogramSettings};
use crate::{config::expand_path, AnglesError, AnglesResult};

/// Name of the branch (ROOT) holding the storage index of each bin.
pub const BIN_BRANCH: &str = "bin";

/// Supported output containers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// A ROOT file with one TTree per directory.
    Root,
    /// A Parquet file in long format.
    Parquet,
}

impl OutputFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> AnglesResult<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("root") => Ok(Self::Root),
            Some("parquet") => Ok(Self::Parquet),
            _ => Err(AnglesError::Custom(format!(
                "Unsupported output file '{}': expected a '.root' or '.parquet' extension",
                path.display()
            ))),
        }
    }
}

/// Check up front that histograms with the given binning can be written to `path`.
///
/// Returns the expanded output path and its format. The ROOT layout stores all histograms of a
/// directory as branches of one tree, so it requires every axis to have the same number of bins.
pub fn prepare_output(
    path: &Path,
    settings: &HistogramSettings,
) -> AnglesResult<(PathBuf, OutputFormat)> {
    let path = expand_path(&path.to_string_lossy())?;
    let format = OutputFormat::from_path(&path)?;
    if format == OutputFormat::Root && !settings.uniform_bins() {
        return Err(AnglesError::Custom(format!(
            "ROOT output requires equal bin counts, found mass = {}, phi = {}, theta = {}",
            settings.mass.bins, settings.phi.bins, settings.cos_theta.bins
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(AnglesError::Custom(format!(
                "Output directory '{}' does not exist",
                parent.display()
            )));
        }
    }
    Ok((path, format))
}

/// Write every directory to `path` in the given format.
pub fn write_histograms<'a, I>(
    path: &Path,
    format: OutputFormat,
    directories: I,
) -> AnglesResult<()>
where
    I: IntoIterator<Item = &'a HistogramDirectory>,
{
    match format {
        OutputFormat::Root => write_root(path, directories),
        OutputFormat::Parquet => write_parquet(path, directories),
    }
}

/// Write one TTree per directory, named after the directory, with an `i32` branch
/// [`BIN_BRANCH`] and one `f64` branch per histogram holding its bin contents.
pub fn write_root<'a, I>(path: &Path, directories: I) -> AnglesResult<()>
where
    I: IntoIterator<Item = &'a HistogramDirectory>,
{
    let mut file = RootFile::create(path).map_err(|err| {
        AnglesError::RootError(format!(
            "Failed to create ROOT file '{}': {err}",
            path.display()
        ))
    })?;
    for directory in directories {
        let n_bins = directory
            .histograms()
            .map(|histogram| histogram.contents().len())
            .next()
            .unwrap_or_default();
        let mut tree = WriterTree::new(directory.name());
        tree.new_branch(BIN_BRANCH, (0..n_bins as i32).collect::<Vec<_>>().into_iter());
        for histogram in directory.histograms() {
            if histogram.contents().len() != n_bins {
                return Err(AnglesError::LengthMismatch {
                    context: format!("Histogram '{}/{}'", directory.name(), histogram.name()),
                    expected: n_bins,
                    actual: histogram.contents().len(),
                });
            }
            tree.new_branch(histogram.name(), histogram.contents().to_vec().into_iter());
        }
        tree.write(&mut file).map_err(|err| {
            AnglesError::RootError(format!(
                "Failed to write ROOT tree '{}' to '{}': {err}",
                directory.name(),
                path.display()
            ))
        })?;
    }
    file.close().map_err(|err| {
        AnglesError::RootError(format!(
            "Failed to close ROOT file '{}': {err}",
            path.display()
        ))
    })?;
    Ok(())
}

fn histogram_schema() -> Schema {
    Schema::new(vec![
        Field::new("range", DataType::Utf8, false),
        Field::new("histogram", DataType::Utf8, false),
        Field::new("bin", DataType::Int64, false),
        Field::new("low", DataType::Float64, false),
        Field::new("high", DataType::Float64, false),
        Field::new("content", DataType::Float64, false),
    ])
}

/// Write all bins of all histograms as rows `(range, histogram, bin, low, high, content)`,
/// one record batch per directory.
pub fn write_parquet<'a, I>(path: &Path, directories: I) -> AnglesResult<()>
where
    I: IntoIterator<Item = &'a HistogramDirectory>,
{
    let schema = Arc::new(histogram_schema());
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;
    for directory in directories {
        let mut ranges = Vec::new();
        let mut names = Vec::new();
        let mut bins = Vec::new();
        let mut lows = Vec::new();
        let mut highs = Vec::new();
        let mut contents = Vec::new();
        for histogram in directory.histograms() {
            for (bin, content) in histogram.contents().iter().enumerate() {
                let (low, high) = histogram.axis().bin_limits(bin);
                ranges.push(directory.name().to_string());
                names.push(histogram.name().to_string());
                bins.push(bin as i64);
                lows.push(low);
                highs.push(high);
                contents.push(*content);
            }
        }
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(ranges)),
            Arc::new(StringArray::from(names)),
            Arc::new(Int64Array::from(bins)),
            Arc::new(Float64Array::from(lows)),
            Arc::new(Float64Array::from(highs)),
            Arc::new(Float64Array::from(contents)),
        ];
        writer.write(&RecordBatch::try_new(schema.clone(), columns)?)?;
    }
    writer.close()?;
    Ok(())
}

fn downcast_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> AnglesResult<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AnglesError::MissingColumn {
            name: name.to_string(),
        })?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| AnglesError::Custom(format!("Column '{name}' has an unexpected type")))
}

/// Read a file written by [`write_parquet`] back as range → histogram → bin contents (in bin
/// order, underflow first).
pub fn read_parquet(path: &Path) -> AnglesResult<IndexMap<String, IndexMap<String, Vec<f64>>>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut directories: IndexMap<String, IndexMap<String, Vec<(i64, f64)>>> = IndexMap::new();
    for batch in reader {
        let batch = batch?;
        let ranges = downcast_column::<StringArray>(&batch, "range")?;
        let names = downcast_column::<StringArray>(&batch, "histogram")?;
        let bins = downcast_column::<Int64Array>(&batch, "bin")?;
        let contents = downcast_column::<Float64Array>(&batch, "content")?;
        for row in 0..batch.num_rows() {
            directories
                .entry(ranges.value(row).to_string())
                .or_default()
                .entry(names.value(row).to_string())
                .or_default()
                .push((bins.value(row), contents.value(row)));
        }
    }
    Ok(directories
        .into_iter()
        .map(|(range, histograms)| {
            let histograms = histograms
                .into_iter()
                .map(|(name, mut bins)| {
                    bins.sort_by_key(|(bin, _)| *bin);
                    (name, bins.into_iter().map(|(_, content)| content).collect())
                })
                .collect();
            (range, histograms)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::{env, fs};

    use approx::assert_relative_eq;

    use super::*;
    use crate::histograms::Axis;

    fn temp_dir() -> PathBuf {
        let dir = env::temp_dir().join(format!("laddu_angles_hist_{}", fastrand::u64(..)));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_output_format() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/angles.root")).unwrap(),
            OutputFormat::Root
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("angles.PARQUET")).unwrap(),
            OutputFormat::Parquet
        );
        assert!(OutputFormat::from_path(Path::new("angles.txt")).is_err());
        assert!(OutputFormat::from_path(Path::new("angles")).is_err());
    }

    #[test]
    fn test_prepare_output() {
        let dir = temp_dir();
        let settings = HistogramSettings::default();
        let (path, format) = prepare_output(&dir.join("angles.root"), &settings).unwrap();
        assert_eq!(path, dir.join("angles.root"));
        assert_eq!(format, OutputFormat::Root);
        let uneven = HistogramSettings {
            mass: Axis::new(50, 0.0, 5.0).unwrap(),
            ..settings
        };
        assert!(prepare_output(&dir.join("angles.root"), &uneven).is_err());
        assert!(prepare_output(&dir.join("angles.parquet"), &uneven).is_ok());
        assert!(prepare_output(&dir.join("missing/angles.parquet"), &settings).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_parquet_output() {
        let dir = temp_dir();
        let path = dir.join("angles.parquet");
        let settings = HistogramSettings {
            mass: Axis::new(4, 0.0, 2.0).unwrap(),
            phi: Axis::new(2, -1.0, 1.0).unwrap(),
            cos_theta: Axis::new(2, -1.0, 1.0).unwrap(),
        };
        let mut first = HistogramDirectory::new("bin1_bin2", 1, &settings);
        first.vertices_mut()[0].mass.fill(0.7);
        first.vertices_mut()[0].mass.fill(9.0);
        first.vertices_mut()[0].phi.fill(0.5);
        let second = HistogramDirectory::new("bin3_bin3", 1, &settings);
        write_histograms(&path, OutputFormat::Parquet, [&first, &second]).unwrap();

        let read = read_parquet(&path).unwrap();
        assert_eq!(read.keys().collect::<Vec<_>>(), vec!["bin1_bin2", "bin3_bin3"]);
        let histograms = &read["bin1_bin2"];
        assert_eq!(
            histograms.keys().collect::<Vec<_>>(),
            vec!["m0", "phi0", "theta0"]
        );
        assert_eq!(histograms["m0"], vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(histograms["phi0"], vec![0.0, 0.0, 1.0, 0.0]);
        assert_relative_eq!(read["bin3_bin3"]["theta0"].iter().sum::<f64>(), 0.0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_root_output() {
        let dir = temp_dir();
        let path = dir.join("angles.root");
        let settings = HistogramSettings {
            mass: Axis::new(3, 0.0, 3.0).unwrap(),
            phi: Axis::new(3, -3.0, 3.0).unwrap(),
            cos_theta: Axis::new(3, -1.0, 1.0).unwrap(),
        };
        let mut directory = HistogramDirectory::new("bin1_bin1", 2, &settings);
        directory.vertices_mut()[1].mass.fill(1.5);
        write_histograms(&path, OutputFormat::Root, [&directory]).unwrap();

        let mut file = RootFile::open(&path).unwrap();
        let tree = file.get_tree("bin1_bin1").unwrap();
        let bins: Vec<i32> = tree
            .branch(BIN_BRANCH)
            .unwrap()
            .as_iter::<i32>()
            .unwrap()
            .collect();
        assert_eq!(bins, vec![0, 1, 2, 3, 4]);
        let m1: Vec<f64> = tree
            .branch("m1")
            .unwrap()
            .as_iter::<f64>()
            .unwrap()
            .collect();
        assert_eq!(m1, vec![0.0, 0.0, 1.0, 0.0, 0.0]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
