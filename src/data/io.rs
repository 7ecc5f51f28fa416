//! Event-file readers and writers with shared column-discovery helpers.

use std::{
    collections::HashMap,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{Array, ArrayRef, Float32Array, Float64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use indexmap::IndexMap;
use oxyroot::{Branch, RootFile, WriterTree};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    file::{metadata::KeyValue, properties::WriterProperties},
};

use super::{EventReadOptions, KinematicsDataset, KinematicsNames, P3Column};
use crate::{config::expand_path, AnglesError, AnglesResult};

const COMPONENTS: [&str; 3] = ["px", "py", "pz"];

/// Event-file formats, chosen by extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventFileFormat {
    /// `.root`
    Root,
    /// `.parquet`
    Parquet,
}

impl EventFileFormat {
    /// The format of `path`, or [`None`] if its extension is not an event-file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "root" => Some(Self::Root),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }
}

/// Read an event file, dispatching on its extension.
pub fn read_events(path: &Path, options: &EventReadOptions) -> AnglesResult<KinematicsDataset> {
    match EventFileFormat::from_path(path) {
        Some(EventFileFormat::Parquet) => read_parquet(path, options),
        Some(EventFileFormat::Root) => read_root(path, options),
        None => Err(AnglesError::Custom(format!(
            "Unsupported event file '{}': expected a '.root' or '.parquet' extension",
            path.display()
        ))),
    }
}

fn canonicalize_event_path(path: &Path) -> AnglesResult<PathBuf> {
    Ok(expand_path(&path.to_string_lossy())?.canonicalize()?)
}

/// Count the data slots `0, 1, …` for which all three momentum columns under `leaf` exist.
///
/// A slot with only some of its components is an error.
fn count_slots<F: Fn(&str) -> bool>(leaf: &str, has_column: F) -> AnglesResult<usize> {
    let mut slot = 0;
    loop {
        let present: Vec<bool> = COMPONENTS
            .iter()
            .map(|component| {
                has_column(&EventReadOptions::column_name(leaf, slot, component))
            })
            .collect();
        match present.iter().position(|&found| !found) {
            None => slot += 1,
            Some(_) if !present.contains(&true) => return Ok(slot),
            Some(missing) => {
                return Err(AnglesError::MissingColumn {
                    name: EventReadOptions::column_name(leaf, slot, COMPONENTS[missing]),
                })
            }
        }
    }
}

/// Pick the particle names for `n_slots` slots from file metadata, falling back to the
/// configured names.
fn resolve_names(
    metadata: &HashMap<String, String>,
    key: &str,
    fallback: Option<&Vec<String>>,
    n_slots: usize,
    path: &Path,
) -> AnglesResult<Vec<String>> {
    let names = match metadata.get(key) {
        Some(list) => KinematicsNames::parse_list(list),
        None => fallback.cloned().ok_or_else(|| {
            AnglesError::Custom(format!(
                "No particle names for '{key}' in '{}' and none configured",
                path.display()
            ))
        })?,
    };
    if names.len() != n_slots {
        return Err(AnglesError::LengthMismatch {
            context: format!("Particle names '{key}' for '{}'", path.display()),
            expected: n_slots,
            actual: names.len(),
        });
    }
    Ok(names)
}

#[derive(Clone, Copy)]
enum FloatColumn<'a> {
    F32(&'a Float32Array),
    F64(&'a Float64Array),
}

impl<'a> FloatColumn<'a> {
    fn value(&self, row: usize) -> f64 {
        match self {
            Self::F32(array) => array.value(row) as f64,
            Self::F64(array) => array.value(row),
        }
    }
}

fn prepare_float_column<'a>(batch: &'a RecordBatch, name: &str) -> AnglesResult<FloatColumn<'a>> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| AnglesError::MissingColumn {
            name: name.to_string(),
        })?;
    let mismatch = || AnglesError::Custom(format!("Column '{name}' could not be read as floats"));
    match column.data_type() {
        DataType::Float32 => column
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(FloatColumn::F32)
            .ok_or_else(mismatch),
        DataType::Float64 => column
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(FloatColumn::F64)
            .ok_or_else(mismatch),
        other => Err(AnglesError::Custom(format!(
            "Column '{name}' has type {other}, expected Float32 or Float64"
        ))),
    }
}

fn append_record_batch(
    batch: &RecordBatch,
    leaf: &str,
    columns_out: &mut [P3Column],
) -> AnglesResult<()> {
    for (slot, target) in columns_out.iter_mut().enumerate() {
        let [px, py, pz] = COMPONENTS.map(|component| {
            prepare_float_column(batch, &EventReadOptions::column_name(leaf, slot, component))
        });
        let (px, py, pz) = (px?, py?, pz?);
        for row in 0..batch.num_rows() {
            target.px.push(px.value(row));
            target.py.push(py.value(row));
            target.pz.push(pz.value(row));
        }
    }
    Ok(())
}

/// Read events from a Parquet file.
///
/// Particle names come from the file's key-value metadata under
/// [`EventReadOptions::prod_names_key`] and [`EventReadOptions::decay_names_key`]
/// (comma-separated), or from the configured names when the file has none.
pub fn read_parquet(path: &Path, options: &EventReadOptions) -> AnglesResult<KinematicsDataset> {
    let path = canonicalize_event_path(path)?;
    let file = File::open(&path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let mut metadata = builder.schema().metadata().clone();
    if let Some(key_values) = builder.metadata().file_metadata().key_value_metadata() {
        for key_value in key_values {
            if let Some(value) = &key_value.value {
                metadata.insert(key_value.key.clone(), value.clone());
            }
        }
    }
    let column_names: Vec<&str> = builder
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().as_str())
        .collect();
    let has_column = |name: &str| column_names.contains(&name);
    let n_prod = count_slots(&options.prod_momenta_leaf, has_column)?;
    let n_decay = count_slots(&options.decay_momenta_leaf, has_column)?;
    let names = KinematicsNames {
        production: resolve_names(
            &metadata,
            &options.prod_names_key,
            options.prod_names.as_ref(),
            n_prod,
            &path,
        )?,
        decay: resolve_names(
            &metadata,
            &options.decay_names_key,
            options.decay_names.as_ref(),
            n_decay,
            &path,
        )?,
    };

    let mut production = vec![P3Column::default(); n_prod];
    let mut decay = vec![P3Column::default(); n_decay];
    let reader = builder.build()?;
    for batch in reader {
        let batch = batch?;
        append_record_batch(&batch, &options.prod_momenta_leaf, &mut production)?;
        append_record_batch(&batch, &options.decay_momenta_leaf, &mut decay)?;
    }
    KinematicsDataset::from_columns(names, production, decay)
}

type BranchLookup<'a> = IndexMap<&'a str, (RootScalarKind, &'a Branch)>;

#[derive(Clone, Copy)]
enum RootScalarKind {
    F32,
    F64,
}

fn branch_scalar_kind(branch: &Branch) -> Option<RootScalarKind> {
    match branch.item_type_name().to_ascii_lowercase().as_str() {
        "float" | "float_t" | "float32_t" => Some(RootScalarKind::F32),
        "double" | "double_t" | "double32_t" => Some(RootScalarKind::F64),
        _ => None,
    }
}

fn map_root_error<E: std::fmt::Display>(context: &str, err: E) -> AnglesError {
    AnglesError::RootError(format!("{context}: {err}"))
}

fn read_branch_values(lookup: &BranchLookup<'_>, column_name: &str) -> AnglesResult<Vec<f64>> {
    let (kind, branch) =
        lookup
            .get(column_name)
            .copied()
            .ok_or_else(|| AnglesError::MissingColumn {
                name: column_name.to_string(),
            })?;
    let values = match kind {
        RootScalarKind::F32 => branch
            .as_iter::<f32>()
            .map_err(|err| map_root_error(&format!("Failed to read branch '{column_name}'"), err))?
            .map(|value| value as f64)
            .collect(),
        RootScalarKind::F64 => branch
            .as_iter::<f64>()
            .map_err(|err| map_root_error(&format!("Failed to read branch '{column_name}'"), err))?
            .collect(),
    };
    Ok(values)
}

fn read_root_slots(
    lookup: &BranchLookup<'_>,
    leaf: &str,
    n_slots: usize,
) -> AnglesResult<Vec<P3Column>> {
    (0..n_slots)
        .map(|slot| {
            Ok(P3Column {
                px: read_branch_values(lookup, &EventReadOptions::column_name(leaf, slot, "px"))?,
                py: read_branch_values(lookup, &EventReadOptions::column_name(leaf, slot, "py"))?,
                pz: read_branch_values(lookup, &EventReadOptions::column_name(leaf, slot, "pz"))?,
            })
        })
        .collect()
}

/// Read events from the tree [`EventReadOptions::tree`] of a ROOT file.
///
/// ROOT files do not carry particle names in this layout, so the configured names are used.
pub fn read_root(path: &Path, options: &EventReadOptions) -> AnglesResult<KinematicsDataset> {
    let path = canonicalize_event_path(path)?;
    let mut file = RootFile::open(&path).map_err(|err| {
        map_root_error(&format!("Failed to open ROOT file '{}'", path.display()), err)
    })?;
    let tree = file.get_tree(&options.tree).map_err(|err| {
        map_root_error(&format!("Failed to open ROOT tree '{}'", options.tree), err)
    })?;
    let mut lookup: BranchLookup<'_> = IndexMap::new();
    for branch in tree.branches() {
        if let Some(kind) = branch_scalar_kind(branch) {
            lookup.insert(branch.name(), (kind, branch));
        }
    }
    let has_column = |name: &str| lookup.contains_key(name);
    let n_prod = count_slots(&options.prod_momenta_leaf, has_column)?;
    let n_decay = count_slots(&options.decay_momenta_leaf, has_column)?;
    let no_metadata = HashMap::new();
    let names = KinematicsNames {
        production: resolve_names(
            &no_metadata,
            &options.prod_names_key,
            options.prod_names.as_ref(),
            n_prod,
            &path,
        )?,
        decay: resolve_names(
            &no_metadata,
            &options.decay_names_key,
            options.decay_names.as_ref(),
            n_decay,
            &path,
        )?,
    };
    let production = read_root_slots(&lookup, &options.prod_momenta_leaf, n_prod)?;
    let decay = read_root_slots(&lookup, &options.decay_momenta_leaf, n_decay)?;
    KinematicsDataset::from_columns(names, production, decay)
}

fn slot_columns<'a>(
    leaf: &'a str,
    columns: &'a [P3Column],
) -> impl Iterator<Item = (String, &'a Vec<f64>)> + 'a {
    columns.iter().enumerate().flat_map(move |(slot, column)| {
        COMPONENTS
            .iter()
            .zip([&column.px, &column.py, &column.pz])
            .map(move |(component, values)| {
                (EventReadOptions::column_name(leaf, slot, component), values)
            })
    })
}

/// Write events to a Parquet file, storing the particle names as comma-separated key-value
/// metadata.
pub fn write_parquet(
    dataset: &KinematicsDataset,
    path: &Path,
    options: &EventReadOptions,
) -> AnglesResult<()> {
    let path = expand_path(&path.to_string_lossy())?;
    let columns: Vec<(String, &Vec<f64>)> =
        slot_columns(&options.prod_momenta_leaf, dataset.production_columns())
            .chain(slot_columns(&options.decay_momenta_leaf, dataset.decay_columns()))
            .collect();
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, _)| Field::new(name.clone(), DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(Float64Array::from(values.to_vec())) as ArrayRef)
        .collect();
    let properties = WriterProperties::builder()
        .set_key_value_metadata(Some(vec![
            KeyValue::new(
                options.prod_names_key.clone(),
                dataset.names().production.join(","),
            ),
            KeyValue::new(
                options.decay_names_key.clone(),
                dataset.names().decay.join(","),
            ),
        ]))
        .build();
    let file = File::create(&path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(properties))?;
    writer.write(&RecordBatch::try_new(schema, arrays)?)?;
    writer.close()?;
    Ok(())
}

/// Write events as `f64` branches of the tree [`EventReadOptions::tree`] in a ROOT file.
pub fn write_root(
    dataset: &KinematicsDataset,
    path: &Path,
    options: &EventReadOptions,
) -> AnglesResult<()> {
    let path = expand_path(&path.to_string_lossy())?;
    let mut file = RootFile::create(&path).map_err(|err| {
        map_root_error(&format!("Failed to create ROOT file '{}'", path.display()), err)
    })?;
    let mut tree = WriterTree::new(&options.tree);
    for (name, values) in slot_columns(&options.prod_momenta_leaf, dataset.production_columns())
        .chain(slot_columns(&options.decay_momenta_leaf, dataset.decay_columns()))
    {
        tree.new_branch(name, values.clone().into_iter());
    }
    tree.write(&mut file).map_err(|err| {
        map_root_error(
            &format!("Failed to write ROOT tree '{}' to '{}'", options.tree, path.display()),
            err,
        )
    })?;
    file.close().map_err(|err| {
        map_root_error(&format!("Failed to close ROOT file '{}'", path.display()), err)
    })?;
    Ok(())
}
