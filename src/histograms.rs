use serde::{Deserialize, Serialize};

use crate::{
    utils::{get_bin_edges, get_bin_index},
    AnglesError, AnglesResult,
};

/// Writing histograms to ROOT and Parquet files.
pub mod io;

/// An evenly binned axis over `[low, high)`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Axis {
    /// Number of bins (excluding underflow and overflow).
    pub bins: usize,
    /// Lower edge of the first bin.
    pub low: f64,
    /// Upper edge of the last bin.
    pub high: f64,
}

impl Axis {
    /// Create a new [`Axis`], checking that it has at least one bin and a non-empty range.
    pub fn new(bins: usize, low: f64, high: f64) -> AnglesResult<Self> {
        let axis = Self { bins, low, high };
        axis.validate()?;
        Ok(axis)
    }

    /// Check that the axis has at least one bin and a finite range with `low < high`.
    pub fn validate(&self) -> AnglesResult<()> {
        if self.bins == 0 {
            return Err(AnglesError::Custom(
                "Number of bins must be greater than zero!".to_string(),
            ));
        }
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(AnglesError::Custom(format!(
                "The range [{}, {}] must have finite edges!",
                self.low, self.high
            )));
        }
        let ordered = self.low < self.high;
        if !ordered {
            return Err(AnglesError::Custom(format!(
                "The lower edge of the range ({}) must be smaller than the upper edge ({})!",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// The storage index of `value` following ROOT conventions: 0 is the underflow bin,
    /// `1..=bins` are the regular bins and `bins + 1` is the overflow bin. NaN has no bin.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            None
        } else if value < self.low {
            Some(0)
        } else {
            Some(
                get_bin_index(value, self.bins, (self.low, self.high))
                    .map_or(self.bins + 1, |index| index + 1),
            )
        }
    }

    /// The edges of the regular bins (`bins + 1` values).
    pub fn edges(&self) -> Vec<f64> {
        get_bin_edges(self.bins, (self.low, self.high))
    }

    /// The lower and upper edge of the bin with storage index `bin`; the underflow and overflow
    /// bins extend to infinity.
    pub fn bin_limits(&self, bin: usize) -> (f64, f64) {
        let width = (self.high - self.low) / self.bins as f64;
        if bin == 0 {
            (f64::NEG_INFINITY, self.low)
        } else if bin > self.bins {
            (self.high, f64::INFINITY)
        } else {
            (
                self.low + (bin - 1) as f64 * width,
                self.low + bin as f64 * width,
            )
        }
    }
}

fn default_mass_axis() -> Axis {
    Axis {
        bins: 100,
        low: 0.0,
        high: 5.0,
    }
}

fn default_phi_axis() -> Axis {
    Axis {
        bins: 100,
        low: -3.142,
        high: 3.142,
    }
}

fn default_cos_theta_axis() -> Axis {
    Axis {
        bins: 100,
        low: -1.0,
        high: 1.0,
    }
}

/// Binning of the three histograms booked for every decay vertex.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HistogramSettings {
    /// Binning of the isobar mass histograms `m<i>`.
    #[serde(default = "default_mass_axis")]
    pub mass: Axis,
    /// Binning of the azimuthal-angle histograms `phi<i>`.
    #[serde(default = "default_phi_axis")]
    pub phi: Axis,
    /// Binning of the polar-angle histograms `theta<i>` (filled with $`\cos\theta`$).
    #[serde(default = "default_cos_theta_axis")]
    pub cos_theta: Axis,
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self {
            mass: default_mass_axis(),
            phi: default_phi_axis(),
            cos_theta: default_cos_theta_axis(),
        }
    }
}

impl HistogramSettings {
    /// Validate every axis.
    pub fn validate(&self) -> AnglesResult<()> {
        self.mass.validate()?;
        self.phi.validate()?;
        self.cos_theta.validate()
    }

    /// Whether all three axes have the same number of bins.
    pub fn uniform_bins(&self) -> bool {
        self.mass.bins == self.phi.bins && self.phi.bins == self.cos_theta.bins
    }
}

/// A one-dimensional histogram with underflow and overflow bins.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram1D {
    name: String,
    title: String,
    axis: Axis,
    contents: Vec<f64>,
    entries: u64,
}

impl Histogram1D {
    /// Create an empty histogram.
    pub fn new<N: Into<String>, T: Into<String>>(name: N, title: T, axis: Axis) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            axis,
            contents: vec![0.0; axis.bins + 2],
            entries: 0,
        }
    }

    /// Add one entry at `value`, returning the storage index of the bin that was incremented.
    /// NaN values are not recorded.
    pub fn fill(&mut self, value: f64) -> Option<usize> {
        self.fill_weighted(value, 1.0)
    }

    /// Add an entry with the given `weight` at `value`.
    pub fn fill_weighted(&mut self, value: f64, weight: f64) -> Option<usize> {
        let bin = self.axis.find_bin(value)?;
        self.contents[bin] += weight;
        self.entries += 1;
        Some(bin)
    }

    /// The histogram's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The histogram's title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The binning.
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// All bin contents, including underflow (first) and overflow (last).
    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    /// The content of the bin with storage index `bin`.
    pub fn content(&self, bin: usize) -> f64 {
        self.contents.get(bin).copied().unwrap_or_default()
    }

    /// The number of (non-NaN) fills.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// The underflow content.
    pub fn underflow(&self) -> f64 {
        self.contents[0]
    }

    /// The overflow content.
    pub fn overflow(&self) -> f64 {
        self.contents[self.axis.bins + 1]
    }

    /// The sum of the regular bins.
    pub fn integral(&self) -> f64 {
        self.contents[1..=self.axis.bins].iter().sum()
    }
}

/// The three histograms booked for decay vertex `i`: `m<i>`, `phi<i>` and `theta<i>`.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexHistograms {
    /// Invariant mass of the vertex's parent.
    pub mass: Histogram1D,
    /// Azimuthal angle of the vertex's first daughter.
    pub phi: Histogram1D,
    /// Cosine of the polar angle of the vertex's first daughter.
    pub cos_theta: Histogram1D,
}

impl VertexHistograms {
    /// Book the histograms for the vertex with index `vertex`.
    pub fn new(vertex: usize, settings: &HistogramSettings) -> Self {
        let mass = format!("m{vertex}");
        let phi = format!("phi{vertex}");
        let theta = format!("theta{vertex}");
        Self {
            mass: Histogram1D::new(mass.clone(), mass, settings.mass),
            phi: Histogram1D::new(phi.clone(), phi, settings.phi),
            cos_theta: Histogram1D::new(theta.clone(), theta, settings.cos_theta),
        }
    }

    /// The three histograms in booking order.
    pub fn histograms(&self) -> [&Histogram1D; 3] {
        [&self.mass, &self.phi, &self.cos_theta]
    }
}

/// A named collection of per-vertex histograms, written as one directory (ROOT) or one `range`
/// value (Parquet) of the output file.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramDirectory {
    name: String,
    vertices: Vec<VertexHistograms>,
}

impl HistogramDirectory {
    /// Book three histograms for each of `n_vertices` decay vertices.
    pub fn new<S: Into<String>>(name: S, n_vertices: usize, settings: &HistogramSettings) -> Self {
        Self {
            name: name.into(),
            vertices: (0..n_vertices)
                .map(|vertex| VertexHistograms::new(vertex, settings))
                .collect(),
        }
    }

    /// The directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Histograms by vertex index.
    pub fn vertices(&self) -> &[VertexHistograms] {
        &self.vertices
    }

    /// Mutable histograms by vertex index.
    pub fn vertices_mut(&mut self) -> &mut [VertexHistograms] {
        &mut self.vertices
    }

    /// All histograms, vertex by vertex.
    pub fn histograms(&self) -> impl Iterator<Item = &Histogram1D> {
        self.vertices.iter().flat_map(|vertex| vertex.histograms())
    }

    /// Look up a histogram by name.
    pub fn get(&self, name: &str) -> Option<&Histogram1D> {
        self.histograms().find(|histogram| histogram.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_axis_validation() {
        assert!(Axis::new(10, 0.0, 1.0).is_ok());
        assert!(Axis::new(0, 0.0, 1.0).is_err());
        assert!(Axis::new(10, 1.0, 1.0).is_err());
        assert!(Axis::new(10, 0.0, f64::NAN).is_err());
        assert!(Axis::new(10, 0.0, f64::INFINITY).is_err());
        assert!(Axis::new(10, f64::NEG_INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_find_bin() {
        let axis = Axis::new(4, -1.0, 1.0).unwrap();
        assert_eq!(axis.find_bin(-1.5), Some(0));
        assert_eq!(axis.find_bin(-1.0), Some(1));
        assert_eq!(axis.find_bin(-0.25), Some(2));
        assert_eq!(axis.find_bin(0.999), Some(4));
        assert_eq!(axis.find_bin(1.0), Some(5));
        assert_eq!(axis.find_bin(f64::INFINITY), Some(5));
        assert_eq!(axis.find_bin(f64::NAN), None);
        assert_eq!(axis.bin_limits(0), (f64::NEG_INFINITY, -1.0));
        assert_eq!(axis.bin_limits(2), (-0.5, 0.0));
        assert_eq!(axis.bin_limits(5), (1.0, f64::INFINITY));
        assert_eq!(axis.edges(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_fill() {
        let mut histogram = Histogram1D::new("m0", "m0", Axis::new(5, 0.0, 5.0).unwrap());
        assert_eq!(histogram.fill(0.5), Some(1));
        assert_eq!(histogram.fill(4.5), Some(5));
        assert_eq!(histogram.fill(7.0), Some(6));
        assert_eq!(histogram.fill(-3.0), Some(0));
        assert_eq!(histogram.fill(f64::NAN), None);
        histogram.fill_weighted(2.2, 0.5);
        assert_eq!(histogram.entries(), 5);
        assert_relative_eq!(histogram.integral(), 2.5);
        assert_relative_eq!(histogram.underflow(), 1.0);
        assert_relative_eq!(histogram.overflow(), 1.0);
        assert_relative_eq!(histogram.content(3), 0.5);
        assert_eq!(histogram.content(99), 0.0);
        assert_eq!(histogram.contents().len(), 7);
    }

    #[test]
    fn test_default_settings() {
        let settings = HistogramSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.uniform_bins());
        assert_eq!(settings.mass, Axis::new(100, 0.0, 5.0).unwrap());
        assert_eq!(settings.phi, Axis::new(100, -3.142, 3.142).unwrap());
        assert_eq!(settings.cos_theta, Axis::new(100, -1.0, 1.0).unwrap());
    }

    #[test]
    fn test_directory_booking() {
        let directory = HistogramDirectory::new("1000_1010_1490_1500", 2, &Default::default());
        let names: Vec<&str> = directory.histograms().map(|h| h.name()).collect();
        assert_eq!(names, vec!["m0", "phi0", "theta0", "m1", "phi1", "theta1"]);
        assert_eq!(directory.get("phi1").unwrap().title(), "phi1");
        assert_eq!(directory.get("theta1").unwrap().axis().low, -1.0);
        assert!(directory.get("m2").is_none());
    }
}
