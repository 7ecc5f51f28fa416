/// Useful enumerations for the reference frames used in isobar decays.
pub mod enums;
/// Lorentz transformations into the Gottfried-Jackson and helicity frames.
pub mod transforms;
/// Plain three- and four-vectors with the usual relativistic kinematics.
pub mod vectors;

/// A helper method to get histogram edges from evenly-spaced `bins` over a given `range`
///
/// # See Also
/// [`get_bin_index`]
pub fn get_bin_edges(bins: usize, range: (f64, f64)) -> Vec<f64> {
    let bin_width = (range.1 - range.0) / (bins as f64);
    (0..=bins)
        .map(|i| range.0 + (i as f64 * bin_width))
        .collect()
}

/// A helper method to obtain the index of a bin where a value should go in a histogram with evenly
/// spaced `bins` over a given `range`
///
/// Values outside of the half-open interval `[limits.0, limits.1)` (and NaN) have no bin.
///
/// # See Also
/// [`get_bin_edges`]
pub fn get_bin_index(value: f64, bins: usize, limits: (f64, f64)) -> Option<usize> {
    if value >= limits.0 && value < limits.1 {
        let bin_width = (limits.1 - limits.0) / bins as f64;
        let bin_index = ((value - limits.0) / bin_width).floor() as usize;
        Some(bin_index.min(bins - 1))
    } else {
        None
    }
}

/// Join a list of names with commas, as used in diagnostic messages.
pub fn list_to_name<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| name.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning() {
        assert_eq!(get_bin_index(0.0, 3, (0.0, 1.0)), Some(0));
        assert_eq!(get_bin_index(0.1, 3, (0.0, 1.0)), Some(0));
        assert_eq!(get_bin_index(0.5, 3, (0.0, 1.0)), Some(1));
        assert_eq!(get_bin_index(0.9, 3, (0.0, 1.0)), Some(2));
        assert_eq!(get_bin_index(1.0, 3, (0.0, 1.0)), None);
        assert_eq!(get_bin_index(-0.1, 3, (0.0, 1.0)), None);
        assert_eq!(get_bin_index(f64::NAN, 3, (0.0, 1.0)), None);
        assert_eq!(get_bin_edges(4, (-1.0, 1.0)), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_list_to_name() {
        assert_eq!(list_to_name(&["pi-", "pi-", "pi+"]), "pi-, pi-, pi+");
        assert_eq!(list_to_name::<&str>(&[]), "");
    }
}
