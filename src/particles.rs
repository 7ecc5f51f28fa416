use std::{fmt::Display, fs, path::Path, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{AnglesError, AnglesResult};

/// Static properties of a particle species, as listed in a particle data table.
///
/// Spin and isospin are stored in units of $`\hbar/2`$.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleProperties {
    /// The particle name including its charge, e.g. `pi-`.
    pub name: String,
    /// Nominal mass in GeV/$`c^2`$.
    pub mass: f64,
    /// Nominal width in GeV/$`c^2`$.
    pub width: f64,
    /// Baryon number.
    pub baryon_number: i32,
    /// Isospin ($`\times 2`$).
    pub isospin: i32,
    /// Strangeness.
    pub strangeness: i32,
    /// Charm.
    pub charm: i32,
    /// Beauty.
    pub beauty: i32,
    /// G-parity (0 if undefined).
    pub g_parity: i32,
    /// Spin ($`\times 2`$).
    pub spin: i32,
    /// Parity.
    pub parity: i32,
    /// C-parity (0 if undefined).
    pub c_parity: i32,
}

fn sign(value: i32) -> &'static str {
    match value.signum() {
        1 => "+",
        -1 => "-",
        _ => "",
    }
}

impl Display for ParticleProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "particle '{}': mass = {}, width = {}, baryon # = {}, IG(JPC) = {}{}({}{}{}), S = {}, Charm = {}, B = {}",
            self.name,
            self.mass,
            self.width,
            self.baryon_number,
            self.isospin,
            sign(self.g_parity),
            self.spin,
            sign(self.parity),
            sign(self.c_parity),
            self.strangeness,
            self.charm,
            self.beauty
        )
    }
}

impl FromStr for ParticleProperties {
    type Err = AnglesError;

    /// Parse a whitespace-separated table row:
    /// `name mass width baryonNmb I S Charm B G J P C`. Trailing columns are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = || AnglesError::ParseError {
            name: s.to_string(),
            object: "ParticleProperties".to_string(),
        };
        let fields: Vec<&str> = s.split_whitespace().take(12).collect();
        if fields.len() < 12 {
            return Err(parse_error());
        }
        let float = |i: usize| fields[i].parse::<f64>().map_err(|_| parse_error());
        let int = |i: usize| fields[i].parse::<i32>().map_err(|_| parse_error());
        Ok(Self {
            name: fields[0].to_string(),
            mass: float(1)?,
            width: float(2)?,
            baryon_number: int(3)?,
            isospin: int(4)?,
            strangeness: int(5)?,
            charm: int(6)?,
            beauty: int(7)?,
            g_parity: int(8)?,
            spin: int(9)?,
            parity: int(10)?,
            c_parity: int(11)?,
        })
    }
}

/// The name of the charge-conjugate partner of a charged particle, e.g. `pi-` for `pi+`.
///
/// Returns [`None`] for names without a trailing charge sign.
pub fn charge_conjugate_name(name: &str) -> Option<String> {
    if let Some(stem) = name.strip_suffix('+') {
        Some(format!("{stem}-"))
    } else {
        name.strip_suffix('-').map(|stem| format!("{stem}+"))
    }
}

/// A lookup table of [`ParticleProperties`] by particle name.
#[derive(Clone, Debug, Default)]
pub struct ParticleDataTable {
    entries: IndexMap<String, ParticleProperties>,
    skipped: Vec<String>,
}

impl ParticleDataTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a table from a text file (see [`ParticleDataTable::parse`]).
    pub fn read_file<P: AsRef<Path>>(path: P) -> AnglesResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            AnglesError::Custom(format!(
                "Failed to read particle data table '{}': {err}",
                path.display()
            ))
        })?;
        Ok(Self::parse(&text))
    }

    /// Parse a table with one particle per line. Everything after a `#` is a comment and blank
    /// lines are skipped. Later entries replace earlier ones of the same name.
    ///
    /// Lines that are not a valid row are kept in [`ParticleDataTable::skipped_lines`].
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        for line in text.lines() {
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            match content.parse() {
                Ok(properties) => table.insert(properties),
                Err(_) => table.skipped.push(content.to_string()),
            }
        }
        table
    }

    /// The malformed lines ignored while parsing.
    pub fn skipped_lines(&self) -> &[String] {
        &self.skipped
    }

    /// Add (or replace) an entry.
    pub fn insert(&mut self, properties: ParticleProperties) {
        self.entries.insert(properties.name.clone(), properties);
    }

    /// Look up a particle by name, falling back to its charge-conjugate partner.
    pub fn entry(&self, name: &str) -> Option<&ParticleProperties> {
        self.entries.get(name).or_else(|| {
            charge_conjugate_name(name).and_then(|partner| self.entries.get(&partner))
        })
    }

    /// Whether the table knows `name` (or its charge-conjugate partner).
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticleProperties> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const TABLE: &str = "\
# name  mass      width     B  I  S  C  B  G  J  P  C
pi+     0.13957   0.0       0  2  0  0  0  -1 0  -1 0
pi0     0.1349766 0.0       0  2  0  0  0  -1 0  -1 1

rho0    0.7755    0.1491    0  2  0  0  0  1  2  -1 -1  # the rho
";

    #[test]
    fn test_parse_row() {
        let pion: ParticleProperties = "pi- 0.13957 0 0 2 0 0 0 -1 0 -1 0".parse().unwrap();
        assert_eq!(pion.name, "pi-");
        assert_relative_eq!(pion.mass, 0.13957);
        assert_eq!(pion.g_parity, -1);
        assert_eq!(pion.parity, -1);
        assert!(matches!(
            "pi- 0.13957 0".parse::<ParticleProperties>(),
            Err(AnglesError::ParseError { .. })
        ));
        assert!("pi- heavy 0 0 2 0 0 0 -1 0 -1 0"
            .parse::<ParticleProperties>()
            .is_err());
        let kaon: ParticleProperties = "K+ 0.493677 0 0 1 1 0 0 0 0 -1 0 321 kaon"
            .parse()
            .unwrap();
        assert_eq!(kaon.name, "K+");
        assert_eq!(kaon.strangeness, 1);
        assert_eq!(kaon.c_parity, 0);
    }

    #[test]
    fn test_parse_table() {
        let table = ParticleDataTable::parse(TABLE);
        assert_eq!(table.len(), 3);
        assert!(!table.is_empty());
        let rho = table.entry("rho0").unwrap();
        assert_relative_eq!(rho.width, 0.1491);
        assert_eq!(rho.spin, 2);
        assert_eq!(
            table.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["pi+", "pi0", "rho0"]
        );
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let table = ParticleDataTable::parse(
            "pi+ 0.13957 0 0 2 0 0 0 -1 0 -1 0\nbad row\nrho0 0.7755 0.1491 0 2 0 0 0 1 2 -1 -1\n",
        );
        assert_eq!(table.len(), 2);
        assert!(table.contains("rho0"));
        assert_eq!(table.skipped_lines(), ["bad row"]);
        assert!(ParticleDataTable::parse(TABLE).skipped_lines().is_empty());
    }

    #[test]
    fn test_charge_conjugate_lookup() {
        let table = ParticleDataTable::parse(TABLE);
        assert!(table.contains("pi-"));
        assert_eq!(table.entry("pi-").unwrap().name, "pi+");
        assert!(!table.contains("K-"));
        assert_eq!(charge_conjugate_name("K+").as_deref(), Some("K-"));
        assert_eq!(charge_conjugate_name("rho0"), None);
    }

    #[test]
    fn test_display() {
        let table = ParticleDataTable::parse(TABLE);
        assert_eq!(
            table.entry("rho0").unwrap().to_string(),
            "particle 'rho0': mass = 0.7755, width = 0.1491, baryon # = 0, IG(JPC) = 2+(2--), S = 0, Charm = 0, B = 0"
        );
    }
}
