use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unit in which pitch statistics are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PitchUnit {
    #[default]
    Hertz,
    Mel,
    SemitonesRe1Hz,
    SemitonesRe100Hz,
    SemitonesRe200Hz,
    SemitonesRe440Hz,
    Erb,
}

impl PitchUnit {
    pub const ALL: [PitchUnit; 7] = [
        PitchUnit::Hertz,
        PitchUnit::Mel,
        PitchUnit::SemitonesRe1Hz,
        PitchUnit::SemitonesRe100Hz,
        PitchUnit::SemitonesRe200Hz,
        PitchUnit::SemitonesRe440Hz,
        PitchUnit::Erb,
    ];

    /// Conventional display name, also accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            PitchUnit::Hertz => "Hertz",
            PitchUnit::Mel => "mel",
            PitchUnit::SemitonesRe1Hz => "semitones re 1 Hz",
            PitchUnit::SemitonesRe100Hz => "semitones re 100 Hz",
            PitchUnit::SemitonesRe200Hz => "semitones re 200 Hz",
            PitchUnit::SemitonesRe440Hz => "semitones re 440 Hz",
            PitchUnit::Erb => "ERB",
        }
    }

    /// Convert a frequency in Hertz into this unit.
    pub fn from_hertz(self, hertz: f64) -> f64 {
        match self {
            PitchUnit::Hertz => hertz,
            PitchUnit::Mel => 550.0 * (1.0 + hertz / 550.0).ln(),
            PitchUnit::SemitonesRe1Hz => semitones(hertz, 1.0),
            PitchUnit::SemitonesRe100Hz => semitones(hertz, 100.0),
            PitchUnit::SemitonesRe200Hz => semitones(hertz, 200.0),
            PitchUnit::SemitonesRe440Hz => semitones(hertz, 440.0),
            PitchUnit::Erb => 11.17 * ((hertz + 312.0) / (hertz + 14_680.0)).ln() + 43.0,
        }
    }
}

fn semitones(hertz: f64, reference: f64) -> f64 {
    12.0 * (hertz / reference).log2()
}

impl fmt::Display for PitchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchUnit {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized == "hz" {
            return Ok(PitchUnit::Hertz);
        }
        PitchUnit::ALL
            .into_iter()
            .find(|unit| unit.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| format!("Unsupported pitch unit: {value}"))
    }
}

impl TryFrom<String> for PitchUnit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PitchUnit> for String {
    fn from(unit: PitchUnit) -> Self {
        unit.name().to_string()
    }
}
