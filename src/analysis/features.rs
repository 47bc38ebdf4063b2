use serde::{Deserialize, Serialize};

/// Number of acoustic descriptors per recording.
pub const FEATURE_COUNT: usize = 14;

/// Column names of the descriptors, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "meanF0",
    "stdevF0",
    "meanIntensity",
    "stdevIntensity",
    "HNR",
    "localJitter",
    "localabsoluteJitter",
    "rapJitter",
    "ppq5Jitter",
    "localShimmer",
    "localdbShimmer",
    "apq3Shimmer",
    "aqpq5Shimmer",
    "apq11Shimmer",
];

/// The fixed set of voice descriptors computed for one recording.
///
/// Either every field is a measured finite value or every field is zero (analysis failed).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    #[serde(rename = "meanF0")]
    pub mean_f0: f64,
    #[serde(rename = "stdevF0")]
    pub stdev_f0: f64,
    #[serde(rename = "meanIntensity")]
    pub mean_intensity: f64,
    #[serde(rename = "stdevIntensity")]
    pub stdev_intensity: f64,
    #[serde(rename = "HNR")]
    pub hnr: f64,
    #[serde(rename = "localJitter")]
    pub local_jitter: f64,
    #[serde(rename = "localabsoluteJitter")]
    pub local_absolute_jitter: f64,
    #[serde(rename = "rapJitter")]
    pub rap_jitter: f64,
    #[serde(rename = "ppq5Jitter")]
    pub ppq5_jitter: f64,
    #[serde(rename = "localShimmer")]
    pub local_shimmer: f64,
    #[serde(rename = "localdbShimmer")]
    pub local_db_shimmer: f64,
    #[serde(rename = "apq3Shimmer")]
    pub apq3_shimmer: f64,
    #[serde(rename = "aqpq5Shimmer")]
    pub apq5_shimmer: f64,
    #[serde(rename = "apq11Shimmer")]
    pub apq11_shimmer: f64,
}

impl FeatureVector {
    /// The all-zero vector reported for recordings that could not be analysed.
    pub fn zeroed() -> Self {
        Self::default()
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.mean_f0,
            self.stdev_f0,
            self.mean_intensity,
            self.stdev_intensity,
            self.hnr,
            self.local_jitter,
            self.local_absolute_jitter,
            self.rap_jitter,
            self.ppq5_jitter,
            self.local_shimmer,
            self.local_db_shimmer,
            self.apq3_shimmer,
            self.apq5_shimmer,
            self.apq11_shimmer,
        ]
    }

    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [
            mean_f0,
            stdev_f0,
            mean_intensity,
            stdev_intensity,
            hnr,
            local_jitter,
            local_absolute_jitter,
            rap_jitter,
            ppq5_jitter,
            local_shimmer,
            local_db_shimmer,
            apq3_shimmer,
            apq5_shimmer,
            apq11_shimmer,
        ] = values;
        Self {
            mean_f0,
            stdev_f0,
            mean_intensity,
            stdev_intensity,
            hnr,
            local_jitter,
            local_absolute_jitter,
            rap_jitter,
            ppq5_jitter,
            local_shimmer,
            local_db_shimmer,
            apq3_shimmer,
            apq5_shimmer,
            apq11_shimmer,
        }
    }

    /// True for the failure sentinel.
    pub fn is_zeroed(&self) -> bool {
        self.to_array().iter().all(|&v| v == 0.0)
    }

    pub fn all_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// `(name, value)` pairs in column order.
    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_array())
    }
}
