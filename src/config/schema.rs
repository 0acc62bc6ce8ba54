//! Namespace schema definitions.
//!
//! Each namespace is a typed record. Deserializing a fragment into the record
//! checks types and fills defaults; `check` enforces ranges and may clamp.
//! Serializing the record back yields the fully defaulted fragment.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::namespace::{Fragment, Namespace};
use crate::config::validation::ValidationError;

/// Validation and defaulting contract for one namespace.
pub trait NamespaceSchema: Serialize + DeserializeOwned + Default {
    const NAMESPACE: Namespace;

    /// Every field the record declares.
    const FIELDS: &'static [&'static str];

    /// Fields a caller may submit in a partial update.
    const PERMITTED: &'static [&'static str];

    /// Semantic checks run after deserialization.
    fn check(&mut self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Run schema `S` over a fragment, returning the fully defaulted result.
pub fn apply<S: NamespaceSchema>(fragment: &Fragment) -> Result<Fragment, ValidationError> {
    let mut record: S = serde_json::from_value(Value::Object(fragment.clone()))
        .map_err(|e| locate_failure::<S>(fragment, e))?;
    record.check()?;

    match serde_json::to_value(&record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::new(S::NAMESPACE, "", "schema did not produce an object")),
        Err(e) => Err(ValidationError::new(S::NAMESPACE, "", e.to_string())),
    }
}

/// Schema defaults, as produced by applying `S` to an empty fragment.
pub fn defaults<S: NamespaceSchema>() -> Fragment {
    match serde_json::to_value(S::default()) {
        Ok(Value::Object(map)) => map,
        _ => Fragment::new(),
    }
}

/// serde_json does not report the field path when deserializing from a
/// `Value`, so retry each key on its own to find the one that failed.
fn locate_failure<S: NamespaceSchema>(fragment: &Fragment, error: serde_json::Error) -> ValidationError {
    for (key, value) in fragment {
        let mut single = Fragment::new();
        single.insert(key.clone(), value.clone());
        if let Err(e) = serde_json::from_value::<S>(Value::Object(single)) {
            return ValidationError::new(S::NAMESPACE, key.clone(), e.to_string());
        }
    }
    ValidationError::new(S::NAMESPACE, "", error.to_string())
}

fn check_range<T: PartialOrd + std::fmt::Display + Copy>(
    namespace: Namespace,
    path: &str,
    value: T,
    min: T,
    max: T,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::out_of_range(namespace, path, value, min, max));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// core
// ---------------------------------------------------------------------------

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Address the lighting service binds its own API to.
    pub host: String,

    /// HTTP port.
    pub port: u16,

    /// HTTPS port.
    pub port_s: u16,

    /// Enable developer features.
    pub dev_mode: bool,

    /// Brightness multiplier applied to every output (0.0 - 1.0).
    pub global_brightness: f64,

    /// Apply transitions to all effects at once.
    pub global_transitions: bool,

    /// Frame rate of the UI visualiser; clamped to 1 - 60.
    pub visualisation_fps: u32,

    /// Maximum pixels sent to the UI visualiser per strip.
    pub visualisation_maxlen: u32,

    /// Blank outputs when a virtual is deactivated.
    pub flush_on_deactivate: bool,

    /// Extra brightness applied in the UI only (0.0 - 1.0).
    pub ui_brightness_boost: f64,

    /// Scan the network for devices at startup.
    pub scan_on_startup: bool,

    /// Create segment virtuals for discovered devices.
    pub create_segments: bool,

    /// Saved effect presets, keyed by effect type.
    pub user_presets: Fragment,

    pub devices: Vec<Value>,
    pub virtuals: Vec<Value>,
    pub integrations: Vec<Value>,
    pub scenes: Fragment,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            port_s: 8443,
            dev_mode: false,
            global_brightness: 1.0,
            global_transitions: true,
            visualisation_fps: 30,
            visualisation_maxlen: 81,
            flush_on_deactivate: false,
            ui_brightness_boost: 0.0,
            scan_on_startup: false,
            create_segments: false,
            user_presets: Fragment::new(),
            devices: Vec::new(),
            virtuals: Vec::new(),
            integrations: Vec::new(),
            scenes: Fragment::new(),
        }
    }
}

impl NamespaceSchema for CoreConfig {
    const NAMESPACE: Namespace = Namespace::Core;

    const FIELDS: &'static [&'static str] = &[
        "host",
        "port",
        "port_s",
        "dev_mode",
        "global_brightness",
        "global_transitions",
        "visualisation_fps",
        "visualisation_maxlen",
        "flush_on_deactivate",
        "ui_brightness_boost",
        "scan_on_startup",
        "create_segments",
        "user_presets",
        "devices",
        "virtuals",
        "integrations",
        "scenes",
    ];

    // devices, virtuals, integrations and scenes have their own endpoints.
    const PERMITTED: &'static [&'static str] = &[
        "host",
        "port",
        "port_s",
        "dev_mode",
        "global_brightness",
        "global_transitions",
        "visualisation_fps",
        "visualisation_maxlen",
        "flush_on_deactivate",
        "ui_brightness_boost",
        "scan_on_startup",
        "create_segments",
    ];

    fn check(&mut self) -> Result<(), ValidationError> {
        let ns = Self::NAMESPACE;
        if self.host.trim().is_empty() {
            return Err(ValidationError::new(ns, "host", "must not be empty"));
        }
        check_range(ns, "port", self.port, 1, u16::MAX)?;
        check_range(ns, "port_s", self.port_s, 1, u16::MAX)?;
        check_range(ns, "global_brightness", self.global_brightness, 0.0, 1.0)?;
        check_range(ns, "ui_brightness_boost", self.ui_brightness_boost, 0.0, 1.0)?;
        check_range(ns, "visualisation_maxlen", self.visualisation_maxlen, 5, 4096)?;
        self.visualisation_fps = self.visualisation_fps.clamp(1, 60);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// audio
// ---------------------------------------------------------------------------

/// Pitch detection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchMethod {
    Yinfft,
    Yin,
    Yinfast,
    Schmitt,
    Fcomb,
    Mcomb,
    Specacf,
}

/// Onset detection algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnsetMethod {
    Energy,
    Hfc,
    Complex,
    Phase,
    Specdiff,
    Kl,
    Mkl,
    Specflux,
}

/// Audio input and analysis configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    /// Index of the capture device.
    pub audio_device: u32,

    /// Capture sample rate in Hz.
    pub mic_rate: u32,

    /// Minimum volume (0.0 - 1.0) below which input is treated as silence.
    pub min_volume: f64,

    /// Delay applied to the analysed stream, in milliseconds.
    pub delay_ms: u32,

    /// Analysis updates per second.
    pub sample_rate: u32,

    /// FFT window size; a power of two.
    pub fft_size: u32,

    pub pitch_method: PitchMethod,
    pub onset_method: OnsetMethod,
    pub pitch_tolerance: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            audio_device: 0,
            mic_rate: 44_100,
            min_volume: 0.2,
            delay_ms: 0,
            sample_rate: 60,
            fft_size: 4096,
            pitch_method: PitchMethod::Yinfft,
            onset_method: OnsetMethod::Hfc,
            pitch_tolerance: 0.8,
        }
    }
}

impl AudioConfig {
    /// Capture-side checks.
    fn check_input(&self) -> Result<(), ValidationError> {
        let ns = Self::NAMESPACE;
        check_range(ns, "mic_rate", self.mic_rate, 8_000, 192_000)?;
        check_range(ns, "min_volume", self.min_volume, 0.0, 1.0)?;
        check_range(ns, "delay_ms", self.delay_ms, 0, 5_000)
    }

    /// Analysis-side checks.
    fn check_analysis(&self) -> Result<(), ValidationError> {
        let ns = Self::NAMESPACE;
        check_range(ns, "sample_rate", self.sample_rate, 1, 120)?;
        check_range(ns, "fft_size", self.fft_size, 512, 16_384)?;
        if !self.fft_size.is_power_of_two() {
            return Err(ValidationError::new(ns, "fft_size", "must be a power of two"));
        }
        check_range(ns, "pitch_tolerance", self.pitch_tolerance, 0.0, 2.0)
    }
}

impl NamespaceSchema for AudioConfig {
    const NAMESPACE: Namespace = Namespace::Audio;

    const FIELDS: &'static [&'static str] = &[
        "audio_device",
        "mic_rate",
        "min_volume",
        "delay_ms",
        "sample_rate",
        "fft_size",
        "pitch_method",
        "onset_method",
        "pitch_tolerance",
    ];

    const PERMITTED: &'static [&'static str] = Self::FIELDS;

    fn check(&mut self) -> Result<(), ValidationError> {
        self.check_input()?;
        self.check_analysis()
    }
}

// ---------------------------------------------------------------------------
// melbanks
// ---------------------------------------------------------------------------

/// Filter-bank coefficient shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoeffsType {
    Triangle,
    Bark,
    Mel,
    MattMel,
    Scott,
    ScottMel,
    Fixed,
    FixedSimple,
}

/// Mel filter-bank configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MelbanksConfig {
    /// Upper frequency of each filter bank, ascending.
    pub max_frequencies: Vec<u32>,

    /// Lower frequency shared by every bank.
    pub min_frequency: u32,

    pub coeffs_type: CoeffsType,
}

impl Default for MelbanksConfig {
    fn default() -> Self {
        Self {
            max_frequencies: vec![350, 2000, 15000],
            min_frequency: 20,
            coeffs_type: CoeffsType::MattMel,
        }
    }
}

impl NamespaceSchema for MelbanksConfig {
    const NAMESPACE: Namespace = Namespace::Melbanks;

    const FIELDS: &'static [&'static str] = &["max_frequencies", "min_frequency", "coeffs_type"];

    const PERMITTED: &'static [&'static str] = Self::FIELDS;

    fn check(&mut self) -> Result<(), ValidationError> {
        let ns = Self::NAMESPACE;
        check_range(ns, "min_frequency", self.min_frequency, 20, 1_000)?;
        check_range(ns, "max_frequencies", self.max_frequencies.len(), 1, 8)?;

        let mut previous = self.min_frequency;
        for (i, freq) in self.max_frequencies.iter().enumerate() {
            let path = format!("max_frequencies.{}", i);
            if *freq <= previous {
                return Err(ValidationError::new(
                    ns,
                    path,
                    format!("must be greater than {}", previous),
                ));
            }
            check_range(ns, &path, *freq, 21, 20_000)?;
            previous = *freq;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// wled_preferences
// ---------------------------------------------------------------------------

/// A preference the service applies to discovered WLED devices.
///
/// `user_set` marks values chosen explicitly rather than inherited from the
/// device. Both fields are optional so partial updates stay partial.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, bound(deserialize = "T: Deserialize<'de>"))]
pub struct Preference<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_set: Option<bool>,
}

impl<T> Default for Preference<T> {
    fn default() -> Self {
        Self {
            setting: None,
            user_set: None,
        }
    }
}

/// Realtime protocol used to stream to WLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WledSyncMode {
    Udp,
    Ddp,
    E131,
    Artnet,
}

/// WLED DMX channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum DmxMode {
    #[serde(rename = "Single RGB")]
    SingleRgb,
    #[serde(rename = "Single DRGB")]
    SingleDrgb,
    #[serde(rename = "Effect")]
    Effect,
    #[serde(rename = "Multi RGB")]
    MultiRgb,
    #[serde(rename = "Dimmer + Multi RGB")]
    DimmerMultiRgb,
    #[serde(rename = "Multi RGBW")]
    MultiRgbw,
}

/// Preferences pushed to WLED devices.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WledPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wled_preferred_mode: Option<Preference<WledSyncMode>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_gamma_enabled: Option<Preference<bool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_max_brightness: Option<Preference<bool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_dmx_mode: Option<Preference<DmxMode>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_universe_setting: Option<Preference<u16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dmx_address_start: Option<Preference<u16>>,

    /// Seconds WLED waits before leaving realtime mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactivity_timeout: Option<Preference<u16>>,
}

impl NamespaceSchema for WledPreferences {
    const NAMESPACE: Namespace = Namespace::WledPreferences;

    const FIELDS: &'static [&'static str] = &[
        "wled_preferred_mode",
        "realtime_gamma_enabled",
        "force_max_brightness",
        "realtime_dmx_mode",
        "start_universe_setting",
        "dmx_address_start",
        "inactivity_timeout",
    ];

    const PERMITTED: &'static [&'static str] = Self::FIELDS;

    fn check(&mut self) -> Result<(), ValidationError> {
        let ns = Self::NAMESPACE;
        let ranged = [
            ("start_universe_setting", &self.start_universe_setting, 1, 63_999),
            ("dmx_address_start", &self.dmx_address_start, 1, 512),
            ("inactivity_timeout", &self.inactivity_timeout, 1, 255),
        ];
        for (name, pref, min, max) in ranged {
            if let Some(value) = pref.as_ref().and_then(|p| p.setting) {
                check_range(ns, &format!("{}.setting", name), value, min, max)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(value: Value) -> Fragment {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_core_defaults_fill_every_field() {
        let defaults = defaults::<CoreConfig>();
        for field in CoreConfig::FIELDS {
            assert!(defaults.contains_key(*field), "missing default for {field}");
        }
        assert_eq!(defaults["port"], json!(8888));
    }

    #[test]
    fn test_permitted_is_subset_of_fields() {
        fn assert_subset<S: NamespaceSchema>() {
            for key in S::PERMITTED {
                assert!(S::FIELDS.contains(key), "{key} is permitted but not declared");
            }
        }
        assert_subset::<CoreConfig>();
        assert_subset::<AudioConfig>();
        assert_subset::<MelbanksConfig>();
        assert_subset::<WledPreferences>();
    }

    #[test]
    fn test_core_rejects_out_of_range_brightness() {
        let err = apply::<CoreConfig>(&fragment(json!({"global_brightness": 1.5}))).unwrap_err();
        assert_eq!(err.path, "global_brightness");
        assert!(err.reason.contains("outside the allowed range"));
    }

    #[test]
    fn test_core_clamps_visualisation_fps() {
        let out = apply::<CoreConfig>(&fragment(json!({"visualisation_fps": 0}))).unwrap();
        assert_eq!(out["visualisation_fps"], json!(1));
    }

    #[test]
    fn test_core_rejects_undeclared_field() {
        let err = apply::<CoreConfig>(&fragment(json!({"theme": "dark"}))).unwrap_err();
        assert_eq!(err.path, "theme");
    }

    #[test]
    fn test_audio_fft_size_must_be_power_of_two() {
        let err = apply::<AudioConfig>(&fragment(json!({"fft_size": 3000}))).unwrap_err();
        assert_eq!(err.path, "fft_size");
        assert_eq!(err.reason, "must be a power of two");
    }

    #[test]
    fn test_audio_rejects_unknown_pitch_method() {
        let err = apply::<AudioConfig>(&fragment(json!({"pitch_method": "guess"}))).unwrap_err();
        assert_eq!(err.path, "pitch_method");
    }

    #[test]
    fn test_melbanks_frequencies_must_ascend() {
        let err = apply::<MelbanksConfig>(&fragment(json!({"max_frequencies": [350, 200]})))
            .unwrap_err();
        assert_eq!(err.path, "max_frequencies.1");
    }

    #[test]
    fn test_wled_preferences_stay_partial() {
        let out = apply::<WledPreferences>(&fragment(json!({
            "inactivity_timeout": {"setting": 5}
        })))
        .unwrap();
        assert_eq!(out, fragment(json!({"inactivity_timeout": {"setting": 5}})));
    }

    #[test]
    fn test_wled_preference_ranges() {
        let err = apply::<WledPreferences>(&fragment(json!({
            "dmx_address_start": {"setting": 600, "user_set": true}
        })))
        .unwrap_err();
        assert_eq!(err.path, "dmx_address_start.setting");
    }

    #[test]
    fn test_wled_sync_mode_names() {
        let out = apply::<WledPreferences>(&fragment(json!({
            "wled_preferred_mode": {"setting": "DDP", "user_set": true}
        })))
        .unwrap();
        assert_eq!(out["wled_preferred_mode"]["setting"], json!("DDP"));
    }
}
