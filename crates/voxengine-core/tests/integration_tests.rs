//! Integration tests for voxengine-core

use std::path::PathBuf;
use voxengine_core::core::{DiscoveredCore, LoadRequest};
use voxengine_core::{
    initialize_cores, initialize_cores_with_defaults, AccentPhrase, AudioQuery, CoreInitConfig,
    CoreLoader, EngineError, EngineResult, InferenceBackend, Mora, PhoneticUnits, RawWave, StyleId,
    MOCK_CORE_VERSION,
};

#[derive(Debug)]
struct ToneBackend {
    prosody: bool,
}

impl InferenceBackend for ToneBackend {
    fn infer(&self, units: &PhoneticUnits<'_>, _style_id: StyleId) -> anyhow::Result<RawWave> {
        let len = units.to_text().chars().count() * 1_600;
        let samples = (0..len).map(|i| (i as f32 * 0.05).sin() * 0.4).collect();
        Ok(RawWave::new(samples, 16_000))
    }

    fn accepts_prosody(&self) -> bool {
        self.prosody
    }
}

/// Loader standing in for a directory of native voice libraries
struct FixedLoader;

impl CoreLoader for FixedLoader {
    fn discover(&self, request: &LoadRequest<'_>) -> Vec<EngineResult<DiscoveredCore>> {
        assert!(!request.voicelib_dirs.is_empty());
        vec![
            Ok(DiscoveredCore {
                version: "0.14.4".to_string(),
                backend: Box::new(ToneBackend { prosody: false }),
            }),
            Err(EngineError::backend_load("libcore_cuda.so: missing runtime")),
            Ok(DiscoveredCore {
                version: "0.15.0-preview.1".to_string(),
                backend: Box::new(ToneBackend { prosody: true }),
            }),
        ]
    }
}

fn greeting() -> AudioQuery {
    let mut query = AudioQuery::new(vec![AccentPhrase::new(
        vec![
            Mora::new("コ", "o", 0.1, 5.6).with_consonant("k", 0.05),
            Mora::new("ン", "N", 0.1, 5.8),
            Mora::new("ニ", "i", 0.1, 5.9).with_consonant("n", 0.04),
            Mora::new("チ", "i", 0.1, 5.7).with_consonant("ch", 0.06),
            Mora::new("ハ", "a", 0.1, 5.5).with_consonant("w", 0.05),
        ],
        5,
    )]);
    query.output_sampling_rate = 24_000;
    query
}

#[test_log::test]
fn test_defaults_register_mock_core() {
    let cores = initialize_cores_with_defaults(&CoreInitConfig::default());
    assert_eq!(cores.manager.versions(), vec![MOCK_CORE_VERSION.to_string()]);
    assert_eq!(cores.manager.latest_version().unwrap(), MOCK_CORE_VERSION);
    assert!(cores.load_failures.is_empty());
}

#[test_log::test]
fn test_loader_cores_and_latest_selection() {
    let config =
        CoreInitConfig::from_toml_str("cpu_num_threads = 2\nvoicelib_dirs = [\"/opt/voicelib\"]")
            .unwrap();
    let cores = initialize_cores(&config, &FixedLoader);

    assert_eq!(cores.load_failures.len(), 1);
    assert_eq!(cores.settings.voicelib_dirs, vec![PathBuf::from("/opt/voicelib")]);
    assert_eq!(
        cores.manager.versions(),
        vec![
            "0.14.4".to_string(),
            "0.15.0-preview.1".to_string(),
            MOCK_CORE_VERSION.to_string()
        ]
    );
    assert_eq!(cores.manager.latest_version().unwrap(), "0.15.0-preview.1");

    let query = greeting();
    let latest = cores.manager.tts_engine(None).unwrap();
    let wave = latest.synthesize_wave(&query, StyleId(0), true).unwrap();
    assert_eq!(wave.sample_rate, 24_000);
    assert_eq!(wave.channels, 1);
    assert!(wave.duration_secs() > 0.2);

    let older = cores.manager.tts_engine(Some("0.14.4")).unwrap();
    let wave = older.synthesize_wave(&query, StyleId(1), false).unwrap();
    assert!(wave.samples.iter().any(|&s| s != 0.0));
    assert_eq!(query, greeting());
}

#[test_log::test]
fn test_without_fallback_loaded_cores_survive() {
    let config = CoreInitConfig::from_toml_str(
        "enable_mock_fallback = false\nvoicelib_dirs = [\"/opt/voicelib\"]",
    )
    .unwrap();
    let cores = initialize_cores(&config, &FixedLoader);

    assert_eq!(
        cores.manager.versions(),
        vec!["0.14.4".to_string(), "0.15.0-preview.1".to_string()]
    );
    assert_eq!(cores.load_failures.len(), 1);
    assert!(matches!(cores.load_failures[0], EngineError::BackendLoad { .. }));
    assert_eq!(cores.manager.latest_version().unwrap(), "0.15.0-preview.1");
}

#[test_log::test]
fn test_unknown_version_is_not_found() {
    let cores = initialize_cores_with_defaults(&CoreInitConfig::default());
    let err = cores.manager.tts_engine(Some("9.9.9")).unwrap_err();
    assert_eq!(err.category(), "registry");
    assert!(err.is_user_error());
    assert!(err.to_string().contains("9.9.9"));
}

#[cfg(unix)]
mod mock_bridge {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;
    use voxengine_core::audio::wav::{read_wav_bytes, to_wav_bytes};

    fn write_fixture(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..4_410 {
            let s = ((i as f32 * 0.07).sin() * 12_000.0) as i16;
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Fake synthesizer that records its preset and copies the fixture
    fn install_cli(dir: &Path) -> PathBuf {
        let fixture = dir.join("fixture.wav");
        write_fixture(&fixture);
        let cli = dir.join("run");
        std::fs::write(
            &cli,
            format!(
                "#!/bin/sh\nprintf '%s' \"$3\" > '{}'\ncp '{}' \"$1\"\n",
                dir.join("preset.txt").display(),
                fixture.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755)).unwrap();
        cli
    }

    fn mock_config(dir: &Path, cli: &Path) -> CoreInitConfig {
        CoreInitConfig::from_toml_str(&format!(
            "cpu_num_threads = 1\n[mock]\ncli_path = '{}'\ntemp_wave_path = '{}'\n",
            cli.display(),
            dir.join("temp.wav").display()
        ))
        .unwrap()
    }

    #[test_log::test]
    fn test_mock_end_to_end() {
        let dir = TempDir::new().unwrap();
        let cli = install_cli(dir.path());
        let cores = initialize_cores_with_defaults(&mock_config(dir.path(), &cli));

        let mut query = greeting();
        query.output_sampling_rate = 44_100;
        query.output_stereo = true;
        let engine = cores.manager.tts_engine(Some(MOCK_CORE_VERSION)).unwrap();
        let wave = engine.synthesize_wave(&query, StyleId(0), true).unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("preset.txt")).unwrap(), "dvd");
        assert_eq!(wave.sample_rate, 44_100);
        assert_eq!(wave.channels, 2);
        assert!(!wave.is_empty());
        // 0.2 s of source audio plus 0.2 s of padding
        assert!((wave.duration_secs() - 0.4).abs() < 0.01);

        let decoded = read_wav_bytes(&to_wav_bytes(&wave).unwrap()).unwrap();
        assert_eq!(decoded.sample_rate, 44_100);
    }

    #[test_log::test]
    fn test_mock_rejects_unknown_style() {
        let dir = TempDir::new().unwrap();
        let cli = install_cli(dir.path());
        let cores = initialize_cores_with_defaults(&mock_config(dir.path(), &cli));

        let engine = cores.manager.tts_engine(None).unwrap();
        let err = engine.synthesize_wave(&greeting(), StyleId(8), false).unwrap_err();
        assert!(matches!(err, EngineError::InvalidStyle { .. }));
        assert!(!dir.path().join("preset.txt").exists());
    }
}
