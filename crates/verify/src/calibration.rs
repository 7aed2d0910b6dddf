//! Per-topic confidence calibration
//!
//! User feedback pairs a predicted confidence with an observed satisfaction.
//! Once a topic has enough pairs, raw scores are mapped through a monotone
//! (isotonic) fit of observed against predicted.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;

use crate::error::Result;

const MIN_CALIBRATED: f32 = 25.0;
const MAX_CALIBRATED: f32 = 100.0;

/// Map a feedback rating to satisfaction in 0-1
pub fn satisfaction(rating: &str) -> f32 {
    match rating.trim().to_lowercase().as_str() {
        "helpful" | "good" | "correct" => 1.0,
        "partially_helpful" | "ok" => 0.5,
        "partially_wrong" => 0.2,
        "unhelpful" => 0.1,
        "wrong" | "bad" => 0.0,
        _ => 0.5,
    }
}

/// Pool-adjacent-violators fit of `ys` ordered by `xs`.
///
/// Returns `(x, fitted_y)` sorted by `x`, non-decreasing in `fitted_y`.
fn isotonic_fit(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut sorted: Vec<(f32, f32)> = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    // (sum, count) per pooled block
    let mut blocks: Vec<(f32, usize)> = Vec::with_capacity(sorted.len());
    for &(_, y) in &sorted {
        blocks.push((y, 1));
        while blocks.len() > 1 {
            let (s1, n1) = blocks[blocks.len() - 1];
            let (s0, n0) = blocks[blocks.len() - 2];
            if s0 / n0 as f32 <= s1 / n1 as f32 {
                break;
            }
            blocks.pop();
            if let Some(last) = blocks.last_mut() {
                *last = (s0 + s1, n0 + n1);
            }
        }
    }

    let mut fitted = Vec::with_capacity(sorted.len());
    let mut xs = sorted.iter().map(|p| p.0);
    for (sum, count) in blocks {
        let mean = sum / count as f32;
        for x in xs.by_ref().take(count) {
            fitted.push((x, mean));
        }
    }
    fitted
}

/// Fitted mapping for one topic
#[derive(Debug, Clone)]
pub struct CalibrationCurve {
    points: Vec<(f32, f32)>,
}

impl CalibrationCurve {
    /// Fit from `(predicted, observed)` pairs on the 0-100 scale
    pub fn fit(points: &[(f32, f32)]) -> Self {
        Self { points: isotonic_fit(points) }
    }

    /// Fitted value at the nearest predicted score, clamped to 25-100
    pub fn apply(&self, raw: f32) -> f32 {
        let nearest = self
            .points
            .iter()
            .min_by(|a, b| (a.0 - raw).abs().total_cmp(&(b.0 - raw).abs()));
        match nearest {
            Some(&(_, fitted)) => fitted.clamp(MIN_CALIBRATED, MAX_CALIBRATED),
            None => raw,
        }
    }
}

/// Collects feedback and adjusts raw confidence per topic
pub struct Calibrator {
    observations: RwLock<HashMap<String, Vec<(f32, f32)>>>,
    min_points: usize,
}

impl Calibrator {
    pub fn new(min_points: usize) -> Self {
        Self {
            observations: RwLock::new(HashMap::new()),
            min_points,
        }
    }

    /// Load observations saved as `{topic: [[predicted, observed], ...]}`.
    ///
    /// Observed satisfaction is stored on the 0-1 scale and lifted to 0-100.
    pub fn load(path: impl AsRef<Path>, min_points: usize) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let parsed: HashMap<String, Vec<(f32, f32)>> = serde_json::from_str(&raw)?;
        let observations = parsed
            .into_iter()
            .map(|(topic, pairs)| {
                let scaled = pairs
                    .into_iter()
                    .map(|(p, o)| (p, o * 100.0))
                    .collect();
                (topic, scaled)
            })
            .collect::<HashMap<_, _>>();
        tracing::info!(topics = observations.len(), "Loaded calibration data");
        Ok(Self {
            observations: RwLock::new(observations),
            min_points,
        })
    }

    /// Write observations back in the format [`Calibrator::load`] reads
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot: HashMap<String, Vec<(f32, f32)>> = self
            .observations
            .read()
            .iter()
            .map(|(topic, pairs)| {
                (topic.clone(), pairs.iter().map(|&(p, o)| (p, o / 100.0)).collect())
            })
            .collect();
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }

    /// Record one piece of feedback for `topic`
    pub fn record(&self, topic: &str, predicted: f32, rating: &str) {
        let observed = satisfaction(rating) * 100.0;
        self.observations
            .write()
            .entry(topic.to_string())
            .or_default()
            .push((predicted, observed));
    }

    pub fn observation_count(&self, topic: &str) -> usize {
        self.observations.read().get(topic).map_or(0, Vec::len)
    }

    /// Calibrated score, or `raw` while the topic has too little feedback
    pub fn adjust(&self, topic: &str, raw: f32) -> f32 {
        let observations = self.observations.read();
        match observations.get(topic) {
            Some(points) if points.len() >= self.min_points => {
                let calibrated = CalibrationCurve::fit(points).apply(raw);
                tracing::debug!(topic, raw, calibrated, "Calibrated confidence");
                calibrated
            }
            _ => raw,
        }
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isotonic_pools_violations() {
        let fitted = isotonic_fit(&[(10.0, 30.0), (20.0, 10.0), (30.0, 50.0)]);
        assert_eq!(fitted, vec![(10.0, 20.0), (20.0, 20.0), (30.0, 50.0)]);

        let fitted = isotonic_fit(&[(50.0, 90.0), (60.0, 70.0), (70.0, 50.0)]);
        assert!(fitted.iter().all(|&(_, y)| (y - 70.0).abs() < 1e-4));
    }

    #[test]
    fn test_fit_is_monotone() {
        let points: Vec<(f32, f32)> = (0..30)
            .map(|i| (i as f32 * 3.0, if i % 3 == 0 { 20.0 } else { i as f32 * 2.5 }))
            .collect();
        let fitted = isotonic_fit(&points);
        assert!(fitted.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_adjust_waits_for_min_points() {
        let calibrator = Calibrator::new(3);
        calibrator.record("disease", 90.0, "wrong");
        calibrator.record("disease", 90.0, "bad");
        assert_eq!(calibrator.adjust("disease", 90.0), 90.0);

        calibrator.record("disease", 90.0, "partially_wrong");
        let adjusted = calibrator.adjust("disease", 90.0);
        assert!(adjusted < 90.0);
        assert!(adjusted >= MIN_CALIBRATED);
        assert_eq!(calibrator.adjust("chemical", 80.0), 80.0);
    }

    #[test]
    fn test_satisfaction_map() {
        assert_eq!(satisfaction("Helpful"), 1.0);
        assert_eq!(satisfaction("partially_wrong"), 0.2);
        assert_eq!(satisfaction("something else"), 0.5);
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, r#"{"chemical": [[80.0, 1.0], [60.0, 0.5]]}"#).unwrap();

        let calibrator = Calibrator::load(&path, 2).unwrap();
        assert_eq!(calibrator.observation_count("chemical"), 2);
        assert_eq!(calibrator.adjust("chemical", 79.0), 100.0);
        assert_eq!(calibrator.adjust("chemical", 61.0), 50.0);

        calibrator.record("chemical", 70.0, "ok");
        calibrator.save(&path).unwrap();
        let reloaded = Calibrator::load(&path, 2).unwrap();
        assert_eq!(reloaded.observation_count("chemical"), 3);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Calibrator::load(dir.path().join("nope.json"), 20).is_err());
    }
}
