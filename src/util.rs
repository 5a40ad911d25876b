pub fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;
    Some(variance.sqrt())
}

/// Spread of a run of session scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub best: u32,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[u32]) -> Option<Self> {
        let data: Vec<f64> = scores.iter().map(|s| *s as f64).collect();
        Some(Self {
            mean: mean(&data)?,
            std_dev: std_dev(&data)?,
            best: scores.iter().copied().max()?,
        })
    }
}
