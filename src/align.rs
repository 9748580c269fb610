/// Truncates every series to the most recent N entries, N being the shortest
/// non-empty length.
///
/// If no series has data, or N < 2, the input is returned unchanged and the
/// statistics layer falls back to its zero matrix.
pub fn align_series(series: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(n) = series.iter().map(Vec::len).filter(|&len| len > 0).min() else {
        return series.to_vec();
    };
    if n < 2 {
        return series.to_vec();
    }

    series
        .iter()
        .map(|s| s[s.len().saturating_sub(n)..].to_vec())
        .collect()
}

/// Length every series would have after alignment (0 when alignment is not possible).
pub fn aligned_len(series: &[Vec<f64>]) -> usize {
    match series.iter().map(Vec::len).filter(|&len| len > 0).min() {
        Some(n) if n >= 2 => n,
        _ => 0,
    }
}
