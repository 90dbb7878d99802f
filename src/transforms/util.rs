use ndarray::{Array, Axis, Dimension, Zip};

/// Normalised 1D Gaussian taps covering three standard deviations,
/// truncated to at most `max_radius` taps on each side.
pub(crate) fn gaussian_kernel(sigma: f32, max_radius: usize) -> Vec<f32> {
    if sigma <= 0.0 || max_radius == 0 {
        return vec![1.0];
    }
    let limit = max_radius.min(i32::MAX as usize) as f32;
    let radius = (sigma * 3.0).ceil().clamp(1.0, limit) as i32;
    let taps = (-radius..=radius)
        .map(|offset| {
            let offset = offset as f32;
            (-(offset * offset) / (2.0 * sigma * sigma)).exp()
        })
        .collect::<Vec<_>>();
    let total = taps.iter().sum::<f32>().max(f32::EPSILON);
    taps.into_iter().map(|tap| tap / total).collect()
}

/// Separable Gaussian over `axes`, in place, repeating edge samples.
/// Axes of length one are left alone.
pub(crate) fn gaussian_blur<D: Dimension>(volume: &mut Array<f32, D>, axes: &[usize], sigma: f32) {
    let longest = axes.iter().map(|&axis| volume.len_of(Axis(axis))).max().unwrap_or(1);
    let kernel = gaussian_kernel(sigma, longest.saturating_sub(1));
    let radius = (kernel.len() / 2) as isize;
    for &axis in axes {
        let last = volume.len_of(Axis(axis)) as isize - 1;
        if last < 1 {
            continue;
        }
        Zip::from(volume.lanes_mut(Axis(axis))).par_for_each(|mut lane| {
            let source = lane.to_vec();
            for (index, value) in lane.iter_mut().enumerate() {
                *value = kernel
                    .iter()
                    .enumerate()
                    .map(|(tap, weight)| {
                        let at = (index as isize + tap as isize - radius).clamp(0, last);
                        source[at as usize] * weight
                    })
                    .sum();
            }
        });
    }
}
