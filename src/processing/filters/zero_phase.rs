// src/processing/filters/zero_phase.rs
//! Forward-backward application of second-order section cascades

use super::Biquad;

/// Direct form II transposed state of one section
pub type SectionState = [f64; 2];

/// Default odd-extension length for a cascade of `sections`
pub fn default_padlen(sections: usize) -> usize {
    3 * (2 * sections + 1)
}

/// Steady-state initial conditions for a unit step input.
///
/// Each section's state is scaled by the DC gain of the sections before it.
pub fn sosfilt_zi(sections: &[Biquad]) -> Vec<SectionState> {
    let mut scale = 1.0;
    sections
        .iter()
        .map(|s| {
            let gain = s.dc_gain();
            let z2 = s.b[2] - s.a[2] * gain;
            let z1 = s.b[1] - s.a[1] * gain + z2;
            let zi = [scale * z1, scale * z2];
            scale *= gain;
            zi
        })
        .collect()
}

/// Run the cascade over `x` in place, updating `state`
pub fn sosfilt_in_place(sections: &[Biquad], x: &mut [f64], state: &mut [SectionState]) {
    for (s, z) in sections.iter().zip(state.iter_mut()) {
        let [b0, b1, b2] = s.b;
        let [_, a1, a2] = s.a;
        let [mut z1, mut z2] = *z;
        for v in x.iter_mut() {
            let input = *v;
            let y = b0 * input + z1;
            z1 = b1 * input - a1 * y + z2;
            z2 = b2 * input - a2 * y;
            *v = y;
        }
        *z = [z1, z2];
    }
}

/// Run the cascade over `x` from rest
pub fn sosfilt(sections: &[Biquad], x: &[f64]) -> Vec<f64> {
    let mut y = x.to_vec();
    let mut state = vec![[0.0; 2]; sections.len()];
    sosfilt_in_place(sections, &mut y, &mut state);
    y
}

/// `x` padded with `padlen` samples of odd reflection about each end point
pub fn odd_extension(x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    if n == 0 || padlen == 0 {
        return x.to_vec();
    }
    let first = x[0];
    let last = x[n - 1];

    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[n - 1 - i]));
    ext
}

/// Zero-phase filtering with the default pad length for the cascade
pub fn sosfiltfilt(sections: &[Biquad], x: &[f64]) -> Vec<f64> {
    sosfiltfilt_with_padlen(sections, x, default_padlen(sections.len()))
}

/// Zero-phase filtering: odd extension, forward pass, backward pass, trim.
///
/// Windows of fewer than 2 samples are returned unchanged; a pad longer than
/// the window shrinks to `len - 1`.
pub fn sosfiltfilt_with_padlen(sections: &[Biquad], x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    if n < 2 || sections.is_empty() {
        return x.to_vec();
    }
    let padlen = padlen.min(n - 1);

    let zi = sosfilt_zi(sections);
    let mut y = odd_extension(x, padlen);

    let x0 = y[0];
    let mut state: Vec<SectionState> = zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect();
    sosfilt_in_place(sections, &mut y, &mut state);

    y.reverse();
    let y0 = y[0];
    let mut state: Vec<SectionState> = zi.iter().map(|z| [z[0] * y0, z[1] * y0]).collect();
    sosfilt_in_place(sections, &mut y, &mut state);
    y.reverse();

    y[padlen..padlen + n].to_vec()
}
