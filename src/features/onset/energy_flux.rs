//! Energy flux onset strength
//!
//! Half-wave rectified frame-to-frame energy difference:
//! `flux[0] = 0`, `flux[n] = max(0, E[n] - E[n-1])`.
//!
//! # Reference
//!
//! Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
//! A Tutorial on Onset Detection in Music Signals.
//! *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.

/// Compute the energy flux of a frame energy envelope
///
/// # Arguments
///
/// * `energies` - Frame energies
///
/// # Returns
///
/// Onset strength per frame (same length as input)
pub fn energy_flux(energies: &[f64]) -> Vec<f64> {
    if energies.is_empty() {
        return Vec::new();
    }

    let mut flux = Vec::with_capacity(energies.len());
    flux.push(0.0);
    flux.extend(energies.windows(2).map(|w| (w[1] - w[0]).max(0.0)));
    flux
}
