//! Emission and absorption laws for standard-mode emitters.
//!
//! Frequencies and coefficients are in geometrical units end to end; any
//! unit conversion happens in the external units collaborator before the
//! constants land here.

/// Power-law spectrum `S(ν) = constant · ν^exponent`.
///
/// Used for both emission and opacity laws.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerLawSpectrum {
    /// Multiplicative constant.
    pub constant: f64,
    /// Frequency exponent.
    pub exponent: f64,
}

impl PowerLawSpectrum {
    /// A flat (frequency-independent) law.
    pub fn flat(constant: f64) -> Self {
        Self {
            constant,
            exponent: 0.0,
        }
    }

    /// Evaluate at a frequency.
    pub fn value(&self, nu: f64) -> f64 {
        self.constant * nu.powf(self.exponent)
    }

    /// Closed-form `∫ S dν` over `[nu1, nu2]`.
    pub fn integrate(&self, nu1: f64, nu2: f64) -> f64 {
        if self.exponent == -1.0 {
            self.constant * (nu2 / nu1).ln()
        } else {
            let p = self.exponent + 1.0;
            self.constant * (nu2.powf(p) - nu1.powf(p)) / p
        }
    }
}

/// Planck-shaped spectrum `S(ν) = scaling · ν³ / (e^{ν/T} − 1)`, with the
/// physical constants folded into `scaling` and `temperature`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlackBodySpectrum {
    /// Temperature in frequency units.
    pub temperature: f64,
    /// Overall scaling.
    pub scaling: f64,
}

impl BlackBodySpectrum {
    /// Black body at a temperature, unit scaling.
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature,
            scaling: 1.0,
        }
    }

    /// Evaluate at a frequency.
    pub fn value(&self, nu: f64) -> f64 {
        let x = nu / self.temperature;
        if x < 1e-6 {
            // Rayleigh-Jeans limit avoids catastrophic cancellation.
            self.scaling * nu * nu * self.temperature
        } else {
            self.scaling * nu * nu * nu / (x.exp() - 1.0)
        }
    }

    /// Trapezoidal `∫ S dν` over `[nu1, nu2]`.
    pub fn integrate(&self, nu1: f64, nu2: f64) -> f64 {
        const N: usize = 32;
        let dnu = (nu2 - nu1) / N as f64;
        let mut sum = 0.5 * (self.value(nu1) + self.value(nu2));
        for k in 1..N {
            sum += self.value(nu1 + dnu * k as f64);
        }
        sum * dnu
    }
}

/// An emission law: one of the supported closed-form spectra.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Spectrum {
    /// Power-law emission.
    PowerLaw(PowerLawSpectrum),
    /// Planck-shaped emission.
    BlackBody(BlackBodySpectrum),
}

impl Spectrum {
    /// Evaluate at a frequency.
    pub fn value(&self, nu: f64) -> f64 {
        match self {
            Self::PowerLaw(s) => s.value(nu),
            Self::BlackBody(s) => s.value(nu),
        }
    }

    /// `∫ S dν` over `[nu1, nu2]`.
    pub fn integrate(&self, nu1: f64, nu2: f64) -> f64 {
        match self {
            Self::PowerLaw(s) => s.integrate(nu1, nu2),
            Self::BlackBody(s) => s.integrate(nu1, nu2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_power_law_is_constant() {
        let s = PowerLawSpectrum::flat(1e-3);
        assert_eq!(s.value(1.0), 1e-3);
        assert_eq!(s.value(123.0), 1e-3);
    }

    #[test]
    fn power_law_integrates_closed_form() {
        let s = PowerLawSpectrum {
            constant: 2.0,
            exponent: 1.0,
        };
        // ∫ 2ν dν from 1 to 3 = ν² |₁³ = 8.
        assert!((s.integrate(1.0, 3.0) - 8.0).abs() < 1e-12);

        let inv = PowerLawSpectrum {
            constant: 1.0,
            exponent: -1.0,
        };
        assert!((inv.integrate(1.0, std::f64::consts::E) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn black_body_peaks_and_decays() {
        let s = BlackBodySpectrum::new(1.0);
        // Wien tail decays.
        assert!(s.value(20.0) < s.value(3.0));
        // Rayleigh-Jeans branch matches the limit form.
        let nu = 1e-8;
        let rj = nu * nu * 1.0;
        assert!((s.value(nu) - rj).abs() / rj < 1e-5);
    }

    #[test]
    fn black_body_integral_is_positive_and_monotone() {
        let s = BlackBodySpectrum::new(2.0);
        let narrow = s.integrate(1.0, 2.0);
        let wide = s.integrate(1.0, 4.0);
        assert!(narrow > 0.0);
        assert!(wide > narrow);
    }
}
