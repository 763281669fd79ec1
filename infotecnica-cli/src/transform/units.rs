//! Electrical unit conversions
//!
//! Rounding follows round-half-to-even so reports match the figures the
//! coordinator has published in previous studies.

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Current transformers are rated for 120% of their primary current
pub const CT_OVERLOAD_FACTOR: f64 = 1.2;

/// Thermal limit in kA to apparent power in MVA at nominal voltage
pub fn thermal_ka_to_mva(current_ka: f64, nominal_kv: f64) -> f64 {
    (current_ka * nominal_kv * SQRT_3).round_ties_even()
}

/// Current-transformer capacity from its primary current
pub fn ct_primary_capacity(primary_a: f64) -> f64 {
    primary_a * CT_OVERLOAD_FACTOR
}

/// Apparent power in MVA for a current in A at `kv`
pub fn apparent_power_mva(kv: f64, current_a: f64) -> f64 {
    (kv * (current_a / 1000.0) * SQRT_3).round_ties_even()
}

/// Primary tap setting in kA to whole amperes
pub fn tap_ka_to_amps(tap_ka: f64) -> i64 {
    (tap_ka * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apparent_power_reference_value() {
        assert_eq!(apparent_power_mva(220.0, 1000.0), 381.0);
    }

    #[test]
    fn test_thermal_to_mva() {
        // 1 kA at 220 kV is the same 381 MVA
        assert_eq!(thermal_ka_to_mva(1.0, 220.0), 381.0);
        assert_eq!(thermal_ka_to_mva(0.5, 154.0), 133.0);
    }

    #[test]
    fn test_ct_capacity_chain() {
        let capacity = ct_primary_capacity(1000.0);
        assert!((capacity - 1200.0).abs() < 1e-9);
        assert_eq!(apparent_power_mva(220.0, capacity), 457.0);
    }

    #[test]
    fn test_tap_ka_to_amps() {
        assert_eq!(tap_ka_to_amps(0.6), 600);
        assert_eq!(tap_ka_to_amps(0.3), 300);
        assert_eq!(tap_ka_to_amps(1.2), 1200);
    }
}
