//! Log-to-linear sample decode table
//!
//! The DMA stream carries 8-bit companded samples: sign in bit 0, point on
//! chord in bits 4-1, chord select in bits 7-5. Each of the eight chords
//! doubles the step size of the previous one, giving a piecewise-linear
//! approximation of a logarithmic curve (the same idea as telephony µ-law).

/// One amplitude unit of the companding scheme.
///
/// The end of chord 7 sits at 247 units; scaling by `0xFFFF / (247 * 2)`
/// places full deflection just inside the signed 16-bit range.
const SCALE: i32 = 0xFFFF / (247 * 2);

/// Build the 256-entry decode table mapping sample codes to linear values.
///
/// Chord `c` starts at `(2^c - 1) * SCALE` with 16 points of
/// `2^c * SCALE / 16` each; bit 0 selects the negative half. Pure function
/// of the code, computed once at subsystem init.
pub fn log_to_linear_table() -> [i16; 256] {
    let mut table = [0i16; 256];
    for (code, entry) in table.iter_mut().enumerate() {
        let chord_select = (code as i32 & 0xE0) >> 5;
        let point_select = (code as i32 & 0x1E) >> 1;
        let sign = code & 1;

        let chord_base = ((1 << chord_select) - 1) * SCALE;
        let step_size = ((1 << chord_select) * SCALE) / 16;
        let sample = chord_base + step_size * point_select;

        *entry = if sign == 1 {
            -sample as i16
        } else {
            sample as i16
        };
    }
    table
}

/// Encode a linear sample into the companded format.
///
/// Picks the chord containing the magnitude and the nearest point below it,
/// so `decode(encode(x))` is within one chord step of `x`. Used by the demo
/// player and tests to synthesise DMA buffer contents; the emulated OS
/// normally produces this data itself.
pub fn linear_to_log(sample: i16) -> u8 {
    let sign = if sample < 0 { 1u8 } else { 0u8 };
    let mag = (sample as i32).unsigned_abs().min(247 * SCALE as u32) as i32;

    let mut chord = 0;
    while chord < 7 && mag >= ((1 << (chord + 1)) - 1) * SCALE {
        chord += 1;
    }
    let chord_base = ((1 << chord) - 1) * SCALE;
    let step_size = ((1 << chord) * SCALE) / 16;
    let point = ((mag - chord_base) / step_size).min(15);

    ((chord as u8) << 5) | ((point as u8) << 1) | sign
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_symmetry() {
        let table = log_to_linear_table();
        for code in 0..256 {
            assert_eq!(
                table[code | 1],
                -table[code & !1],
                "code {code:#04x} breaks sign symmetry"
            );
        }
    }

    #[test]
    fn test_monotonic_within_chord() {
        let table = log_to_linear_table();
        for chord in 0..8 {
            for point in 1..16 {
                let prev = table[(chord << 5) | ((point - 1) << 1)];
                let cur = table[(chord << 5) | (point << 1)];
                assert!(
                    cur >= prev,
                    "chord {chord} point {point}: {cur} < {prev}"
                );
            }
        }
    }

    #[test]
    fn test_chords_are_contiguous() {
        // Chord c ends one step below the base of chord c+1.
        let table = log_to_linear_table();
        for chord in 0..7usize {
            let last = table[(chord << 5) | (15 << 1)];
            let next_base = table[(chord + 1) << 5];
            assert!(
                next_base > last,
                "chord {chord} overlaps its successor: {last} vs {next_base}"
            );
        }
    }

    #[test]
    fn test_extremes_fit() {
        let table = log_to_linear_table();
        assert_eq!(table[0], 0);
        assert_eq!(table[1], 0, "negative zero decodes to zero");
        // Largest positive code: chord 7, point 15.
        let max = table[0xFE];
        assert!(max > 30_000 && max <= i16::MAX);
        assert_eq!(table[0xFF], -max);
    }

    #[test]
    fn test_encode_roundtrip_within_step() {
        let table = log_to_linear_table();
        for &v in &[0i16, 7, -7, 100, -100, 1000, -1000, 12_345, 32_000, -32_000] {
            let decoded = table[linear_to_log(v) as usize];
            let chord = (linear_to_log(v) >> 5) as i32;
            let step = ((1 << chord) * SCALE) / 16;
            assert!(
                (decoded as i32 - v as i32).abs() <= step.max(1),
                "roundtrip of {v} gave {decoded} (step {step})"
            );
        }
    }

    #[test]
    fn test_encode_saturates() {
        assert_eq!(linear_to_log(i16::MAX), 0xFE);
        assert_eq!(linear_to_log(i16::MIN), 0xFF);
    }
}
