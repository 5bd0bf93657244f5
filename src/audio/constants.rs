/// Analysis and display constants shared by the audio and render sides

/// Floor for dB conversion, prevents log(0)
pub const SPECTRUM_FLOOR_DB: f32 = -120.0;

/// Canonical frequency gridline positions in Hz
pub const FREQUENCY_MARKERS: [f32; 11] = [
    20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0, 30000.0,
];

/// dB gridline step for narrow and wide visible ranges
pub const NARROW_DB_STEP: f32 = 2.0;
pub const WIDE_DB_STEP: f32 = 6.0;

/// Three times the visible dB span below this uses the narrow step
pub const NARROW_DB_SPAN_LIMIT: f32 = 72.0;

/// Stereo image rotation so that mono content is vertical
pub const GONIOMETER_ROTATION_DEG: f32 = -45.0;

/// Floor for the goniometer auto-gain, the expansion itself is unbounded
pub const MIN_AUTO_GAIN: f32 = 0.01;

// === HELPER FUNCTIONS ===

/// Convert linear amplitude to dB, floored at [`SPECTRUM_FLOOR_DB`]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain > 1e-6 {
        (20.0 * gain.log10()).max(SPECTRUM_FLOOR_DB)
    } else {
        SPECTRUM_FLOOR_DB
    }
}

/// Convert dB back to linear amplitude
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// dB gridline step for a visible range
pub fn db_grid_step(low_db: f32, high_db: f32) -> f32 {
    if (high_db - low_db) * 3.0 < NARROW_DB_SPAN_LIMIT {
        NARROW_DB_STEP
    } else {
        WIDE_DB_STEP
    }
}
