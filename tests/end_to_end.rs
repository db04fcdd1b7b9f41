use approx::assert_abs_diff_eq;
use std::f64::consts::PI;

use batch_fft::normalize::{Output, Scale};
use batch_fft::record::JsonLines;
use batch_fft::window::Window;
use batch_fft::{analyze, Axis, Body, Config, Header, Identity, Record, SensorType};

const FS: f64 = 1000.;

/// `nblocks` blocks of `bodies * per_body` samples, a 125 Hz sine on X, 250 Hz on Y and a
/// constant on Z.
fn stream(sensor_type: SensorType, nblocks: u32, bodies: u32, per_body: usize) -> Vec<Record> {
    let mut recs = Vec::new();
    let mut t = 0usize;

    for block_index in 0..nblocks {
        recs.push(Record::Header(Header {
            sensor_type,
            instance: 0,
            block_index,
            sample_rate_hz: FS,
            scale_factor: 2.,
        }));

        for seq in 0..bodies {
            let mut x = Vec::new();
            let mut y = Vec::new();
            let mut z = Vec::new();

            for _ in 0..per_body {
                let s = t as f64 / FS;
                x.push((2. * PI * 125. * s).sin());
                y.push(0.5 * (2. * PI * 250. * s).sin());
                z.push(1.);
                t += 1;
            }

            recs.push(Record::Body(Body {
                block_index,
                seq,
                x,
                y,
                z,
            }));
        }
    }

    recs
}

fn config(window: Window, overlap: bool, output: Output, scale: Scale) -> Config {
    Config {
        window,
        overlap,
        output,
        scale,
        condition: None,
    }
}

#[test]
fn four_blocks_psd_db() {
    let a = analyze(
        stream(SensorType::Accel, 4, 8, 32),
        &config(Window::Hanning, false, Output::Psd, Scale::Db),
    );

    assert_eq!(a.blocks, 4);
    assert_eq!(a.overlaps, 0);
    assert_eq!(a.diagnostics.total(), 0);
    assert_eq!(a.spectra.len(), 3);

    for s in &a.spectra {
        assert_eq!(s.identity, Identity::new(SensorType::Accel, 0));
        assert_eq!(s.label, "Accel[0]");
        assert_eq!(s.count, 4);
        assert_eq!(s.block_len, 256);
        assert_eq!(s.unit, "PSD dB m^2/s^4/Hz");

        assert_eq!(s.frequencies.len(), 129);
        assert_eq!(s.frequencies[0], 0.);
        assert_eq!(s.frequencies[128], 500.);

        assert_eq!(s.values.len(), 129);
        assert_eq!(s.values[0], f64::NEG_INFINITY);
        assert_eq!(s.values[128], f64::NEG_INFINITY);
    }

    let x = &a.spectra[0];
    assert_eq!(x.axis, Axis::X);
    let peak = (1..128)
        .max_by(|i, j| x.values[*i].partial_cmp(&x.values[*j]).unwrap())
        .unwrap();
    assert_eq!(x.frequencies[peak], 125.);
}

#[test]
fn sine_power() {
    // a sine of amplitude a has power a^2 / 2, spread over the window's bandwidth.
    let a = analyze(
        stream(SensorType::Accel, 4, 8, 32),
        &config(Window::Hanning, false, Output::Psd, Scale::Linear),
    );

    let x = &a.spectra[0];
    let df = x.frequencies[1];
    let power: f64 = x.values.iter().sum::<f64>() * df;

    // amplitude 1 / scale factor 2.
    assert_abs_diff_eq!(power, 0.25 * 0.25 * 2., epsilon = 1e-3);
}

#[test]
fn gyro_in_degrees() {
    let c = config(Window::Rectangular, false, Output::Lsd, Scale::Linear);
    let a = analyze(stream(SensorType::Gyro, 1, 4, 64), &c);
    let g = a.spectra[0].values[32];

    let a = analyze(stream(SensorType::Accel, 1, 4, 64), &c);
    let l = a.spectra[0].values[32];

    assert_abs_diff_eq!(g, l * 180. / PI, epsilon = 1e-9);
    assert_eq!(a.spectra[0].unit, "LSD m/s^2/sqrt(Hz)");
}

#[test]
fn overlap_adds_blocks() {
    let a = analyze(
        stream(SensorType::Accel, 4, 8, 32),
        &config(Window::Blackman, true, Output::Psd, Scale::Db),
    );

    assert_eq!(a.blocks, 4);
    assert_eq!(a.overlaps, 3);
    assert_eq!(a.spectra[0].count, 7);
    assert_eq!(a.diagnostics.invalid_overlaps, 0);
}

#[test]
fn gap_keeps_partial_block() {
    let mut recs = stream(SensorType::Accel, 2, 4, 16);

    // drop seq 1 of the first block, seq 2 is a gap and seq 3 is dropped.
    recs.remove(2);

    let a = analyze(
        recs,
        &config(Window::Hanning, true, Output::Psd, Scale::Linear),
    );

    assert_eq!(a.diagnostics.sequence_gaps, 1);
    assert_eq!(a.diagnostics.dropped_records, 1);

    // the partial block has another length, so no overlap can be made.
    assert_eq!(a.diagnostics.invalid_overlaps, 1);
    assert_eq!(a.overlaps, 0);

    let labels = a.spectra.iter().map(|s| s.label.as_str()).collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec![
            "Accel[0] (N=16)",
            "Accel[0] (N=16)",
            "Accel[0] (N=16)",
            "Accel[0] (N=64)",
            "Accel[0] (N=64)",
            "Accel[0] (N=64)",
        ]
    );
}

#[test]
fn several_sensors() {
    let mut recs = stream(SensorType::Gyro, 2, 2, 32);
    recs.extend(stream(SensorType::Accel, 3, 2, 32));

    let a = analyze(recs, &Config::default());
    assert_eq!(a.spectra.len(), 6);
    assert_eq!(a.spectra[0].label, "Accel[0]");
    assert_eq!(a.spectra[0].count, 3);
    assert_eq!(a.spectra[3].label, "Gyro[0]");
    assert_eq!(a.spectra[3].count, 2);
    assert_eq!(a.spectra[3].unit, "PSD dB d^2/s^2/Hz");
}

#[test]
fn from_json_lines() {
    let mut input = String::new();
    for r in stream(SensorType::Accel, 2, 2, 8) {
        input.push_str(&serde_json::to_string(&r).unwrap());
        input.push('\n');
    }

    let records = JsonLines::new(input.as_bytes(), None);
    let a = analyze(records, &Config::default());

    assert_eq!(a.records, 6);
    assert_eq!(a.blocks, 2);
    assert_eq!(a.spectra[0].frequencies.len(), 9);
}
