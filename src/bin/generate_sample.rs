use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Cathodic sweep: a sloped baseline with negative (reduction) current valleys.
fn generate_trace(
    potentials: &[f64],
    valleys: &[(f64, f64, f64)],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    potentials
        .iter()
        .map(|&e| {
            let baseline = 2.0e-7 * e;
            let signal: f64 = valleys
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(e, mu, sigma, -amp))
                .sum();
            baseline + signal + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Instrument-style text export: metadata block, blank line, tab-separated
/// header, blank line, data.
fn export_text(potentials: &[f64], columns: &[(String, Vec<f64>)], scan: usize) -> String {
    let mut out = String::new();
    out.push_str("Cyclic Voltammetry\n");
    out.push_str("Instrument Model:  CHI660E\n");
    let _ = writeln!(out, "File: scan_{scan:02}.bin");
    out.push_str("Init E (V) = 0.6\nLow E (V) = -0.2\nScan Rate (V/s) = 0.05\n");
    out.push('\n');

    out.push_str("Potential/V");
    for (name, _) in columns {
        let _ = write!(out, "\t{name}");
    }
    out.push_str("\n\n");

    for (row, e) in potentials.iter().enumerate() {
        let _ = write!(out, "{e:.3}");
        for (_, values) in columns {
            let _ = write!(out, "\t{:.4e}", values[row]);
        }
        out.push('\n');
    }
    out
}

fn write_parquet(path: &Path, potentials: &[f64], columns: &[(String, Vec<f64>)]) {
    let mut fields = vec![Field::new("Potential/V", DataType::Float64, false)];
    let mut arrays: Vec<Arc<dyn arrow::array::Array>> =
        vec![Arc::new(Float64Array::from(potentials.to_vec()))];
    for (name, values) in columns {
        fields.push(Field::new(name, DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from(values.clone())));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let out_dir = Path::new("sample_data");
    std::fs::create_dir_all(out_dir).expect("Failed to create sample_data/");

    // Potential sweep 0.6 V → -0.2 V, 1 mV steps
    let potentials: Vec<f64> = (0..=800).map(|i| 0.6 - i as f64 * 0.001).collect();

    // (centre V, width V, depth A) per electrode
    let electrodes: [(&str, Vec<(f64, f64, f64)>); 3] = [
        ("i1/A", vec![(0.21, 0.03, 2.0e-6), (0.02, 0.04, 1.2e-6)]),
        ("i2/A", vec![(0.18, 0.03, 1.5e-6)]),
        ("i3/A", vec![(0.25, 0.02, 8.0e-7), (0.05, 0.05, 2.2e-6)]),
    ];
    let concentrations = [0.5, 1.0, 2.0];

    for (scan, &conc) in concentrations.iter().enumerate() {
        let columns: Vec<(String, Vec<f64>)> = electrodes
            .iter()
            .map(|(name, valleys)| {
                let scaled: Vec<_> = valleys
                    .iter()
                    .map(|&(mu, sigma, amp)| (mu, sigma, amp * conc))
                    .collect();
                (name.to_string(), generate_trace(&potentials, &scaled, 3.0e-8, &mut rng))
            })
            .collect();

        let path = out_dir.join(format!("cv_scan_{scan:02}.txt"));
        std::fs::write(&path, export_text(&potentials, &columns, scan))
            .expect("Failed to write text export");
        println!("Wrote {}", path.display());

        if scan == 0 {
            let pq = out_dir.join("cv_scan_00_table.parquet");
            write_parquet(&pq, &potentials, &columns);
            println!("Wrote {}", pq.display());
        }
    }

    println!(
        "Generated {} scans ({} points each); run with separator \"tab\", direction \"valley\"",
        concentrations.len(),
        potentials.len()
    );
}
