use engine_atlas::rng::SimpleRng;

/// One synthetic engine family: base values jittered per model year.
struct Family {
    make: &'static str,
    engine_type: &'static str,
    layout: &'static str,
    cylinders: u32,
    bore_mm: f64,
    stroke_mm: f64,
    hp: f64,
    accel_s: f64,
    fuel_l: f64,
    co2: f64,
}

const FAMILIES: &[Family] = &[
    Family { make: "Ford", engine_type: "Gasoline", layout: "Inline", cylinders: 4, bore_mm: 80.0, stroke_mm: 70.0, hp: 95.0, accel_s: 13.5, fuel_l: 7.8, co2: 185.0 },
    Family { make: "Ford", engine_type: "Gasoline", layout: "V", cylinders: 8, bore_mm: 101.6, stroke_mm: 88.0, hp: 290.0, accel_s: 6.2, fuel_l: 14.5, co2: 340.0 },
    Family { make: "Audi", engine_type: "Gasoline", layout: "Inline", cylinders: 5, bore_mm: 81.0, stroke_mm: 86.4, hp: 170.0, accel_s: 8.1, fuel_l: 9.4, co2: 224.0 },
    Family { make: "Audi", engine_type: "Diesel", layout: "Inline", cylinders: 4, bore_mm: 81.0, stroke_mm: 95.5, hp: 140.0, accel_s: 9.5, fuel_l: 5.4, co2: 142.0 },
    Family { make: "BMW", engine_type: "Gasoline", layout: "Inline", cylinders: 6, bore_mm: 84.0, stroke_mm: 89.6, hp: 231.0, accel_s: 6.9, fuel_l: 10.2, co2: 244.0 },
    Family { make: "Subaru", engine_type: "Gasoline", layout: "Boxer", cylinders: 4, bore_mm: 92.0, stroke_mm: 75.0, hp: 150.0, accel_s: 9.2, fuel_l: 8.9, co2: 209.0 },
];

const MODELS: &[&str] = &["Alpha", "Grand", "Sport", "Touring"];
const YEARS: &[i64] = &[1965, 1975, 1985, 1995, 2005, 2015];

fn main() {
    let mut rng = SimpleRng::new(42);
    let output_path = "engines_sample.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");

    // Header uses the source dataset's raw spellings (including the "Modle"
    // typo) so the sample exercises the normalizer's repairs.
    writer
        .write_record([
            "Make",
            "Modle",
            "Year_from",
            "Year_to",
            "Engine type",
            "Cylinder layout",
            "Number of cylinders",
            "Cylinder bore and stroke cycle (mm)",
            "Capacity cm3",
            "Engine hp",
            "Acceleration 0-100 km/h (s)",
            "Mixed fuel consumption per 100 km l",
            "CO2 emissions g/km",
        ])
        .expect("Failed to write header");

    let mut rows = 0usize;
    for family in FAMILIES {
        for (m_idx, &model) in MODELS.iter().enumerate() {
            for &year in YEARS {
                // Engines grow slightly stronger and cleaner over the decades.
                let age = (year - 1965) as f64 / 50.0;
                let hp = family.hp * (1.0 + 0.35 * age) + rng.gauss(0.0, family.hp * 0.04);
                let accel = (family.accel_s * (1.0 - 0.20 * age) + rng.gauss(0.0, 0.3)).max(2.5);
                let fuel = (family.fuel_l * (1.0 - 0.15 * age) + rng.gauss(0.0, 0.4)).max(2.0);
                let co2 = (family.co2 * (1.0 - 0.25 * age) + rng.gauss(0.0, 8.0)).max(40.0);

                // A slice of rows mimic the source's dirty cells.
                let hp_cell = if rng.next_f64() < 0.06 {
                    "N/A".to_string()
                } else {
                    format!("{hp:.0}")
                };
                let bore_stroke = if m_idx % 2 == 0 {
                    format!("{:.1}x{:.1}", family.bore_mm, family.stroke_mm)
                } else {
                    // Leave geometry blank; capacity lets displacement fall back.
                    String::new()
                };
                let capacity = if bore_stroke.is_empty() {
                    let litres = std::f64::consts::PI
                        * (family.bore_mm / 2.0).powi(2)
                        * family.stroke_mm
                        * family.cylinders as f64
                        / 1_000_000.0;
                    format!("{:.0}", litres * 1000.0)
                } else {
                    String::new()
                };

                let year_from = year.to_string();
                let year_to = (year + 9).to_string();
                let cylinders = family.cylinders.to_string();
                let accel_cell = format!("{accel:.1}");
                let fuel_cell = format!("{fuel:.1}");
                let co2_cell = format!("{co2:.0}");
                writer
                    .write_record([
                        family.make,
                        model,
                        year_from.as_str(),
                        year_to.as_str(),
                        family.engine_type,
                        family.layout,
                        cylinders.as_str(),
                        bore_stroke.as_str(),
                        capacity.as_str(),
                        hp_cell.as_str(),
                        accel_cell.as_str(),
                        fuel_cell.as_str(),
                        co2_cell.as_str(),
                    ])
                    .expect("Failed to write row");
                rows += 1;
            }
        }
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {rows} engine rows to {output_path}");
}
