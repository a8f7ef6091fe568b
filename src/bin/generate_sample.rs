use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;

use collecte_stats::data::loader::write_json;
use collecte_stats::data::model::{CategoryTotals, ColumnLayout, PeriodAggregate, SiteAggregate};
use collecte_stats::data::period::{dataset_year_for, MONTHS};

const SITES: [(&str, f64); 4] = [
    ("Pépinière", 1.4),
    ("Sanssac", 1.0),
    ("St Germain", 0.8),
    ("Polignac", 0.6),
];

const CATEGORIES: [(&str, f64, &[&str]); 6] = [
    ("MEUBLES", 420.0, &["Chaises", "Tables", "Armoires"]),
    ("ELECTRO", 260.0, &["Gros électroménager", "Petit électroménager"]),
    ("TEXTILE", 180.0, &["Vêtements", "Linge de maison"]),
    ("LIVRES", 90.0, &["Romans", "BD", "Revues"]),
    ("JOUETS", 70.0, &["Peluches", "Jeux de société"]),
    ("VAISSELLE", 110.0, &["Verres", "Assiettes"]),
];

const FINAL_FLUXES: [(&str, f64); 3] = [
    ("MASSICOT", 150.0),
    ("DEMANTELEMENT", 95.0),
    ("DECHETS ULTIMES", 60.0),
];

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    /// Uniform in `[1 - spread, 1 + spread)`.
    fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + spread * (2.0 * self.next_f64() - 1.0)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn layout() -> ColumnLayout {
    ColumnLayout::new(
        CATEGORIES.iter().map(|(name, _, _)| *name),
        FINAL_FLUXES.iter().map(|(name, _)| *name),
    )
}

/// One half-year aggregate over `months` (indices into the calendar).
fn half_year(
    rng: &mut SimpleRng,
    months: std::ops::Range<usize>,
    start: NaiveDate,
    end: NaiveDate,
) -> PeriodAggregate {
    let layout = layout();
    let mut agg = PeriodAggregate::new(layout.clone());

    for (site, scale) in SITES {
        let mut monthly = BTreeMap::new();
        for info in &MONTHS[months.clone()] {
            let mut pairs = Vec::with_capacity(CATEGORIES.len() + FINAL_FLUXES.len());
            for (name, base, _) in CATEGORIES {
                pairs.push((name, round1(base * scale * rng.jitter(0.35))));
            }
            for (name, base) in FINAL_FLUXES {
                pairs.push((name, round1(base * scale * rng.jitter(0.25))));
            }
            let entry = CategoryTotals::from_columns(&layout, pairs);
            monthly.insert(info.key.to_string(), entry);
        }
        agg = agg.with_site(site, SiteAggregate::from_monthly(&layout, monthly));
    }

    agg = agg.with_months_order(MONTHS[months].iter().map(|m| m.key));
    agg.dataset_year = Some(dataset_year_for(start, end));
    agg.date_start = Some(start);
    agg.date_end = Some(end);
    agg.date_range_label = Some(format!(
        "DU {} au {}",
        start.format("%d/%m/%Y"),
        end.format("%d/%m/%Y")
    ));
    agg
}

fn write_category_rows(rng: &mut SimpleRng, path: &Path) -> Result<usize> {
    let mut categories = Vec::new();
    let mut subcategories = Vec::new();
    let mut totals = Vec::new();
    for (category, base, subs) in CATEGORIES {
        for sub in subs {
            categories.push(category);
            subcategories.push(*sub);
            totals.push(round1(base * 12.0 / subs.len() as f64 * rng.jitter(0.5)));
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("categorie", DataType::Utf8, false),
        Field::new("sous_categorie", DataType::Utf8, false),
        Field::new("total", DataType::Float64, false),
    ]));
    let rows = totals.len();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(categories)),
            Arc::new(StringArray::from(subcategories)),
            Arc::new(Float64Array::from(totals)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(rows)
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).context("invalid sample date");
    let first = half_year(&mut rng, 0..6, ymd(2025, 1, 1)?, ymd(2025, 6, 30)?);
    let second = half_year(&mut rng, 6..12, ymd(2025, 7, 1)?, ymd(2025, 12, 31)?);

    write_json(&first, Some(Path::new("sample_s1.json")))?;
    write_json(&second, Some(Path::new("sample_s2.json")))?;
    let rows = write_category_rows(&mut rng, Path::new("sample_categories.parquet"))?;

    println!(
        "Wrote {} sites x 2 half-years to sample_s1.json / sample_s2.json",
        SITES.len()
    );
    println!("Wrote {rows} category rows to sample_categories.parquet");
    Ok(())
}
