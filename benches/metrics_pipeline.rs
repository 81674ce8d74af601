use criterion::{criterion_group, criterion_main, Criterion};
use phab_metrics_rust::{
    CategoricalMetrics, CovariateTable, Observation, ObservationTable, Origin, PhabPipeline,
    SiteCovariates, WideMetricTable,
};
use std::hint::black_box;

const STATIONS: &[&str] = &["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
const COVER_CODES: &[&str] = &["0", "1", "2", "3", "4"];

/// Synthetic survey: every site has fish cover, riparian vegetation, human
/// influence and bank dimensions in both zones.
fn synthetic_survey(n_sites: usize) -> (ObservationTable, CovariateTable) {
    let mut rows = Vec::new();
    let mut covariates = Vec::new();
    for s in 0..n_sites {
        let site = format!("LAKE-{:04}", s);
        for (i, station) in STATIONS.iter().enumerate() {
            let code = COVER_CODES[(s + i) % COVER_CODES.len()];
            for ty in ["SNAGS", "BRUSH", "OVERHANG", "BOULDERS"] {
                rows.push(Observation::new(&site, *station, format!("FC_{}", ty), code));
                rows.push(Observation::new(&site, *station, format!("FC_{}_DD", ty), code));
            }
            for ty in ["CANOPY_BIG_TREES", "UNDERSTORY_WOODY", "GROUND_NONWOODY"] {
                rows.push(Observation::new(&site, *station, format!("RV_{}", ty), code));
                rows.push(Observation::new(&site, *station, format!("RV_{}_DD", ty), code));
            }
            let proximity = ["0", "C", "P"][(s + i) % 3];
            rows.push(Observation::new(&site, *station, "HI_ROADS", proximity));
            rows.push(Observation::new(&site, *station, "HI_DOCKS_DD", proximity));
            rows.push(Observation::new(&site, *station, "BF_HORIZ_DIST_DD", format!("{}", 1 + i)));
            rows.push(Observation::new(&site, *station, "BF_VERT_HEIGHT_DD", format!("{}.5", i % 3)));
            rows.push(Observation::new(&site, *station, "SI_DEPTH", format!("{}", 0.5 + i as f64)));
        }

        let mut cov = SiteCovariates::new(site);
        cov.ecoregion = Some(["CPL", "WMT", "XER"][s % 3].to_string());
        cov.origin = Some(if s % 2 == 0 { Origin::Natural } else { Origin::ManMade });
        cov.area = Some(10.0 + s as f64);
        covariates.push(cov);
    }
    let covariates = CovariateTable::from_rows(covariates).expect("unique sites");
    (ObservationTable::new(rows), covariates)
}

fn bench_pipeline(c: &mut Criterion) {
    let (observations, covariates) = synthetic_survey(200);
    let pipeline = PhabPipeline::default();

    c.bench_function("pipeline/compute_metrics_200_sites", |b| {
        b.iter(|| {
            let metrics = pipeline
                .compute_metrics(black_box(&observations))
                .expect("compute metrics");
            black_box(metrics.len());
        });
    });

    let metrics = pipeline.compute_metrics(&observations).expect("compute metrics");
    c.bench_function("assembler/pivot_200_sites", |b| {
        b.iter(|| {
            let wide = WideMetricTable::pivot(black_box(&metrics), &CategoricalMetrics::default())
                .expect("pivot");
            black_box(wide.sites().len());
        });
    });

    let wide = pipeline.pivot(&metrics).expect("pivot");
    c.bench_function("indicators/assess_200_sites", |b| {
        b.iter(|| {
            let indicators = pipeline.assess(black_box(&wide), &covariates);
            black_box(indicators.len());
        });
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
