use chrono::NaiveDate;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use runqc::frame::Frame;
use runqc::lookup::Lookups;
use runqc::merge::{DerivationPipeline, concat_frames};
use runqc::source::SourceKind;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn build_lookups() -> Lookups {
    Lookups::from_tables(
        &strings(&["Permian", "Haynesville"]),
        &[
            strings(&["Reeves", "Caddo"]),
            strings(&["Loving", "De Soto"]),
        ],
        &strings(&["Basin", "Keyword", "Formation Family"]),
        &[
            strings(&["Permian", "WOLFCAMP", "Wolfcamp"]),
            strings(&["Permian", "BONE SPRING", "Bone Spring"]),
            strings(&["Haynesville", "HAYNESVILLE", "Haynesville"]),
        ],
    )
    .expect("lookups")
}

fn generate_source(kind: SourceKind, rows: usize) -> Frame {
    let headers = strings(&[
        "SOURCE",
        "COUNTY",
        "FORMATION",
        "SN",
        "MOTOR_MAKE",
        "JOB_TYPE",
        "LOBES",
        "STAGES",
        "DATE_IN",
        "TIME_IN",
        "DATE_OUT",
        "TIME_OUT",
        "CIRC_HOURS",
        "DRILLING_HOURS",
    ]);
    let records: Vec<Vec<String>> = (0..rows)
        .map(|i| {
            let county = if i % 2 == 0 { "Reeves" } else { "Caddo" };
            let formation = if i % 2 == 0 { "Wolfcamp B" } else { "Haynesville" };
            let day = (i % 27) + 1;
            strings(&[
                kind.id(),
                county,
                formation,
                if i % 3 == 0 { "MLA07-991" } else { "SN-100" },
                "TDI",
                if i % 2 == 0 { "Directional" } else { "Rental" },
                "7",
                "8",
                &format!("2025-06-{day:02}"),
                "06:30:00",
                &format!("2025-06-{day:02}"),
                "18:00:00",
                "2.5",
                "11",
            ])
        })
        .collect();
    Frame::from_records(&headers, &records)
}

fn bench_pipeline(c: &mut Criterion) {
    let lookups = build_lookups();
    let today = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
    let schema = strings(&[
        "SOURCE",
        "COUNTY",
        "STATE",
        "BASIN",
        "FORMATION",
        "FORM_FAM",
        "SN",
        "MOTOR_MAKE",
        "MOTOR_TYPE2",
        "JOB_TYPE",
        "LOBES",
        "STAGES",
        "LOBE/STAGE",
        "DDS",
        "DATE_IN",
        "TIME_IN",
        "DATE_OUT",
        "TIME_OUT",
        "START_DATE",
        "END_DATE",
        "CIRC_HOURS",
        "DRILLING_HOURS",
        "Total Hrs (C+D)",
        "UPDATE",
    ]);

    c.bench_function("derive_5k_rows", |b| {
        let pipeline = DerivationPipeline::new(&lookups, today).expect("pipeline");
        b.iter_batched(
            || {
                let frames = SourceKind::ALL
                    .iter()
                    .map(|kind| generate_source(*kind, 1250))
                    .collect::<Vec<_>>();
                concat_frames(frames, &schema)
            },
            |mut frame| {
                pipeline.run(&mut frame).expect("run pipeline");
                frame
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("concat_4_sources", |b| {
        b.iter_batched(
            || {
                SourceKind::ALL
                    .iter()
                    .map(|kind| generate_source(*kind, 1250))
                    .collect::<Vec<_>>()
            },
            |frames| concat_frames(frames, &schema),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
