use attrition::{AttritionModel, Classifier, TrainConfig, load_csv};
use criterion::{Criterion, criterion_group, criterion_main};
use std::path::Path;

fn trained() -> (AttritionModel, Vec<attrition::EmployeeRecord>) {
    let records = load_csv(Path::new("data/employee_data.csv")).expect("dataset");
    let model = AttritionModel::fit(&records, &TrainConfig::default()).expect("training");
    (model, records)
}

fn bench_predict_single(c: &mut Criterion) {
    let (model, records) = trained();
    let row = model.schema().encode_record(&records[0]).expect("encodable record");

    c.bench_function("predict single row", |b| {
        b.iter(|| {
            let _ = model.predict(&row);
            let _ = model.predict_probability(&row);
        })
    });
}

fn bench_bulk_encoding(c: &mut Criterion) {
    let (model, records) = trained();

    c.bench_function("encode all records", |b| {
        b.iter(|| {
            for r in &records {
                let _ = model.schema().encode_record(r);
            }
        });
    });
}

criterion_group!(benches, bench_predict_single, bench_bulk_encoding);
criterion_main!(benches);
