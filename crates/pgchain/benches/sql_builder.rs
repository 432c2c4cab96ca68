use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgchain::qb::{Binder, Clause};
use pgchain::{Database, Direction, Value, condition};

/// `col0 = 0, col1 = 1, ...` with `n` predicates.
fn condition_string(n: usize) -> String {
    (0..n)
        .map(|i| format!("col{i} = {i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bench_condition_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/condition_parse");

    for n in [1, 5, 10, 50, 100] {
        let input = condition_string(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, input| {
            b.iter(|| black_box(condition::parse(input)));
        });
    }

    group.finish();
}

fn bench_select_statement(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/select_statement");
    let db = Database::new(());

    for n in [1, 5, 10, 50, 100] {
        let input = condition_string(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, input| {
            b.iter(|| {
                let statement = db
                    .from("users")
                    .filter(input)
                    .order_by([("col0", Direction::Desc)])
                    .limit(20, Some(3))
                    .select_statement(&[]);
                black_box(statement)
            });
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/compile");

    for n in [5, 20, 100, 500] {
        let mut binder = Binder::new();
        let mut sql = String::from("UPDATE \"t\" SET ");
        for i in 0..n {
            if i > 0 {
                sql.push_str(", ");
            }
            let name = binder.register(Clause::Set, &format!("c{i}"), Value::from("<b>x</b> & y"));
            sql.push_str(&format!("\"c{i}\" = {name}"));
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(binder.compile(sql)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_condition_parse,
    bench_select_statement,
    bench_compile
);
criterion_main!(benches);
