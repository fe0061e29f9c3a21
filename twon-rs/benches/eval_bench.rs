use criterion::{black_box, criterion_group, criterion_main, Criterion};
use twon::config::Config;
use twon::console::Transcript;
use twon::script::expand::{substitute, Resolution};
use twon::script::expr::{eval_arith, eval_condition};
use twon::script::{Interpreter, Value};
use twon::var::VarStore;

fn make_vars(count: usize) -> VarStore {
    let mut vars = VarStore::new();
    for i in 0..count {
        vars.set(format!("v{i}"), Value::Number(i as f64));
    }
    vars
}

fn bench_eval(c: &mut Criterion) {
    let vars = make_vars(200);
    let line = "((v10 + v20) * (v30 - v5))";
    let substituted = substitute(line, &vars, Resolution::Lenient).unwrap();

    let mut g = c.benchmark_group("eval");

    g.bench_function("substitute", |b| {
        b.iter(|| substitute(black_box(line), black_box(&vars), Resolution::Lenient))
    });
    g.bench_function("arith_nested", |b| {
        b.iter(|| eval_arith(black_box(&substituted)))
    });
    g.bench_function("condition", |b| {
        b.iter(|| eval_condition(black_box("(3 + 4) > 5 && 2 <= 2 || 0")))
    });

    let script = "\
input i = 0
while
{
    input i = (i + 1)
    addlist seen = i
    if ?(i >= 500)
    {
        break
    }
}";
    g.bench_function("loop_500", |b| {
        b.iter(|| {
            let config = Config {
                seed: Some(0),
                ..Config::default()
            };
            let mut interp = Interpreter::with_console(config, Box::new(Transcript::new()));
            interp.run_source(black_box(script)).unwrap();
        })
    });

    g.finish();
}

criterion_group!(benches, bench_eval);
criterion_main!(benches);
