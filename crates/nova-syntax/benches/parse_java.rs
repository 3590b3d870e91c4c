use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nova_syntax::{parse, print_compilation_unit, FileId};

fn hierarchy_source(classes: u32) -> String {
    let mut out = String::from("package bench;\n\npublic class Base0 {\n    public int value() { return 0; }\n}\n");
    for i in 1..classes {
        out.push_str(&format!(
            "\nclass Base{i} extends Base{prev} {{\n    private int f{i} = {i};\n    public Base{i}(int x) {{ super(); f{i} = x + {i}; }}\n    public int value() {{ return f{i} * 2 + super.value(); }}\n}}\n",
            prev = i - 1
        ));
    }
    out
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("syntax_parse");
    group.measurement_time(Duration::from_secs(2));
    group.warm_up_time(Duration::from_secs(1));
    group.sample_size(20);

    for classes in [10u32, 100, 1000] {
        let src = hierarchy_source(classes);
        group.bench_with_input(BenchmarkId::from_parameter(classes), &src, |b, src| {
            b.iter(|| black_box(parse(FileId::new("Bench.java"), black_box(src))))
        });
    }

    group.finish();
}

fn bench_print(c: &mut Criterion) {
    let mut group = c.benchmark_group("syntax_print");
    group.sample_size(20);

    for classes in [10u32, 1000] {
        let unit = parse(FileId::new("Bench.java"), &hierarchy_source(classes));
        group.bench_with_input(BenchmarkId::from_parameter(classes), &unit, |b, unit| {
            b.iter(|| black_box(print_compilation_unit(black_box(unit))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_print);
criterion_main!(benches);
