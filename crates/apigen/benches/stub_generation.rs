use apigen::ApiStubGenerator;
use apigen_classfile::access::{ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
use apigen_classfile::{ClassWriter, FieldInfo, Instruction, MethodBody, MethodInfo, Version};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// A class with `members` public methods, half as many private ones and a few fields
fn build_class(members: usize) -> Vec<u8> {
    let mut writer = ClassWriter::new(
        Version::JAVA_17,
        ACC_PUBLIC | ACC_SUPER,
        "com/acme/bench/Service",
        None,
        Some("java/lang/Object"),
        &[],
    )
    .unwrap();

    for i in 0..members {
        let access = if i % 3 == 2 { ACC_PRIVATE } else { ACC_PUBLIC };
        let method = MethodInfo::new(access, &format!("op{i}"), "(Ljava/lang/String;I)Ljava/util/List;");
        let body = MethodBody::with_computed_maxs(
            vec![Instruction::AconstNull, Instruction::Areturn],
            &method.descriptor,
            false,
        )
        .unwrap();
        writer.add_method(&method, Some(&body)).unwrap();
    }
    for i in 0..members / 4 {
        writer
            .add_field(&FieldInfo::new(ACC_PUBLIC | ACC_STATIC, &format!("F{i}"), "Ljava/lang/String;"))
            .unwrap();
    }
    writer.finish().unwrap()
}

fn bench_classify(c: &mut Criterion) {
    let generator = ApiStubGenerator::new(["com.acme.bench"]);
    let class = build_class(64);

    c.bench_function("is_api_class", |b| {
        b.iter(|| generator.is_api_class(black_box(&class)).unwrap());
    });
}

fn bench_to_stub(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_stub");

    for members in [8, 64, 512] {
        let class = build_class(members);
        group.throughput(Throughput::Bytes(class.len() as u64));

        let declared = ApiStubGenerator::new(["com.acme.bench"]);
        group.bench_with_input(BenchmarkId::new("declared", members), &class, |b, class| {
            b.iter(|| declared.to_stub(black_box(class)).unwrap());
        });

        let validating = ApiStubGenerator::with_validation(["com.acme.bench"], true);
        group.bench_with_input(BenchmarkId::new("validating", members), &class, |b, class| {
            b.iter(|| validating.to_stub(black_box(class)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify, bench_to_stub);
criterion_main!(benches);
