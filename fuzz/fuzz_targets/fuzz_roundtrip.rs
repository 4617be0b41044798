#![no_main]

use libfuzzer_sys::fuzz_target;
use mutatools::{
    Annotation, ByteReader, FactoryChain, FloatWidth, IntWidth, Mutator, SeededRandom, TypeRef,
};
use std::rc::Rc;
use std::sync::OnceLock;

thread_local! {
    static MUTATOR: Rc<dyn Mutator> = build_mutator();
}

static SHAPE: OnceLock<TypeRef> = OnceLock::new();

fn shape() -> &'static TypeRef {
    SHAPE.get_or_init(|| {
        TypeRef::record(
            "Corpus",
            vec![
                ("flag".to_owned(), TypeRef::boolean()),
                (
                    "level".to_owned(),
                    TypeRef::int(IntWidth::I32)
                        .with(Annotation::Range { min: Some(-100), max: Some(100) }),
                ),
                ("ratio".to_owned(), TypeRef::float(FloatWidth::F64)),
                (
                    "blob".to_owned(),
                    TypeRef::bytes().with(Annotation::SizeRange { min: 0, max: 64 }),
                ),
                (
                    "ints".to_owned(),
                    TypeRef::sequence(TypeRef::int(IntWidth::I16))
                        .with(Annotation::SizeRange { min: 0, max: 8 }),
                ),
                (
                    "choice".to_owned(),
                    TypeRef::variant(
                        "Choice",
                        vec![
                            ("x".to_owned(), TypeRef::boolean()),
                            ("y".to_owned(), TypeRef::int(IntWidth::I64)),
                        ],
                    ),
                ),
                ("note".to_owned(), TypeRef::optional(TypeRef::text())),
            ],
        )
    })
}

fn build_mutator() -> Rc<dyn Mutator> {
    FactoryChain::standard()
        .build_root(shape())
        .expect("static shape must build")
}

fuzz_target!(|data: &[u8]| {
    MUTATOR.with(|mutator| {
        // Decoding is total: any byte string must yield some in-domain value.
        let value = mutator.read(&mut ByteReader::new(data));

        // Re-encoding a decoded value is idempotent.
        let mut encoded = Vec::new();
        mutator.write(&value, &mut encoded);
        let reread = mutator.read(&mut ByteReader::new(&encoded));
        assert_eq!(reread, value, "re-encode changed the value");

        // Mutation moves the value and keeps it encodable, deterministically per seed.
        if data.len() >= 8 {
            let seed = u64::from_le_bytes(data[..8].try_into().unwrap());
            let mut prng = SeededRandom::new(seed);
            let mut mutated = value.clone();
            mutator.mutate(&mut mutated, &mut prng);
            assert_ne!(mutated, value, "mutate returned its input");

            let mut out = Vec::new();
            mutator.write(&mutated, &mut out);
            assert_eq!(
                mutator.read(&mut ByteReader::new(&out)),
                mutated,
                "mutated value lost in the byte form"
            );
        }
    });
});
