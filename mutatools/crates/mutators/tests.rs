#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::rc::Rc;

    use crate::api::{BuildContext, BuildError, FactoryChain, Mutator, MutatorFactory};
    use crate::mutators::delayed::DelayedMutator;
    use crate::mutators::fixed::FixedMutator;
    use crate::mutators::integral::force_in_range;
    use crate::random::{PseudoRandom, SeededRandom};
    use crate::support::codec::ByteReader;
    use crate::support::typeref::{Annotation, FloatWidth, IntWidth, TypeRef};
    use crate::value::Value;

    /// Scripted random source: every sampling method pops its next answer from a queue, so
    /// tests pin down exactly which decisions a mutator takes.
    #[derive(Default)]
    struct ScriptedRandom {
        ranges: VecDeque<i64>,
        indexes: VecDeque<usize>,
        choices: VecDeque<bool>,
        one_out_ofs: VecDeque<bool>,
    }

    impl ScriptedRandom {
        fn new() -> Self {
            Self::default()
        }

        fn ranges(mut self, values: impl IntoIterator<Item = i64>) -> Self {
            self.ranges.extend(values);
            self
        }

        fn indexes(mut self, values: impl IntoIterator<Item = usize>) -> Self {
            self.indexes.extend(values);
            self
        }

        fn choices(mut self, values: impl IntoIterator<Item = bool>) -> Self {
            self.choices.extend(values);
            self
        }

        fn one_out_ofs(mut self, values: impl IntoIterator<Item = bool>) -> Self {
            self.one_out_ofs.extend(values);
            self
        }
    }

    impl PseudoRandom for ScriptedRandom {
        fn closed_range(&mut self, lo: i64, hi: i64) -> i64 {
            let v = self.ranges.pop_front().expect("script ran out of closed_range answers");
            assert!(v >= lo && v <= hi, "scripted {v} outside [{lo}, {hi}]");
            v
        }

        fn index_in(&mut self, n: usize) -> usize {
            let v = self.indexes.pop_front().expect("script ran out of index_in answers");
            assert!(v < n, "scripted index {v} outside [0, {n})");
            v
        }

        fn choice(&mut self) -> bool {
            self.choices.pop_front().expect("script ran out of choice answers")
        }

        fn true_in_one_out_of(&mut self, _n: usize) -> bool {
            self.one_out_ofs.pop_front().expect("script ran out of one_out_of answers")
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
    }

    fn build(ty: &TypeRef) -> Rc<dyn Mutator> {
        FactoryChain::standard().build_root(ty).unwrap()
    }

    fn round_trip(mutator: &dyn Mutator, value: &Value) -> Value {
        let mut out = Vec::new();
        mutator.write(value, &mut out);
        mutator.read(&mut ByteReader::new(&out))
    }

    fn ranged_i64(min: i64, max: i64) -> TypeRef {
        TypeRef::int(IntWidth::I64).with(Annotation::Range { min: Some(min), max: Some(max) })
    }

    // ── Integral ─────────────────────────────────────────────────────────────

    #[test]
    fn narrowed_integral_init_prefers_special_values() {
        let mutator = build(&ranged_i64(10, 20));
        // Special values of [10, 20] are {10, 20}; slot 0 is the smallest.
        let mut prng = ScriptedRandom::new().ranges([0]);
        assert_eq!(mutator.init(&mut prng), Value::Int(10));
    }

    #[test]
    fn narrowed_integral_writes_natural_width() {
        let mutator = build(&ranged_i64(10, 20));
        let mut out = Vec::new();
        mutator.write(&Value::Int(10), &mut out);
        assert_eq!(out, vec![0, 0, 0, 0, 0, 0, 0, 0x0A]);
    }

    #[test]
    fn out_of_range_raw_folds_back_in() {
        let mutator = build(&ranged_i64(10, 20));
        // Raw -1: 10 + |(-1 - 10) % 10| = 11.
        assert_eq!(mutator.read(&mut ByteReader::new(&[0xFF; 8])), Value::Int(11));
    }

    #[test]
    fn force_in_range_always_lands_inside() {
        let bounds = [
            (10i64, 20i64),
            (-128, 127),
            (0, 1),
            (i64::MIN, 0),
            (i64::MIN, i64::MAX - 1),
            (-1, i64::MAX),
        ];
        let mut prng = SeededRandom::new(99);
        for &(lo, hi) in &bounds {
            for raw in
                [i64::MIN, i64::MIN + 1, -1, 0, 1, i64::MAX - 1, i64::MAX, prng.closed_range(i64::MIN, i64::MAX)]
            {
                let folded = force_in_range(raw, lo, hi);
                assert!(folded >= lo && folded <= hi, "{raw} folded to {folded} outside [{lo}, {hi}]");
            }
        }
    }

    #[test]
    fn in_range_raw_is_preserved() {
        for raw in [10i64, 15, 20] {
            assert_eq!(force_in_range(raw, 10, 20), raw);
        }
    }

    #[test]
    fn byte_init_hits_every_special_value_often() {
        let mutator = build(&TypeRef::int(IntWidth::I8));
        let mut prng = SeededRandom::new(0);
        let mut counts = [0usize; 4];
        for _ in 0..1000 {
            match mutator.init(&mut prng) {
                Value::Int(-128) => counts[0] += 1,
                Value::Int(0) => counts[1] += 1,
                Value::Int(1) => counts[2] += 1,
                Value::Int(127) => counts[3] += 1,
                Value::Int(v) => assert!((-128..=127).contains(&v)),
                other => panic!("unexpected {other:?}"),
            }
        }
        for (i, count) in counts.iter().enumerate() {
            assert!(*count >= 100, "special value #{i} drawn only {count} times out of 1000");
        }
    }

    #[test]
    fn bit_flip_to_the_edge_stays_in_range() {
        let mutator = build(&ranged_i64(0, 255));
        // Force a bit flip of bit 7: 128 ^ 0x80 = 0, which is in range and different.
        let mut prng = ScriptedRandom::new().one_out_ofs([true]).indexes([7]);
        let mut value = Value::Int(128);
        mutator.mutate(&mut value, &mut prng);
        assert_eq!(value, Value::Int(0));
    }

    #[test]
    fn mutate_never_returns_the_input() {
        let mutator = build(&ranged_i64(-3, 3));
        let mut prng = SeededRandom::new(7);
        let mut value = mutator.init(&mut prng);
        for _ in 0..1000 {
            let before = value.clone();
            mutator.mutate(&mut value, &mut prng);
            assert_ne!(value, before);
            let Value::Int(v) = value else { panic!() };
            assert!((-3..=3).contains(&v));
        }
    }

    #[test]
    fn integral_round_trips_fresh_values() {
        for ty in [
            TypeRef::int(IntWidth::I8),
            TypeRef::int(IntWidth::I16),
            TypeRef::int(IntWidth::I32),
            ranged_i64(-1000, 1000),
        ] {
            let mutator = build(&ty);
            let mut prng = SeededRandom::new(11);
            for _ in 0..200 {
                let value = mutator.init(&mut prng);
                assert_eq!(round_trip(&*mutator, &value), value);
            }
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = FactoryChain::standard().build_root(&ranged_i64(20, 10)).unwrap_err();
        assert!(err.to_string().contains("not a valid interval"), "{err}");
    }

    #[test]
    fn singleton_range_wants_a_constant() {
        let err = FactoryChain::standard().build_root(&ranged_i64(5, 5)).unwrap_err();
        assert!(err.to_string().contains("use a constant instead"), "{err}");
    }

    #[test]
    fn range_outside_width_is_rejected() {
        let ty = TypeRef::int(IntWidth::I8)
            .with(Annotation::Range { min: None, max: Some(1000) });
        let err = FactoryChain::standard().build_root(&ty).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    // ── Bool and float ───────────────────────────────────────────────────────

    #[test]
    fn bool_mutate_flips() {
        let mutator = build(&TypeRef::boolean());
        let mut prng = SeededRandom::new(0);
        let mut value = Value::Bool(false);
        mutator.mutate(&mut value, &mut prng);
        assert_eq!(value, Value::Bool(true));
        mutator.mutate(&mut value, &mut prng);
        assert_eq!(value, Value::Bool(false));
    }

    #[test]
    fn bool_reads_the_low_bit() {
        let mutator = build(&TypeRef::boolean());
        assert_eq!(mutator.read(&mut ByteReader::new(&[0x02])), Value::Bool(false));
        assert_eq!(mutator.read(&mut ByteReader::new(&[0x03])), Value::Bool(true));
        assert_eq!(mutator.read(&mut ByteReader::new(&[])), Value::Bool(false));
    }

    #[test]
    fn float_round_trips_every_special_value() {
        for width in [FloatWidth::F32, FloatWidth::F64] {
            let mutator = build(&TypeRef::float(width));
            for value in [0.0, -0.0, 1.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                let quantized = match width {
                    FloatWidth::F32 => (value as f32) as f64,
                    FloatWidth::F64 => value,
                };
                let value = Value::Float(quantized);
                assert_eq!(round_trip(&*mutator, &value), value);
            }
        }
    }

    #[test]
    fn f32_values_are_exactly_representable() {
        let mutator = build(&TypeRef::float(FloatWidth::F32));
        let mut prng = SeededRandom::new(3);
        for _ in 0..200 {
            let value = mutator.init(&mut prng);
            let Value::Float(v) = value else { panic!() };
            assert_eq!(((v as f32) as f64).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn float_mutate_changes_the_representation() {
        let mutator = build(&TypeRef::float(FloatWidth::F64));
        let mut prng = SeededRandom::new(4);
        let mut value = mutator.init(&mut prng);
        for _ in 0..500 {
            let before = value.clone();
            mutator.mutate(&mut value, &mut prng);
            assert_ne!(value, before);
        }
    }

    // ── Byte strings and text ────────────────────────────────────────────────

    #[test]
    fn byte_string_respects_size_bounds() {
        let ty = TypeRef::bytes().with(Annotation::SizeRange { min: 2, max: 8 });
        let mutator = build(&ty);
        let mut prng = SeededRandom::new(5);
        let mut value = mutator.init(&mut prng);
        for _ in 0..500 {
            mutator.mutate(&mut value, &mut prng);
            let Value::Bytes(bytes) = &value else { panic!() };
            assert!((2..=8).contains(&bytes.len()));
            assert_eq!(round_trip(&*mutator, &value), value);
        }
    }

    #[test]
    fn byte_string_read_clamps_the_length_prefix() {
        let ty = TypeRef::bytes().with(Annotation::SizeRange { min: 0, max: 4 });
        let mutator = build(&ty);
        // Length prefix claims 100 bytes; only 4 are admitted, missing ones are zero.
        let value = mutator.read(&mut ByteReader::new(&[100, 0xAA, 0xBB]));
        assert_eq!(value, Value::Bytes(vec![0xAA, 0xBB, 0, 0]));
    }

    #[test]
    fn text_is_always_valid_utf8_within_bounds() {
        let ty = TypeRef::text().with(Annotation::Utf8Length { min: 0, max: 16 });
        let mutator = build(&ty);
        // 0xFF never appears in valid UTF-8.
        let value = mutator.read(&mut ByteReader::new(&[5, 0xFF, b'o', b'k', 0xFF, 0xFF]));
        let Value::Str(text) = &value else { panic!() };
        assert!(text.len() <= 16);
        assert!(text.contains("ok"));
        assert_eq!(round_trip(&*mutator, &value), value);
    }

    #[test]
    fn text_mutates_into_fresh_valid_strings() {
        let ty = TypeRef::text().with(Annotation::Utf8Length { min: 1, max: 32 });
        let mutator = build(&ty);
        let mut prng = SeededRandom::new(6);
        let mut value = mutator.init(&mut prng);
        for _ in 0..300 {
            let before = value.clone();
            mutator.mutate(&mut value, &mut prng);
            assert_ne!(value, before);
            let Value::Str(text) = &value else { panic!() };
            assert!((1..=32).contains(&text.len()));
        }
    }

    // ── Combinators ──────────────────────────────────────────────────────────

    fn sample_record() -> TypeRef {
        TypeRef::record(
            "Sample",
            vec![
                ("flag".to_owned(), TypeRef::boolean()),
                ("level".to_owned(), ranged_i64(0, 100)),
                ("payload".to_owned(), TypeRef::bytes()),
            ],
        )
    }

    #[test]
    fn record_mutates_exactly_one_field() {
        let mutator = build(&sample_record());
        let mut prng = SeededRandom::new(8);
        let mut value = mutator.init(&mut prng);
        for _ in 0..200 {
            let Value::Record(before) = value.clone() else { panic!() };
            mutator.mutate(&mut value, &mut prng);
            let Value::Record(after) = &value else { panic!() };
            let changed = before.iter().zip(after).filter(|(a, b)| a != b).count();
            assert_eq!(changed, 1);
        }
    }

    #[test]
    fn record_round_trips_and_detaches() {
        let mutator = build(&sample_record());
        let mut prng = SeededRandom::new(9);
        for _ in 0..100 {
            let value = mutator.init(&mut prng);
            assert_eq!(round_trip(&*mutator, &value), value);
            assert_eq!(mutator.detach(&value), value);
        }
    }

    #[test]
    fn variant_tag_wraps_modulo_arm_count() {
        let ty = TypeRef::variant(
            "Choice",
            vec![
                ("x".to_owned(), TypeRef::boolean()),
                ("y".to_owned(), TypeRef::int(IntWidth::I64)),
            ],
        );
        let mutator = build(&ty);
        let read_tag = |bytes: &[u8]| match mutator.read(&mut ByteReader::new(bytes)) {
            Value::Variant(tag, _) => tag,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(read_tag(&[0x00]), 0);
        assert_eq!(read_tag(&[0x01]), 1);
        // 7 mod 2 = 1.
        assert_eq!(read_tag(&[0x07]), 1);
        // Empty input: tag 0, then the default bool.
        assert_eq!(
            mutator.read(&mut ByteReader::new(&[])),
            Value::Variant(0, Box::new(Value::Bool(false)))
        );
    }

    #[test]
    fn variant_switch_reinitializes_the_new_arm() {
        let ty = TypeRef::variant(
            "Choice",
            vec![
                ("x".to_owned(), TypeRef::boolean()),
                ("y".to_owned(), ranged_i64(10, 20)),
            ],
        );
        let mutator = build(&ty);
        // Force the tag switch (1 out of k+1), land on the other arm, then init it from the
        // special-value slot 0.
        let mut prng = ScriptedRandom::new().one_out_ofs([true]).indexes([0]).ranges([0]);
        let mut value = Value::Variant(0, Box::new(Value::Bool(true)));
        mutator.mutate(&mut value, &mut prng);
        assert_eq!(value, Value::Variant(1, Box::new(Value::Int(10))));
    }

    #[test]
    fn optional_presence_byte_framing() {
        let ty = TypeRef::optional(TypeRef::boolean());
        let mutator = build(&ty);
        assert_eq!(mutator.read(&mut ByteReader::new(&[0x00, 0x01])), Value::Optional(None));
        assert_eq!(
            mutator.read(&mut ByteReader::new(&[0x01, 0x01])),
            Value::Optional(Some(Box::new(Value::Bool(true))))
        );
        let mut out = Vec::new();
        mutator.write(&Value::Optional(None), &mut out);
        assert_eq!(out, vec![0x00]);
    }

    #[test]
    fn not_null_drops_the_presence_wrapper() {
        let ty = TypeRef::optional(TypeRef::boolean()).with(Annotation::NotNull);
        let mutator = build(&ty);
        // No presence byte: the framing is the inner framing.
        assert_eq!(mutator.read(&mut ByteReader::new(&[0x01])), Value::Bool(true));
        assert_eq!(mutator.fixed_size(), Some(1));
    }

    #[test]
    fn repeated_clamps_oversized_length_prefixes() {
        let ty = TypeRef::sequence(TypeRef::int(IntWidth::I64))
            .with(Annotation::SizeRange { min: 0, max: 3 });
        let mutator = build(&ty);
        let value = mutator.read(&mut ByteReader::new(&[0x05]));
        let Value::List(items) = &value else { panic!() };
        assert_eq!(items.len(), 3);
        // Re-encoding yields a length-3 entry that reads back identically.
        let mut out = Vec::new();
        mutator.write(&value, &mut out);
        assert_eq!(out[0], 3);
        assert_eq!(mutator.read(&mut ByteReader::new(&out)), value);
    }

    #[test]
    fn repeated_mutations_stay_inside_bounds() {
        let ty = TypeRef::sequence(ranged_i64(0, 9))
            .with(Annotation::SizeRange { min: 1, max: 5 });
        let mutator = build(&ty);
        let mut prng = SeededRandom::new(10);
        let mut value = mutator.init(&mut prng);
        for _ in 0..500 {
            let before = value.clone();
            mutator.mutate(&mut value, &mut prng);
            assert_ne!(value, before);
            let Value::List(items) = &value else { panic!() };
            assert!((1..=5).contains(&items.len()));
            assert_eq!(round_trip(&*mutator, &value), value);
        }
    }

    #[test]
    #[should_panic(expected = "engine bug")]
    fn constant_mutator_refuses_to_mutate() {
        let mutator = FixedMutator::new(Value::Unit, "unit");
        let mut value = Value::Unit;
        mutator.mutate(&mut value, &mut SeededRandom::new(0));
    }

    #[test]
    #[should_panic(expected = "used before resolution")]
    fn unresolved_delayed_mutator_is_an_engine_bug() {
        let mutator = DelayedMutator::unresolved("M");
        mutator.init(&mut SeededRandom::new(0));
    }

    // ── Recursion ────────────────────────────────────────────────────────────

    fn recursive_record() -> TypeRef {
        TypeRef::record(
            "M",
            vec![
                ("a".to_owned(), TypeRef::boolean()),
                ("child".to_owned(), TypeRef::optional(TypeRef::recurse("M"))),
            ],
        )
    }

    fn chain_depth(value: &Value) -> usize {
        let Value::Record(items) = value else { panic!("not a record: {value:?}") };
        match &items[1] {
            Value::Optional(Some(inner)) => 1 + chain_depth(inner),
            Value::Optional(None) => 1,
            other => panic!("not an optional: {other:?}"),
        }
    }

    #[test]
    fn recursive_record_builds_and_inits_to_scripted_depth() {
        let mutator = build(&recursive_record());
        // Presence answers: two levels present, the third absent.
        let mut prng = ScriptedRandom::new()
            .choices([false, true, true, true, false, false]);
        let value = mutator.init(&mut prng);
        assert_eq!(chain_depth(&value), 3);
    }

    #[test]
    fn recursive_record_round_trips_exactly() {
        let mutator = build(&recursive_record());
        let leaf = Value::Record(vec![Value::Bool(true), Value::Optional(None)]);
        let mid = Value::Record(vec![
            Value::Bool(false),
            Value::Optional(Some(Box::new(leaf))),
        ]);
        let value = Value::Record(vec![Value::Bool(true), Value::Optional(Some(Box::new(mid)))]);
        assert_eq!(chain_depth(&value), 3);
        assert_eq!(round_trip(&*mutator, &value), value);
        assert_eq!(mutator.detach(&value), value);
    }

    #[test]
    fn recursive_debug_string_terminates() {
        let mutator = build(&recursive_record());
        let description = mutator.to_debug_string();
        assert_eq!(description, "M {a: bool, child: optional<M>}");
    }

    #[test]
    fn unknown_recursion_target_is_rejected() {
        let ty = TypeRef::record(
            "Outer",
            vec![("inner".to_owned(), TypeRef::recurse("NoSuchType"))],
        );
        let err = FactoryChain::standard().build_root(&ty).unwrap_err();
        assert!(matches!(err, BuildError::UnknownRecursion { .. }), "{err}");
    }

    // ── Factory chain ────────────────────────────────────────────────────────

    #[test]
    fn construction_errors_name_the_offending_child_path() {
        let ty = TypeRef::record(
            "Outer",
            vec![(
                "field_a".to_owned(),
                TypeRef::sequence(ranged_i64(20, 10)),
            )],
        );
        let err = FactoryChain::standard().build_root(&ty).unwrap_err();
        assert!(err.to_string().contains("Root.field_a[*]"), "{err}");
    }

    #[test]
    fn unsupported_types_report_their_path() {
        // A chain with no factories supports nothing.
        let chain = FactoryChain::new(Vec::new());
        let err = chain.build_root(&TypeRef::boolean()).unwrap_err();
        assert!(matches!(err, BuildError::Unsupported { .. }), "{err}");
    }

    #[test]
    fn prepended_factories_win() {
        struct PinnedBool;
        impl MutatorFactory for PinnedBool {
            fn try_create(
                &self,
                ty: &TypeRef,
                _chain: &FactoryChain,
                _ctx: &mut BuildContext,
            ) -> Option<crate::api::BuildResult<Rc<dyn Mutator>>> {
                (ty.annotations.custom("pinned") == Some("true"))
                    .then(|| Ok(Rc::new(FixedMutator::new(Value::Bool(true), "pinned bool"))
                        as Rc<dyn Mutator>))
            }
        }

        let mut chain = FactoryChain::standard();
        chain.prepend(Box::new(PinnedBool));
        let pinned = TypeRef::boolean()
            .with(Annotation::Custom { key: "pinned".into(), value: "true".into() });
        let mutator = chain.build_root(&pinned).unwrap();
        assert!(mutator.is_constant());
        assert_eq!(mutator.read(&mut ByteReader::new(&[])), Value::Bool(true));

        // Without the annotation the built-in factory still answers.
        let plain = chain.build_root(&TypeRef::boolean()).unwrap();
        assert!(!plain.is_constant());
    }

    #[test]
    fn mutation_is_deterministic_under_a_fixed_seed() {
        let mutator = build(&sample_record());
        let run = |seed: u64| {
            let mut prng = SeededRandom::new(seed);
            let mut value = mutator.init(&mut prng);
            for _ in 0..50 {
                mutator.mutate(&mut value, &mut prng);
            }
            value
        };
        assert_eq!(run(123), run(123));
        assert_ne!(run(123), run(124));
    }
}
