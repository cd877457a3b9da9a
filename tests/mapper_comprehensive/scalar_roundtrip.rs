//! Scalar round trips: every scalar kind, container flavor and array shape
//! survives `from_document(to_document(entity))`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use docmap::{take_binary_opt, Value};
use proptest::prelude::*;

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample {
    id: Option<String>,
    text: Option<String>,
    byte: Option<i8>,
    short: Option<i16>,
    int: Option<i32>,
    long: Option<i64>,
    float: Option<f32>,
    double: Option<f64>,
    flag: Option<bool>,
    letter: Option<char>,
    born: Option<DateTime<Utc>>,
    seen: Option<NaiveDateTime>,
    names: Vec<String>,
    ranks: BTreeSet<i32>,
    backlog: VecDeque<i64>,
    grid: Vec<Vec<i32>>,
    data: Option<Vec<u8>>,
    scores: BTreeMap<String, f64>,
}

impl Entity for Sample {
    fn describe() -> EntityTypeBuilder {
        EntityTypeBuilder::new()
            .collection("samples")
            .id("id", IdSpec::generated())
            .property("text", FieldType::string())
            .property("byte", FieldType::byte())
            .property("short", FieldType::short())
            .property("int", FieldType::int())
            .property("long", FieldType::long())
            .property("float", FieldType::float())
            .property("double", FieldType::double())
            .property("flag", FieldType::bool())
            .property("letter", FieldType::char())
            .property("born", FieldType::date())
            .property("seen", FieldType::timestamp())
            .property("names", FieldType::list(FieldType::string()))
            .property("ranks", FieldType::set(FieldType::int()))
            .property("backlog", FieldType::queue(FieldType::long()))
            .property("grid", FieldType::array(FieldType::array(FieldType::int())))
            .property("data", FieldType::binary())
            .property("scores", FieldType::map(FieldType::double()))
    }

    fn instantiate() -> Option<Self> {
        Some(Sample::default())
    }

    fn get_field(&self, name: &str) -> Result<FieldValue, FieldAccessError> {
        Ok(match name {
            "id" => self.id.clone().into(),
            "text" => self.text.clone().into(),
            "byte" => self.byte.into(),
            "short" => self.short.into(),
            "int" => self.int.into(),
            "long" => self.long.into(),
            "float" => self.float.into(),
            "double" => self.double.into(),
            "flag" => self.flag.into(),
            "letter" => self.letter.into(),
            "born" => self.born.into(),
            "seen" => self.seen.into(),
            "names" => self.names.clone().into(),
            "ranks" => self.ranks.clone().into(),
            "backlog" => self.backlog.clone().into(),
            "grid" => self.grid.clone().into(),
            "data" => self.data.clone().map_or(FieldValue::Null, FieldValue::Binary),
            "scores" => self.scores.clone().into(),
            _ => return Err(FieldAccessError::unknown(name)),
        })
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError> {
        match name {
            "id" => self.id = take(name, value)?,
            "text" => self.text = take(name, value)?,
            "byte" => self.byte = take(name, value)?,
            "short" => self.short = take(name, value)?,
            "int" => self.int = take(name, value)?,
            "long" => self.long = take(name, value)?,
            "float" => self.float = take(name, value)?,
            "double" => self.double = take(name, value)?,
            "flag" => self.flag = take(name, value)?,
            "letter" => self.letter = take(name, value)?,
            "born" => self.born = take(name, value)?,
            "seen" => self.seen = take(name, value)?,
            "names" => self.names = take(name, value)?,
            "ranks" => self.ranks = take(name, value)?,
            "backlog" => self.backlog = take(name, value)?,
            "grid" => self.grid = take(name, value)?,
            "data" => self.data = take_binary_opt(name, value)?,
            "scores" => self.scores = take(name, value)?,
            _ => return Err(FieldAccessError::unknown(name)),
        }
        Ok(())
    }
}

fn millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().expect("in range")
}

prop_compose! {
    fn arb_numbers()(
        byte in proptest::option::of(any::<i8>()),
        short in proptest::option::of(any::<i16>()),
        int in proptest::option::of(any::<i32>()),
        long in proptest::option::of(any::<i64>()),
        quarter in proptest::option::of(any::<i16>()),
        double in proptest::option::of(-1.0e12f64..1.0e12f64),
        flag in proptest::option::of(any::<bool>()),
        letter in proptest::option::of(any::<char>()),
    ) -> (Option<i8>, Option<i16>, Option<i32>, Option<i64>, Option<f32>, Option<f64>, Option<bool>, Option<char>) {
        // Quarters are exact in binary and short in decimal
        let float = quarter.map(|q| q as f32 / 4.0);
        (byte, short, int, long, float, double, flag, letter)
    }
}

prop_compose! {
    fn arb_sample()(
        numbers in arb_numbers(),
        text in proptest::option::of("\\PC{0,24}"),
        born in proptest::option::of(-2_000_000_000_000i64..4_000_000_000_000i64),
        seen in proptest::option::of(0i64..4_000_000_000_000i64),
        names in proptest::collection::vec("[a-z]{0,8}", 0..5),
        ranks in proptest::collection::btree_set(any::<i32>(), 0..6),
        backlog in proptest::collection::vec_deque(any::<i64>(), 0..6),
        grid in proptest::collection::vec(proptest::collection::vec(any::<i32>(), 0..4), 0..4),
        data in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..32)),
        scores in proptest::collection::btree_map("[a-z]{1,6}", -1.0e9f64..1.0e9f64, 0..4),
    ) -> Sample {
        let (byte, short, int, long, float, double, flag, letter) = numbers;
        Sample {
            id: None,
            text,
            byte,
            short,
            int,
            long,
            float,
            double,
            flag,
            letter,
            born: born.map(millis),
            seen: seen.map(|ms| millis(ms).naive_utc()),
            names,
            ranks,
            backlog,
            grid,
            data,
            scores,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_scalar_kind_round_trips(mut sample in arb_sample()) {
        let t = TestMapper::new();
        let doc = t.mapper.to_document(&mut sample).unwrap();
        let back: Sample = t.mapper.from_document(&doc).unwrap();
        prop_assert_eq!(back, sample);
    }
}

#[test]
fn all_null_sample_round_trips() {
    let t = TestMapper::new();
    let mut sample = Sample::default();
    let doc = t.mapper.to_document(&mut sample).unwrap();

    // Only the id and the non-null containers are written
    assert!(doc.get("text").is_none());
    assert!(doc.get("born").is_none());
    assert!(doc.get("data").is_none());
    assert_eq!(doc.get("names"), Some(&Value::Array(vec![])));

    let back: Sample = t.mapper.from_document(&doc).unwrap();
    assert_eq!(back, sample);
    assert!(back.id.is_some());
}

#[test]
fn wire_forms_of_special_kinds() {
    let t = TestMapper::new();
    let mut sample = Sample {
        letter: Some('λ'),
        float: Some(0.1),
        born: Some(millis(1_700_000_000_123)),
        seen: Some(millis(86_400_000).naive_utc()),
        data: Some(vec![0, 1, 255]),
        grid: vec![vec![1, 2], vec![3]],
        ..Sample::default()
    };
    let doc = t.mapper.to_document(&mut sample).unwrap();

    assert_eq!(doc.get("letter"), Some(&Value::String("λ".into())));
    assert_eq!(doc.get("float"), Some(&Value::Float(0.1)));
    assert_eq!(doc.get("born"), Some(&Value::DateTime(1_700_000_000_123)));
    assert_eq!(doc.get("seen"), Some(&Value::DateTime(86_400_000)));
    assert_eq!(doc.get("data"), Some(&Value::Bytes(vec![0, 1, 255])));
    assert_eq!(
        doc.get("grid"),
        Some(&Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3)]),
        ]))
    );
}

#[test]
fn wide_integers_narrow_on_decode() {
    let t = TestMapper::new();
    let mut sample = Sample::default();
    let mut doc = t.mapper.to_document(&mut sample).unwrap();
    doc.insert("byte", Value::Int(-7));
    doc.insert("short", Value::Float(300.0));
    doc.insert("float", Value::Int(2));

    let back: Sample = t.mapper.from_document(&doc).unwrap();
    assert_eq!(back.byte, Some(-7));
    assert_eq!(back.short, Some(300));
    assert_eq!(back.float, Some(2.0));
}

#[test]
fn out_of_range_value_skips_only_that_field() {
    let t = TestMapper::new();
    let mut sample = Sample {
        text: Some("kept".into()),
        ..Sample::default()
    };
    let mut doc = t.mapper.to_document(&mut sample).unwrap();
    doc.insert("byte", Value::Int(1_000));

    let back: Sample = t.mapper.from_document(&doc).unwrap();
    assert_eq!(back.byte, None);
    assert_eq!(back.text.as_deref(), Some("kept"));
}
