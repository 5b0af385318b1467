// The CborElement tree: both readers (serde and direct), both writers
// (bytes and tree), and diagnostic output.

use cbor_codec::{
    Cbor, CborConfig, CborElement, CborError, CborMap, Schema, Sign, Tagged, decode_element,
    encode_element, from_element, from_slice, to_element,
};
use serde::{Deserialize, Serialize};

fn both_readers(bytes: &[u8]) -> CborElement {
    let direct = decode_element(bytes).unwrap();
    let via_serde: CborElement = from_slice(bytes).unwrap();
    assert_eq!(direct, via_serde, "readers disagree on {bytes:02x?}");
    direct
}

fn sample() -> CborElement {
    let mut inner = CborMap::new();
    inner.insert(CborElement::from(1), CborElement::bytes(vec![0xde, 0xad]));
    inner.insert(
        CborElement::list(vec![CborElement::from(1), CborElement::from(2)]),
        CborElement::null(),
    );
    let mut map = CborMap::new();
    map.insert(CborElement::from("z"), CborElement::from(-500));
    map.insert(CborElement::from("inner"), CborElement::map(inner).with_tags([24]));
    map.insert(
        CborElement::from("list"),
        CborElement::list(vec![
            CborElement::from(2.5),
            CborElement::from(true),
            CborElement::negative(u64::MAX),
            CborElement::unsigned(u64::MAX).with_tags([2, 3]),
        ]),
    );
    CborElement::map(map).with_tags([55799])
}

#[test]
fn test_both_writers_and_readers_agree() {
    let element = sample();
    for config in [
        CborConfig::default(),
        CborConfig::builder().definite_lengths(true).build(),
    ] {
        let cbor = Cbor::new(config, Schema::new());
        let bytes = cbor.encode_element(&element).unwrap();
        assert_eq!(&bytes[..3], &[0xd9, 0xd9, 0xf7]);
        assert_eq!(both_readers(&bytes), element);

        let tree = cbor.to_element(&element).unwrap();
        assert_eq!(tree, element);
        let back: CborElement = cbor.from_element(&tree).unwrap();
        assert_eq!(back, element);
    }
}

#[test]
fn test_map_keeps_insertion_order() {
    let element = both_readers(&[0xa2, 0x61, b'b', 0x01, 0x61, b'a', 0x02]);
    let map = element.as_map().unwrap();
    let keys: Vec<&str> = map.keys().filter_map(CborElement::as_str).collect();
    assert_eq!(keys, ["b", "a"]);
    assert_eq!(element.to_string(), r#"{"b": 1, "a": 2}"#);
    assert_eq!(
        encode_element(&element).unwrap(),
        vec![0xbf, 0x61, b'b', 0x01, 0x61, b'a', 0x02, 0xff]
    );
}

#[test]
fn test_duplicate_map_key_keeps_last_value() {
    let element = both_readers(&[0xa2, 0x61, b'k', 0x01, 0x61, b'k', 0x02]);
    let map = element.as_map().unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get_str("k").and_then(CborElement::as_i64), Some(2));
}

#[test]
fn test_half_floats() {
    let cases: [([u8; 3], f64); 6] = [
        ([0xf9, 0x00, 0x00], 0.0),
        ([0xf9, 0x3c, 0x00], 1.0),
        ([0xf9, 0xc4, 0x00], -4.0),
        ([0xf9, 0x7b, 0xff], 65504.0),
        ([0xf9, 0x00, 0x01], 5.960464477539063e-8),
        ([0xf9, 0x7c, 0x00], f64::INFINITY),
    ];
    for (bytes, expected) in cases {
        assert_eq!(both_readers(&bytes).as_f64(), Some(expected));
        assert_eq!(from_slice::<f64>(&bytes).unwrap(), expected);
    }
    assert!(both_readers(&[0xf9, 0x7e, 0x00]).as_f64().unwrap().is_nan());
    assert_eq!(both_readers(&[0xf9, 0xfc, 0x00]).to_string(), "-Infinity");
}

#[test]
fn test_floats_are_written_as_double() {
    let element = both_readers(&[0xfa, 0x3f, 0xc0, 0x00, 0x00]);
    assert_eq!(element.as_f64(), Some(1.5));
    assert_eq!(
        encode_element(&element).unwrap(),
        vec![0xfb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn test_single_precision_from_tree() {
    assert_eq!(from_element::<f32>(&CborElement::float(1.5)).unwrap(), 1.5);
    assert_eq!(from_element::<f32>(&CborElement::float(f64::INFINITY)).unwrap(), f32::INFINITY);
    // too large for f32, as a double header would be on the byte path
    assert!(from_element::<f32>(&CborElement::float(1e300)).is_err());
    assert!(from_slice::<f32>(&[0xfb, 0x7e, 0x37, 0xe4, 0x3c, 0x88, 0x00, 0x75, 0x9c]).is_err());
    assert_eq!(from_element::<f64>(&CborElement::float(1e300)).unwrap(), 1e300);
}

#[test]
fn test_chunked_and_indefinite_items() {
    let text = both_readers(&[0x7f, 0x61, b'a', 0x61, b'b', 0xff]);
    assert_eq!(text.as_str(), Some("ab"));

    let bytes = both_readers(&[0x5f, 0x41, 0x01, 0x41, 0x02, 0xff]);
    assert_eq!(bytes.as_bytes(), Some(&[1u8, 2][..]));

    let list = both_readers(&[0x9f, 0x01, 0x9f, 0xff, 0xff]);
    assert_eq!(list.as_list().map(<[_]>::len), Some(2));
    assert_eq!(list.to_string(), "[1, []]");

    let map = both_readers(&[0xbf, 0x61, b'k', 0xf7, 0xff]);
    assert!(map.as_map().unwrap().get_str("k").unwrap().is_null());
}

#[test]
fn test_non_text_keys() {
    let element = both_readers(&[0xa2, 0x01, 0x61, b'a', 0x82, 0x01, 0x02, 0xf5]);
    let map = element.as_map().unwrap();
    assert_eq!(map.get(&CborElement::from(1)).and_then(CborElement::as_str), Some("a"));
    let key = CborElement::list(vec![CborElement::from(1), CborElement::from(2)]);
    assert_eq!(map.get(&key).and_then(CborElement::as_bool), Some(true));
}

#[test]
fn test_tags_in_diagnostic_notation() {
    let element = both_readers(&[0xd8, 0x64, 0xd8, 0xc8, 0x82, 0x01, 0x61, b'x']);
    assert_eq!(element.tags(), &[100, 200]);
    assert_eq!(element.to_string(), r#"100(200([1, "x"]))"#);
    assert_eq!(
        CborElement::bytes(vec![0x01, 0xff]).with_tags([24]).to_string(),
        "24(h'01ff')"
    );

    let tagged: Tagged<CborElement> = from_element(&element).unwrap();
    assert_eq!(tagged.tags, vec![100, 200]);
    assert_eq!(tagged.value.to_string(), r#"[1, "x"]"#);
}

#[test]
fn test_big_negative() {
    let element = both_readers(&[0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    assert!(matches!(
        element,
        CborElement::Integer {
            magnitude: u64::MAX,
            sign: Sign::Negative,
            ..
        }
    ));
    assert_eq!(element.as_i64(), None);
    assert_eq!(element.as_i128(), Some(-18446744073709551616));
    assert_eq!(element.to_string(), "-18446744073709551616");
}

#[test]
fn test_typed_values_through_the_tree() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Reading {
        sensor: String,
        values: Vec<i32>,
        calibrated: Option<bool>,
    }

    let reading = Reading {
        sensor: "t1".into(),
        values: vec![-3, 0, 70000],
        calibrated: None,
    };
    let element = to_element(&reading).unwrap();
    assert_eq!(
        element.to_string(),
        r#"{"sensor": "t1", "values": [-3, 0, 70000], "calibrated": null}"#
    );
    assert_eq!(from_element::<Reading>(&element).unwrap(), reading);

    // edits to the tree show up in the typed value
    let mut map = element.as_map().unwrap().clone();
    map.insert(CborElement::from("calibrated"), CborElement::from(true));
    let edited: Reading = from_element(&CborElement::map(map)).unwrap();
    assert_eq!(edited.calibrated, Some(true));
}

#[test]
fn test_decode_element_errors() {
    assert!(matches!(
        decode_element(&[0x01, 0x02]).unwrap_err(),
        CborError::TrailingData(1)
    ));
    assert!(matches!(
        decode_element(&[0x82, 0x01]).unwrap_err(),
        CborError::UnexpectedEof(_)
    ));
    // a lone break is not a data item
    assert!(decode_element(&[0xff]).is_err());
    assert!(decode_element(&[0x62, 0xff, 0xfe]).is_err());
}
