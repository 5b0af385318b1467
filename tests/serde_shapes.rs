// How serde's data model maps onto CBOR items.
//
// Newtype structs are transparent: a `TimeStamp(HashMap<String, ByteBuf>)` is
// written as the map itself, not as an array holding a map.

use cbor_codec::{Cbor, CborConfig, CborError, Decoder, Schema, from_slice, to_vec};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use std::collections::HashMap;

fn definite() -> Cbor {
    Cbor::new(
        CborConfig::builder().definite_lengths(true).build(),
        Schema::new(),
    )
}

#[test]
fn test_newtype_hashmap_should_be_map_not_array() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TimeStamp(pub HashMap<String, ByteBuf>);

    let mut map = HashMap::new();
    map.insert("key1".to_string(), ByteBuf::from(vec![1, 2, 3]));
    map.insert("key2".to_string(), ByteBuf::from(vec![4, 5, 6]));
    let timestamp = TimeStamp(map);

    let cbor_bytes = definite().to_vec(&timestamp).expect("serialize");
    assert_eq!(
        cbor_bytes[0], 0xa2,
        "Newtype struct wrapping HashMap should serialize as a map, not as an array containing a map"
    );

    let deserialized: TimeStamp = from_slice(&cbor_bytes).expect("deserialize");
    assert_eq!(timestamp, deserialized);

    // same value, streamed
    let cbor_bytes = to_vec(&timestamp).expect("serialize");
    assert_eq!(cbor_bytes[0], 0xbf);
    assert_eq!(*cbor_bytes.last().unwrap(), 0xff);
    let deserialized: TimeStamp = from_slice(&cbor_bytes).expect("deserialize");
    assert_eq!(timestamp, deserialized);
}

#[test]
fn test_newtype_vec_transparent() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Items(pub Vec<String>);

    let items = Items(vec!["item1".to_string(), "item2".to_string()]);
    let cbor_bytes = definite().to_vec(&items).expect("serialize");
    assert_eq!(
        cbor_bytes[0], 0x82,
        "Newtype should be transparent, not wrapped in another array"
    );
    let deserialized: Items = from_slice(&cbor_bytes).expect("deserialize");
    assert_eq!(items, deserialized);
}

#[test]
fn test_explicitly_transparent_newtype() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(transparent)]
    struct TransparentMap(pub HashMap<String, String>);

    let mut map = HashMap::new();
    map.insert("key1".to_string(), "value1".to_string());
    let transparent = TransparentMap(map);

    let cbor_bytes = definite().to_vec(&transparent).expect("serialize");
    assert_eq!(cbor_bytes[0] >> 5, 5, "Transparent newtype should serialize as map");
    let deserialized: TransparentMap = from_slice(&cbor_bytes).expect("deserialize");
    assert_eq!(transparent, deserialized);
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
enum Shape {
    Point,
    Circle(f64),
    Segment(i32, i32),
    Rect { width: u16, height: u16 },
}

#[test]
fn test_enum_variants() {
    let cbor = definite();
    assert_eq!(
        cbor.to_vec(&Shape::Point).unwrap(),
        [&[0x65][..], b"Point"].concat()
    );
    assert_eq!(
        cbor.to_vec(&Shape::Segment(1, -1)).unwrap(),
        [&[0xa1, 0x67][..], b"Segment", &[0x82, 0x01, 0x20]].concat()
    );

    let shapes = vec![
        Shape::Point,
        Shape::Circle(0.5),
        Shape::Segment(-5, 500),
        Shape::Rect {
            width: 3,
            height: 4,
        },
    ];
    for writer in [Cbor::default(), definite()] {
        let bytes = writer.to_vec(&shapes).unwrap();
        let decoded: Vec<Shape> = from_slice(&bytes).unwrap();
        assert_eq!(decoded, shapes);

        let element = writer.to_element(&shapes).unwrap();
        let decoded: Vec<Shape> = writer.from_element(&element).unwrap();
        assert_eq!(decoded, shapes);
    }
}

#[test]
fn test_enum_map_with_two_entries_fails() {
    let mut bytes = vec![0xa2, 0x65];
    bytes.extend_from_slice(b"Point");
    bytes.push(0xf6);
    bytes.push(0x65);
    bytes.extend_from_slice(b"Point");
    bytes.push(0xf6);
    assert!(from_slice::<Shape>(&bytes).is_err());
}

#[test]
fn test_options_units_and_tuples() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Unit;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        maybe: Option<u32>,
        nothing: (),
        unit: Unit,
        pair: (String, i8),
        nested: Option<Option<bool>>,
    }

    let record = Record {
        maybe: None,
        nothing: (),
        unit: Unit,
        pair: ("x".to_string(), -8),
        nested: Some(Some(false)),
    };
    for writer in [Cbor::default(), definite()] {
        let bytes = writer.to_vec(&record).unwrap();
        assert_eq!(from_slice::<Record>(&bytes).unwrap(), record);
    }
}

#[test]
fn test_integer_limits() {
    let bytes = to_vec(&i64::MIN).unwrap();
    assert_eq!(bytes, vec![0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    assert_eq!(from_slice::<i64>(&bytes).unwrap(), i64::MIN);

    let bytes = to_vec(&u64::MAX).unwrap();
    assert_eq!(from_slice::<u64>(&bytes).unwrap(), u64::MAX);
    assert!(matches!(
        from_slice::<i64>(&bytes).unwrap_err(),
        CborError::OutOfRange { .. }
    ));

    let err = from_slice::<i8>(&to_vec(&200u8).unwrap()).unwrap_err();
    assert_eq!(err.to_string(), "value 200 is out of range for i8 [-128..127]");
    let err = from_slice::<u16>(&to_vec(&-1i8).unwrap()).unwrap_err();
    assert_eq!(err.to_string(), "value -1 is out of range for u16 [0..65535]");
}

#[test]
fn test_byte_strings() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Blob<'a> {
        #[serde(with = "serde_bytes")]
        owned: Vec<u8>,
        #[serde(borrow)]
        borrowed: &'a serde_bytes::Bytes,
    }

    let data = [9u8, 8, 7];
    let blob = Blob {
        owned: vec![1, 2],
        borrowed: serde_bytes::Bytes::new(&data),
    };
    let bytes = definite().to_vec(&blob).unwrap();
    let decoded: Blob = from_slice(&bytes).unwrap();
    assert_eq!(decoded, blob);

    // a byte string is not an array of integers
    assert!(from_slice::<Vec<u8>>(&[0x42, 0x01, 0x02]).is_err());
}

#[test]
fn test_borrowed_and_chunked_text() {
    let bytes = to_vec("borrowed").unwrap();
    let text: &str = from_slice(&bytes).unwrap();
    assert_eq!(text, "borrowed");

    // chunked text can only be decoded into an owned string
    let chunked = [0x7f, 0x61, b'a', 0x61, b'b', 0xff];
    assert_eq!(from_slice::<String>(&chunked).unwrap(), "ab");
    assert!(from_slice::<&str>(&chunked).is_err());
}

#[test]
fn test_trailing_data_is_rejected() {
    let mut bytes = to_vec(&1u8).unwrap();
    bytes.push(0x02);
    assert_eq!(
        from_slice::<u8>(&bytes).unwrap_err().to_string(),
        "Trailing data: 1 bytes remain after the top-level item"
    );
}

#[test]
fn test_truncated_input() {
    let bytes = to_vec(&vec!["abc".to_string()]).unwrap();
    let truncated = &bytes[..bytes.len() - 2];
    assert!(matches!(
        from_slice::<Vec<String>>(truncated).unwrap_err(),
        CborError::UnexpectedEof(_)
    ));
}

#[test]
fn test_transcode_to_json() {
    #[derive(Serialize)]
    struct Doc {
        title: &'static str,
        pages: Vec<u32>,
        ratio: f64,
        draft: Option<bool>,
    }
    let doc = Doc {
        title: "Report",
        pages: vec![1, 2, 3],
        ratio: 0.25,
        draft: None,
    };

    for writer in [Cbor::default(), definite()] {
        let bytes = writer.to_vec(&doc).unwrap();
        let mut decoder = Decoder::new(&bytes);
        let mut json = Vec::new();
        serde_transcode::transcode(&mut decoder, &mut serde_json::Serializer::new(&mut json))
            .unwrap();
        decoder.end().unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"title":"Report","pages":[1,2,3],"ratio":0.25,"draft":null}"#
        );
    }
}

#[test]
fn test_json_value_roundtrip() {
    let value: serde_json::Value = serde_json::from_str(r#"{"a":[1,-2,"x"],"b":true}"#).unwrap();
    let bytes = definite().to_vec(&value).unwrap();
    let element = cbor_codec::decode_element(&bytes).unwrap();
    assert_eq!(element.to_string(), r#"{"a": [1, -2, "x"], "b": true}"#);
    assert_eq!(from_slice::<serde_json::Value>(&bytes).unwrap(), value);
}

#[test]
fn test_tags_pass_through_self_describing_types() {
    // 32("x")
    let tagged = [0xd8, 0x20, 0x61, b'x'];
    assert_eq!(
        from_slice::<serde_json::Value>(&tagged).unwrap(),
        serde_json::Value::String("x".into())
    );

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(untagged)]
    enum Loose {
        Num(u64),
        Text(String),
    }
    assert_eq!(from_slice::<Loose>(&tagged).unwrap(), Loose::Text("x".into()));
    // 1(2(7))
    assert_eq!(from_slice::<Loose>(&[0xc1, 0xc2, 0x07]).unwrap(), Loose::Num(7));

    // {"url": 32("x"), "n": [1(1)]}
    let bytes = [
        &[0xa2, 0x63][..],
        b"url",
        &[0xd8, 0x20, 0x61, b'x', 0x61, b'n', 0x81, 0xc1, 0x01],
    ]
    .concat();
    let mut decoder = Decoder::new(&bytes);
    let mut json = Vec::new();
    serde_transcode::transcode(&mut decoder, &mut serde_json::Serializer::new(&mut json)).unwrap();
    decoder.end().unwrap();
    assert_eq!(String::from_utf8(json).unwrap(), r#"{"url":"x","n":[1]}"#);

    let element = cbor_codec::decode_element(&bytes).unwrap();
    assert_eq!(
        cbor_codec::from_element::<serde_json::Value>(&element).unwrap(),
        serde_json::json!({"url": "x", "n": [1]})
    );

    // the tag-aware types still see the tags
    let element: cbor_codec::CborElement = from_slice(&tagged).unwrap();
    assert_eq!(element.tags(), &[32]);
    let tagged: cbor_codec::Tagged<String> = from_slice(&tagged).unwrap();
    assert_eq!(tagged.tags, vec![32]);
    assert_eq!(tagged.value, "x");
}

#[test]
fn test_element_from_other_formats() {
    let element: cbor_codec::CborElement = serde_json::from_str(r#"[1, "x", {"k": null}]"#).unwrap();
    assert_eq!(element.to_string(), r#"[1, "x", {"k": null}]"#);
}
