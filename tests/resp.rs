use pedis::{Reader, Value};
use std::io::Cursor;

#[test]
fn parse_ping_set_get_pipeline() {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"*1\r\n$4\r\nPING\r\n");
    buf.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n");
    buf.extend_from_slice(b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n");

    let mut reader = Reader::new(Cursor::new(buf));

    let ping = reader.read_value().unwrap();
    assert_eq!(ping.as_array().unwrap()[0].as_bulk(), Some(&b"PING"[..]));

    let set = reader.read_value().unwrap();
    let set_items = set.as_array().unwrap();
    assert_eq!(set_items[0].as_bulk(), Some(&b"SET"[..]));
    assert_eq!(set_items[1].as_bulk(), Some(&b"a"[..]));
    assert_eq!(set_items[2].as_bulk(), Some(&b"1"[..]));

    let get = reader.read_value().unwrap();
    let get_items = get.as_array().unwrap();
    assert_eq!(get_items[0].as_bulk(), Some(&b"GET"[..]));
    assert_eq!(get_items[1].as_bulk(), Some(&b"a"[..]));
}

#[test]
fn null_bulk_and_null_array_are_distinct_from_empty() {
    assert_eq!(pedis::encode(&Value::BulkString(None)), b"$-1\r\n");
    assert_eq!(pedis::encode(&Value::Array(None)), b"*-1\r\n");
    assert_eq!(pedis::encode(&Value::bulk(Vec::new())), b"$0\r\n\r\n");
    assert_eq!(pedis::encode(&Value::array(Vec::new())), b"*0\r\n");
}
