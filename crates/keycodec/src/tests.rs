use super::*;
use std::cmp::Ordering;

fn cell(row: &str, fam: &str, qual: &str, ts: u64, ty: CellType, val: &str) -> Cell {
    Cell::new(
        row.as_bytes().to_vec(),
        fam.as_bytes().to_vec(),
        qual.as_bytes().to_vec(),
        ts,
        ty,
        val.as_bytes().to_vec(),
    )
}

#[test]
fn orders_rows_ascending() {
    let a = cell("a", "cf", "q", 1, CellType::Put, "v");
    let b = cell("b", "cf", "q", 1, CellType::Put, "v");
    assert_eq!(compare(&a, &b), Ordering::Less);
}

#[test]
fn orders_timestamps_descending() {
    let newer = cell("r", "cf", "q", 20, CellType::Put, "v");
    let older = cell("r", "cf", "q", 10, CellType::Put, "v");
    assert_eq!(compare(&newer, &older), Ordering::Less);
}

#[test]
fn orders_type_ascending_within_equal_timestamp() {
    let put = cell("r", "cf", "q", 5, CellType::Put, "v");
    let del = cell("r", "cf", "q", 5, CellType::DeleteCell, "");
    assert_eq!(compare(&put, &del), Ordering::Less);
}

#[test]
fn round_trips_through_encode_decode() {
    let c = cell("row", "f", "qualifier", 42, CellType::Put, "value")
        .with_tags(vec![Tag::mvcc(7), Tag::new(9, vec![1, 2, 3])]);
    let mut buf = Vec::new();
    c.encode(&mut buf).unwrap();
    let back = Cell::decode(&mut &buf[..]).unwrap();
    assert_eq!(c, back);
    assert_eq!(back.tags[0].as_mvcc(), Some(7));
}

#[test]
fn decode_rejects_unknown_type_code() {
    let c = cell("r", "f", "q", 1, CellType::Put, "v");
    let mut buf = Vec::new();
    c.encode(&mut buf).unwrap();
    // type byte is the first byte after row/family/qualifier/timestamp header
    let type_offset = 2 + c.row.len() + 1 + c.family.len() + 4 + c.qualifier.len() + 8;
    buf[type_offset] = 0xEE;
    let err = Cell::decode(&mut &buf[..]).unwrap_err();
    assert!(matches!(err, CorruptEncoding::UnknownType(0xEE)));
}

#[test]
fn decode_rejects_truncated_input() {
    let c = cell("row", "f", "qualifier", 42, CellType::Put, "value");
    let mut buf = Vec::new();
    c.encode(&mut buf).unwrap();
    buf.truncate(buf.len() - 3);
    assert!(Cell::decode(&mut &buf[..]).is_err());
}

#[test]
fn compare_encoded_matches_compare() {
    let a = cell("row", "cf", "q", 100, CellType::Put, "v1");
    let b = cell("row", "cf", "q", 50, CellType::Put, "v2");
    let mut ea = Vec::new();
    let mut eb = Vec::new();
    a.encode(&mut ea).unwrap();
    b.encode(&mut eb).unwrap();
    assert_eq!(compare_encoded(&ea, &eb).unwrap(), compare(&a, &b));
}

#[test]
fn cell_key_is_ord_for_btree_use() {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    set.insert(CellKey(cell("b", "cf", "q", 1, CellType::Put, "v")));
    set.insert(CellKey(cell("a", "cf", "q", 1, CellType::Put, "v")));
    let rows: Vec<_> = set.iter().map(|k| k.0.row.clone()).collect();
    assert_eq!(rows, vec![b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn estimated_heap_size_grows_with_payload() {
    let small = cell("r", "f", "q", 1, CellType::Put, "");
    let big = cell("r", "f", "q", 1, CellType::Put, "a long value payload");
    assert!(big.estimated_heap_size() > small.estimated_heap_size());
}
