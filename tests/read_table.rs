use rfcread::error::{RfcErrorGroup, RfcRc};
use rfcread::*;

mod common;
use common::{init_logging, read_table_response, FakeSession};

#[test]
fn empty_data_returns_fields_only() {
    init_logging();
    let session = FakeSession::new().respond(Ok(read_table_response(&[], &["MANDT", "MTEXT"])));
    let mut reader = TableReader::new(session);

    let result = reader.read_table(&ReadTableRequest::new("T000")).unwrap();

    assert!(result.rows.is_empty());
    let names: Vec<&str> = result.fields.iter().map(|f| f.fieldname.as_str()).collect();
    assert_eq!(names, vec!["MANDT", "MTEXT"]);
}

#[test]
fn rows_are_trimmed_and_keyed_by_field() {
    init_logging();
    let session = FakeSession::new().respond(Ok(read_table_response(
        &["A1 |B2 |C3", "  x|y  |z "],
        &["F1", "F2", "F3"],
    )));
    let mut reader = TableReader::new(session);

    let result = reader.read_table(&ReadTableRequest::new("ZTAB")).unwrap();

    assert_eq!(result.rows.len(), 2);
    let first: Vec<(&str, &str)> = result.rows[0].iter().collect();
    assert_eq!(first, vec![("F1", "A1"), ("F2", "B2"), ("F3", "C3")]);
    assert_eq!(result.rows[1].get("F1"), Some("x"));
    assert_eq!(result.rows[1].get("F2"), Some("y"));
    assert_eq!(result.rows[1].get("F3"), Some("z"));
}

#[test]
fn sends_all_arguments() {
    init_logging();
    let session = FakeSession::new().respond(Ok(read_table_response(&[], &["BNAME"])));
    let mut reader = TableReader::new(session);

    let request = ReadTableRequest::new("USR02")
        .no_data("X")
        .rowskips(100)
        .rowcount(50)
        .options("USTYP = \"A\"")
        .fields(vec!["BNAME"]);
    reader.read_table(&request).unwrap();

    let session = reader.into_session();
    assert_eq!(session.calls.len(), 1);
    let (function, args) = &session.calls[0];
    assert_eq!(function, RFC_READ_TABLE);
    assert_eq!(args.require_str("QUERY_TABLE").unwrap(), "USR02");
    assert_eq!(args.require_str("DELIMITER").unwrap(), "|");
    assert_eq!(args.require_str("NO_DATA").unwrap(), "X");
    assert_eq!(args.get("ROWSKIPS"), Some(&RfcValue::RfcInt(100)));
    assert_eq!(args.get("ROWCOUNT"), Some(&RfcValue::RfcInt(50)));
    let options = args.require_table("OPTIONS").unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].require_str("TEXT").unwrap(), "USTYP = 'A'");
    let fields = args.require_table("FIELDS").unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].require_str("FIELDNAME").unwrap(), "BNAME");
}

#[test]
fn field_order_comes_from_response() {
    init_logging();
    let session = FakeSession::new().respond(Ok(read_table_response(
        &["001|Client 001"],
        &["MANDT", "MTEXT"],
    )));
    let mut reader = TableReader::new(session);

    let result = reader
        .read_table(&ReadTableRequest::new("T000").fields(vec!["MTEXT", "MANDT"]))
        .unwrap();

    let names: Vec<&str> = result.fields.iter().map(|f| f.fieldname.as_str()).collect();
    assert_eq!(names, vec!["MANDT", "MTEXT"]);
    assert_eq!(result.rows[0].get("MANDT"), Some("001"));
    assert_eq!(result.rows[0].get("MTEXT"), Some("Client 001"));
}

#[test]
fn no_fields_sends_empty_projection() {
    init_logging();
    let session = FakeSession::new().respond(Ok(read_table_response(
        &["001|Client 001|Walldorf"],
        &["MANDT", "MTEXT", "ORT01"],
    )));
    let mut reader = TableReader::new(session);

    let result = reader.read_table(&ReadTableRequest::new("T000")).unwrap();

    assert_eq!(result.rows[0].get("ORT01"), Some("Walldorf"));
    let session = reader.into_session();
    assert!(session.calls[0].1.require_table("FIELDS").unwrap().is_empty());
}

#[test]
fn short_rows_truncate_to_available_segments() {
    init_logging();
    let session = FakeSession::new().respond(Ok(read_table_response(
        &["A1|B2"],
        &["F1", "F2", "F3"],
    )));
    let mut reader = TableReader::new(session);

    let result = reader.read_table(&ReadTableRequest::new("ZTAB")).unwrap();

    let row = &result.rows[0];
    assert_eq!(row.len(), 2);
    assert_eq!(row.get("F2"), Some("B2"));
    assert_eq!(row.get("F3"), None);
}

#[test]
fn custom_delimiter_is_sent_and_used_for_splitting() {
    init_logging();
    let session = FakeSession::new().respond(Ok(read_table_response(
        &["a|b;c"],
        &["F1", "F2"],
    )));
    let mut reader = TableReader::new(session);

    let result = reader
        .read_table(&ReadTableRequest::new("ZTAB").delimiter(';'))
        .unwrap();

    assert_eq!(result.rows[0].get("F1"), Some("a|b"));
    assert_eq!(result.rows[0].get("F2"), Some("c"));
    let session = reader.into_session();
    assert_eq!(session.calls[0].1.require_str("DELIMITER").unwrap(), ";");
}

#[test]
fn session_is_reused_across_calls() {
    init_logging();
    let session = FakeSession::new()
        .respond(Ok(read_table_response(&["1"], &["F1"])))
        .respond(Ok(read_table_response(&["2"], &["F1"])));
    let mut reader = TableReader::new(session);

    let first = reader.read_table(&ReadTableRequest::new("ZTAB").rowcount(1)).unwrap();
    let second = reader
        .read_table(&ReadTableRequest::new("ZTAB").rowskips(1).rowcount(1))
        .unwrap();

    assert_eq!(first.rows[0].get("F1"), Some("1"));
    assert_eq!(second.rows[0].get("F1"), Some("2"));
    assert_eq!(reader.session().calls.len(), 2);
}

#[test]
fn remote_errors_propagate_unchanged() {
    init_logging();
    let mut info = RfcErrorInfo::new();
    info.code = RfcRc::RfcAbapException;
    info.group = RfcErrorGroup::AbapApplicationFailure;
    for (dst, src) in info.key.iter_mut().zip("TABLE_NOT_AVAILABLE".encode_utf16()) {
        *dst = src;
    }
    let session = FakeSession::new().respond(Err(info.into()));
    let mut reader = TableReader::new(session);

    match reader.read_table(&ReadTableRequest::new("NOPE")) {
        Err(Error::Rfc(e)) => {
            assert_eq!(e.code, RfcRc::RfcAbapException);
            assert_eq!(e.key(), "TABLE_NOT_AVAILABLE");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(reader.session().calls.len(), 1);
}

#[test]
fn invalid_request_makes_no_call() {
    init_logging();
    let mut reader = TableReader::new(FakeSession::new());

    assert!(matches!(
        reader.read_table(&ReadTableRequest::new("")),
        Err(Error::InvalidRequest(_))
    ));
    assert!(reader.session().calls.is_empty());
}

#[test]
fn borrowed_session_works() {
    init_logging();
    let mut session = FakeSession::new().respond(Ok(read_table_response(&["x"], &["F1"])));
    {
        let mut reader = TableReader::new(&mut session);
        reader.read_table(&ReadTableRequest::new("ZTAB")).unwrap();
    }
    assert_eq!(session.calls.len(), 1);
}
