//! Tests for CSV ingestion, device normalization, and artifact writing

use chrono::{NaiveDate, NaiveTime};
use std::fs;
use tempfile::tempdir;
use txt_study_rust::error::TxtStudyError;
use txt_study_rust::file_writer;
use txt_study_rust::ingest::{self, DeviceKind};
use txt_study_rust::models::{AnalysisRow, MessageRecord, MessageType};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(contact: &str, text: &str, message_type: MessageType) -> MessageRecord {
    MessageRecord {
        date: date(2024, 7, 2),
        time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        message_type,
        contact: contact.to_string(),
        text: text.to_string(),
        reference_date: date(2024, 7, 1),
    }
}

#[test]
fn test_read_canonical_records() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("texts.csv");
    fs::write(
        &path,
        "Date,Time,MessageType,Contact,Text,USC_Date\n\
         2024-07-03,14:22:01,sent,Alice,hello there,2024-07-01\n\
         2024-07-04,08:05:00,received,Alice,,2024-07-01\n",
    )
    .unwrap();

    let records = ingest::read_records(&path).expect("Failed to read records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].date, date(2024, 7, 3));
    assert_eq!(records[0].message_type, MessageType::Sent);
    assert_eq!(records[0].contact, "Alice");
    assert_eq!(records[0].text, "hello there");
    assert_eq!(records[0].reference_date, date(2024, 7, 1));
    assert_eq!(records[1].message_type, MessageType::Received);
    assert_eq!(records[1].text, "");
}

#[test]
fn test_missing_column_is_named() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("texts.csv");
    fs::write(
        &path,
        "Date,Time,MessageType,Contact,Text\n2024-07-03,14:22:01,sent,Alice,hi\n",
    )
    .unwrap();

    let err = ingest::read_records(&path).unwrap_err();
    match err {
        TxtStudyError::MissingColumn(column) => assert_eq!(column, "USC_Date"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn test_unparsable_date_is_rejected() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("texts.csv");
    fs::write(
        &path,
        "Date,Time,MessageType,Contact,Text,USC_Date\nnot-a-date,14:22:01,sent,Alice,hi,2024-07-01\n",
    )
    .unwrap();

    let err = ingest::read_records(&path).unwrap_err();
    assert!(matches!(err, TxtStudyError::InvalidDate(_)));
}

#[test]
fn test_android_export_normalization() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("sms.csv");
    fs::write(
        &path,
        "address,contact_name,type2,readable_date,body,sub_id\n\
         +15551234567,Alice,1,\"Jul 05, 2024 02:11:09 PM\",incoming text,1\n\
         +15551234567,Alice,2,\"Jul 05, 2024 02:15:30 PM\",my reply,1\n",
    )
    .unwrap();

    let records = ingest::read_device_export(&path, DeviceKind::Android, date(2024, 7, 1))
        .expect("Failed to normalize Android export");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message_type, MessageType::Received);
    assert_eq!(records[1].message_type, MessageType::Sent);
    assert_eq!(records[0].date, date(2024, 7, 5));
    assert_eq!(records[0].time, NaiveTime::from_hms_opt(14, 11, 9).unwrap());
    assert_eq!(records[0].contact, "Alice");
    assert_eq!(records[1].text, "my reply");
    assert_eq!(records[0].reference_date, date(2024, 7, 1));
}

#[test]
fn test_android_unknown_type_code_fails() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("sms.csv");
    fs::write(
        &path,
        "contact_name,type2,readable_date,body\nAlice,3,\"Jul 05, 2024 02:11:09 PM\",hm\n",
    )
    .unwrap();

    assert!(ingest::read_device_export(&path, DeviceKind::Android, date(2024, 7, 1)).is_err());
}

#[test]
fn test_iphone_export_normalization() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("imessages.csv");
    fs::write(
        &path,
        "Chat Session,Type,Message Date,Text,Service\n\
         Phil,Incoming,2024-07-03 14:22:01,see you soon,iMessage\n\
         Phil,Outgoing,2024-07-03 14:26:27,on my way,iMessage\n",
    )
    .unwrap();

    let records = ingest::read_device_export(&path, DeviceKind::Iphone, date(2024, 7, 1))
        .expect("Failed to normalize iPhone export");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message_type, MessageType::Received);
    assert_eq!(records[1].message_type, MessageType::Sent);
    assert_eq!(records[1].date, date(2024, 7, 3));
    assert_eq!(records[1].time, NaiveTime::from_hms_opt(14, 26, 27).unwrap());
    assert_eq!(records[1].contact, "Phil");
}

#[test]
fn test_device_kind_parsing() {
    assert_eq!("iphone".parse::<DeviceKind>().unwrap(), DeviceKind::Iphone);
    assert_eq!("Android".parse::<DeviceKind>().unwrap(), DeviceKind::Android);
    assert!("palm".parse::<DeviceKind>().is_err());
}

#[test]
fn test_clear_received_text() {
    let mut records = vec![
        record("A", "mine", MessageType::Sent),
        record("A", "theirs", MessageType::Received),
    ];
    ingest::clear_received_text(&mut records);
    assert_eq!(records[0].text, "mine");
    assert_eq!(records[1].text, "");
}

#[test]
fn test_exclude_contacts_drops_whole_conversations() {
    let records = vec![
        record("A", "keep", MessageType::Sent),
        record("B", "drop", MessageType::Sent),
        record("B", "", MessageType::Received),
    ];
    let kept = ingest::exclude_contacts(records, &["B".to_string()]);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].contact, "A");
}

#[test]
fn test_retain_window_filters_by_date() {
    let reference = date(2024, 7, 1);
    let today = date(2025, 6, 15);
    let mut inside = record("A", "", MessageType::Sent);
    inside.date = date(2024, 8, 10);
    let mut recent = record("A", "", MessageType::Sent);
    recent.date = date(2025, 6, 1);
    let mut gap = record("A", "", MessageType::Sent);
    gap.date = date(2025, 2, 1);

    let kept = ingest::retain_window(vec![inside, recent, gap], reference, today, 3, 1);
    let dates: Vec<NaiveDate> = kept.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2024, 8, 10), date(2025, 6, 1)]);
}

#[test]
fn test_unique_contacts_first_seen_order() {
    let records = vec![
        record("B", "", MessageType::Sent),
        record("A", "", MessageType::Sent),
        record("B", "", MessageType::Received),
    ];
    assert_eq!(
        ingest::unique_contacts(&records),
        vec!["B".to_string(), "A".to_string()]
    );
}

#[test]
fn test_anonymized_csv_round_trips_through_ingest() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("anonymized.csv");
    let records = vec![
        record("<ABC123DEF456>", "see you at <PERSON_0>", MessageType::Sent),
        record("<ABC123DEF456>", "", MessageType::Received),
    ];

    file_writer::write_anonymized_csv(&records, &path).expect("Failed to write");
    let read_back = ingest::read_records(&path).expect("Failed to read back");

    assert_eq!(read_back.len(), 2);
    assert_eq!(read_back[0].contact, "<ABC123DEF456>");
    assert_eq!(read_back[0].text, "see you at <PERSON_0>");
    assert_eq!(read_back[1].message_type, MessageType::Received);
}

#[test]
fn test_existing_output_file_is_not_clobbered() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("anonymized.csv");
    let records = vec![record("A", "hi", MessageType::Sent)];

    file_writer::write_anonymized_csv(&records, &path).expect("First write should succeed");
    let err = file_writer::write_anonymized_csv(&records, &path).unwrap_err();
    assert!(matches!(err, TxtStudyError::FileExists(_)));
}

#[test]
fn test_analysis_csv_has_expected_header() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("analysis.csv");
    let rows = vec![AnalysisRow {
        pid: "0001".to_string(),
        month: -3,
        messages: String::new(),
        sent: 0,
        received: 0,
        unique_conversations: 0,
    }];

    file_writer::write_analysis_csv(&rows, &path).expect("Failed to write");
    let content = fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "PID,Month,Messages,Sent,Received,Unique Conversations"
    );
    assert_eq!(lines.next().unwrap(), "0001,-3,,0,0,0");
}

#[test]
fn test_name_list_writer() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("contacts.csv");
    let names = vec!["Leftover".to_string()];

    file_writer::write_name_list(&names, "Contacts_0001", &path).expect("Failed to write");
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "Contacts_0001\nLeftover\n");
}
