use bsbi_index::{
    base::{Posting, TermRecord, WeightedPosting},
    utils::channel::{SequentialReader, SequentialWriter},
};
use rstest::rstest;
use temp_dir::TempDir;

fn record(term_id: u32) -> TermRecord<Posting> {
    let postings = (1..=term_id % 5 + 1)
        .map(|doc_id| Posting::new(doc_id * 3, term_id + doc_id))
        .collect();
    TermRecord::new(term_id, postings)
}

#[rstest]
#[case(1, 1)]
#[case(2, 3)]
#[case(7, 4)]
#[case(100, 100)]
fn test_bounded_round_trip(#[case] writer_capacity: usize, #[case] reader_capacity: usize) {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let path = dir.path().join("records.dat");

    let mut writer = SequentialWriter::create(&path, writer_capacity).unwrap();
    for term_id in 1..=20 {
        writer.append(record(term_id)).unwrap();
        assert!(writer.buffered() < writer_capacity);
    }
    let spans = writer.close().unwrap();
    assert_eq!(spans.len(), 20);
    assert!(spans.windows(2).all(|w| w[0].end() == w[1].offset));

    let mut reader = SequentialReader::<Posting>::open(&path, spans, reader_capacity).unwrap();
    for term_id in 1..=20 {
        assert!(reader.buffered() <= reader_capacity);
        assert_eq!(reader.remaining(), (21 - term_id) as usize);
        assert_eq!(reader.peek(), Some(&record(term_id)));
        assert_eq!(reader.pop().unwrap(), Some(record(term_id)));
    }
    assert!(reader.peek().is_none());
    assert!(reader.pop().unwrap().is_none());
}

#[test]
fn test_open_at() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let path = dir.path().join("records.dat");

    let mut writer = SequentialWriter::create(&path, 4).unwrap();
    for term_id in 1..=10 {
        writer.append(record(term_id)).unwrap();
    }
    let spans = writer.close().unwrap();

    let reader = SequentialReader::<Posting>::open_at(&path, spans.clone(), spans[6].offset, 2).unwrap();
    let term_ids: Vec<u32> = reader.map(|r| r.unwrap().term_id).collect();
    assert_eq!(term_ids, vec![7, 8, 9, 10]);
}

#[test]
fn test_truncate_previous_file() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let path = dir.path().join("records.dat");
    std::fs::write(&path, vec![0xff; 1000]).unwrap();

    let mut writer = SequentialWriter::create(&path, 2).unwrap();
    writer
        .append(TermRecord::new(3, vec![WeightedPosting::new(1, 2, 0.5)]))
        .unwrap();
    let spans = writer.close().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), spans[0].end());

    let mut reader = SequentialReader::<WeightedPosting>::open(&path, spans, 1).unwrap();
    let record = reader.pop().unwrap().unwrap();
    assert_eq!(record.postings, vec![WeightedPosting::new(1, 2, 0.5)]);
}

#[test]
fn test_truncated_file() {
    let dir = TempDir::new().expect("Could not create temporary directory");
    let path = dir.path().join("records.dat");

    let mut writer = SequentialWriter::create(&path, 2).unwrap();
    for term_id in 1..=3 {
        writer.append(record(term_id)).unwrap();
    }
    let spans = writer.close().unwrap();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(spans[2].offset + 2).unwrap();

    let mut reader = SequentialReader::<Posting>::open(&path, spans, 1).unwrap();
    assert!(reader.pop().unwrap().is_some());
    // The refill after the second record reaches the truncated one
    assert!(reader.pop().is_err());
}
