use std::io::{self, Write};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use qprof::report::{self, ExportOptions};
use qprof::{Error, OpRecord, OpTimes, Profile, VecSource};

fn calculated(events: &[(&str, &str, u64, u64)]) -> Profile {
    let mut prof = Profile::new();
    let queues: Vec<&str> = {
        let mut qs: Vec<_> = events.iter().map(|&(q, ..)| q).collect();
        qs.dedup();
        qs
    };
    for queue in queues {
        let records: Vec<_> = events
            .iter()
            .filter(|&&(q, ..)| q == queue)
            .map(|&(_, name, start, end)| OpRecord::new(name, OpTimes::span(start, end)))
            .collect();
        prof.add_queue(queue, Arc::new(VecSource::from(records)))
            .unwrap();
    }
    prof.calc().unwrap();
    prof
}

fn export_to_string(prof: &mut Profile, options: &ExportOptions) -> String {
    let mut buf = Vec::new();
    report::export(prof, options, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn default_format_without_zero_basing() {
    let mut prof = calculated(&[("Q1", "Event1", 10, 15), ("Q1", "Event2", 16, 20)]);
    let options = ExportOptions {
        zero_start: false,
        ..ExportOptions::default()
    };
    assert_eq!(
        export_to_string(&mut prof, &options),
        "Q1\t10\t15\tEvent1\nQ1\t16\t20\tEvent2\n"
    );
}

#[test]
fn zero_basing_subtracts_the_earliest_start() {
    let mut prof = calculated(&[("Q1", "Event1", 10, 15), ("Q1", "Event2", 16, 20)]);
    assert_eq!(
        export_to_string(&mut prof, &ExportOptions::default()),
        "Q1\t0\t5\tEvent1\nQ1\t6\t10\tEvent2\n"
    );
}

#[test]
fn lines_are_ordered_by_start_time_across_queues() {
    let mut prof = calculated(&[
        ("Q1", "late", 50, 60),
        ("Q2", "early", 5, 8),
        ("Q1", "middle", 20, 30),
    ]);
    let options = ExportOptions {
        zero_start: false,
        ..ExportOptions::default()
    };
    assert_eq!(
        export_to_string(&mut prof, &options),
        "Q2\t5\t8\tearly\nQ1\t20\t30\tmiddle\nQ1\t50\t60\tlate\n"
    );
}

#[test]
fn custom_delimiters_wrap_queue_and_event_names() {
    let mut prof = calculated(&[("Q1", "Event1", 10, 15)]);
    let options = ExportOptions {
        separator: ", ".to_string(),
        newline: ";\n".to_string(),
        queue_delim: "'".to_string(),
        evname_delim: "\"".to_string(),
        zero_start: false,
    };
    assert_eq!(
        export_to_string(&mut prof, &options),
        "'Q1', 10, 15, \"Event1\";\n"
    );
}

#[test]
fn export_round_trips_the_reference_workload() {
    let events = &[
        ("Q1", "Event1", 10, 15),
        ("Q1", "Event2", 16, 20),
        ("Q2", "Event3", 17, 30),
        ("Q1", "Event4", 19, 25),
        ("Q2", "Event5", 29, 40),
        ("Q2", "Event1", 35, 45),
        ("Q1", "Event1", 68, 69),
        ("Q2", "Event1", 50, 70),
    ];
    let mut prof = calculated(events);
    let options = ExportOptions {
        zero_start: false,
        ..ExportOptions::default()
    };
    let text = export_to_string(&mut prof, &options);

    let mut parsed: Vec<(String, String, u64, u64)> = text
        .lines()
        .map(|line| {
            let fields: Vec<_> = line.split('\t').collect();
            assert_eq!(fields.len(), 4, "malformed line: {:?}", line);
            (
                fields[0].to_string(),
                fields[3].to_string(),
                fields[1].parse().unwrap(),
                fields[2].parse().unwrap(),
            )
        })
        .collect();
    parsed.sort();

    let mut expected: Vec<(String, String, u64, u64)> = events
        .iter()
        .map(|&(q, name, start, end)| (q.to_string(), name.to_string(), start, end))
        .collect();
    expected.sort();

    assert_eq!(parsed, expected);
}

#[test]
fn export_before_calc_is_invalid() {
    let mut prof = Profile::new();
    let mut buf = Vec::new();
    assert!(matches!(
        report::export(&mut prof, &ExportOptions::default(), &mut buf),
        Err(Error::NotCalculated)
    ));
}

#[test]
fn write_failures_surface_without_invalidating_results() {
    struct FailingWriter;
    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut prof = calculated(&[("Q1", "Event1", 10, 15)]);
    let err = report::export(&mut prof, &ExportOptions::default(), FailingWriter).unwrap_err();
    assert!(matches!(err, Error::StreamWrite(_)));

    // The computed profile is untouched; retrying with a healthy writer
    // succeeds.
    assert_eq!(prof.total_time().unwrap(), 5);
    let mut buf = Vec::new();
    report::export(&mut prof, &ExportOptions::default(), &mut buf).unwrap();
    assert!(!buf.is_empty());
}

#[test]
fn process_wide_defaults_snapshot_and_replace() {
    let original = report::export_defaults();
    assert_eq!(original.separator, "\t");
    assert!(original.zero_start);

    let custom = ExportOptions {
        separator: ";".to_string(),
        ..original.clone()
    };
    report::set_export_defaults(custom.clone());
    assert_eq!(report::export_defaults(), custom);

    // Snapshots are copies: mutating one does not affect the stored
    // defaults.
    let mut snapshot = report::export_defaults();
    snapshot.separator = "|".to_string();
    assert_eq!(report::export_defaults().separator, ";");

    report::set_export_defaults(original);
}
