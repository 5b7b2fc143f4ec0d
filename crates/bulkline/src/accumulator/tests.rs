use super::*;
use crate::{
    QueuePolicy,
    testing::{ManualClock, RecordingSink},
};

struct Harness {
    accumulator: BulkAccumulator,
    sink: Arc<SinkWorker>,
    recorded: RecordingSink,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new(threshold: usize) -> Self {
        let clock = ManualClock::at(1_000);
        let recorded = RecordingSink::new("recording");
        let sink = Arc::new(SinkWorker::spawn(recorded.clone(), QueuePolicy::Unbounded).unwrap());
        let mut accumulator = BulkAccumulator::new(threshold, clock.clone()).unwrap();
        accumulator.attach(Arc::clone(&sink));
        Self {
            accumulator,
            sink,
            recorded,
            clock,
        }
    }

    fn ingest_all(&mut self, lines: &[&str]) {
        for line in lines {
            self.accumulator.ingest(line).unwrap();
        }
    }

    /// Drains the sink and returns the command lists it rendered.
    fn delivered(&self) -> Vec<Vec<String>> {
        self.sink.stop().unwrap();
        self.recorded.commands()
    }
}

fn strings(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

#[test]
fn zero_threshold_is_rejected() {
    let err = BulkAccumulator::new(0, ManualClock::at(0)).unwrap_err();
    assert!(matches!(err, Error::InvalidThreshold));
}

#[test]
fn partial_bulk_is_flushed_on_close() {
    let mut h = Harness::new(5);
    h.ingest_all(&["cmd1", "cmd2", "cmd3"]);
    assert_eq!(h.accumulator.pending().len(), 3);

    h.accumulator.close();

    assert!(h.accumulator.pending().is_empty());
    assert_eq!(h.delivered(), [strings(&["cmd1", "cmd2", "cmd3"])]);
}

#[test]
fn reaching_threshold_flushes_without_close() {
    let mut h = Harness::new(3);
    h.ingest_all(&["cmd1", "cmd2", "cmd3", "cmd4"]);

    // Only the full bulk went out; cmd4 is still pending.
    assert_eq!(h.accumulator.pending().commands(), ["cmd4"]);
    assert_eq!(h.delivered(), [strings(&["cmd1", "cmd2", "cmd3"])]);
}

#[test]
fn consecutive_bulks_keep_input_order() {
    let mut h = Harness::new(2);
    h.ingest_all(&["a", "b", "c", "d", "e"]);
    h.accumulator.close();

    assert_eq!(
        h.delivered(),
        [strings(&["a", "b"]), strings(&["c", "d"]), strings(&["e"])]
    );
}

#[test]
fn open_block_suspends_threshold() {
    let threshold = 3;
    let mut h = Harness::new(threshold);
    let commands: Vec<String> = (0..threshold + 5).map(|i| format!("cmd{i}")).collect();

    h.accumulator.ingest(OPEN_BLOCK).unwrap();
    for command in &commands {
        h.accumulator.ingest(command).unwrap();
    }
    assert_eq!(h.accumulator.pending().len(), threshold + 5);
    h.accumulator.ingest(CLOSE_BLOCK).unwrap();

    assert_eq!(h.delivered(), [commands]);
}

#[test]
fn open_block_flushes_partial_bulk_first() {
    let mut h = Harness::new(3);
    h.ingest_all(&["a", "b", "{", "c", "}"]);

    assert_eq!(h.delivered(), [strings(&["a", "b"]), strings(&["c"])]);
}

#[test]
fn nested_blocks_flush_only_at_outermost_close() {
    let mut h = Harness::new(1);
    h.ingest_all(&["{", "{", "cmd"]);
    assert_eq!(h.accumulator.depth(), 2);

    h.accumulator.ingest("}").unwrap();
    assert_eq!(h.accumulator.depth(), 1);
    assert_eq!(h.accumulator.pending().commands(), ["cmd"]);
    assert_eq!(h.accumulator.stats().bulks, 0);

    h.accumulator.ingest("}").unwrap();
    assert_eq!(h.accumulator.depth(), 0);
    assert!(h.accumulator.pending().is_empty());

    assert_eq!(h.delivered(), [strings(&["cmd"])]);
}

#[test]
fn nested_commands_form_one_bulk() {
    let mut h = Harness::new(2);
    h.ingest_all(&["{", "a", "{", "b", "c", "}", "d", "}", "e"]);
    h.accumulator.close();

    assert_eq!(
        h.delivered(),
        [strings(&["a", "b", "c", "d"]), strings(&["e"])]
    );
}

#[test]
fn created_at_is_time_of_first_command() {
    let mut h = Harness::new(3);

    h.accumulator.ingest("a").unwrap();
    h.clock.set(1_005);
    h.accumulator.ingest("b").unwrap();
    h.clock.set(1_010);
    h.accumulator.ingest("c").unwrap();

    h.clock.set(2_000);
    h.accumulator.ingest("d").unwrap();
    h.clock.set(3_000);
    h.accumulator.close();

    h.sink.stop().unwrap();
    let bulks = h.recorded.bulks();
    assert_eq!(bulks.len(), 2);
    assert_eq!(bulks[0].created_at(), 1_000);
    assert_eq!(bulks[1].created_at(), 2_000);
}

#[test]
fn close_inside_open_block_does_not_flush() {
    let mut h = Harness::new(2);
    h.ingest_all(&["a", "b", "{", "c", "d", "e"]);

    h.accumulator.close();

    assert_eq!(h.accumulator.depth(), 1);
    assert_eq!(h.accumulator.pending().commands(), ["c", "d", "e"]);
    assert_eq!(h.delivered(), [strings(&["a", "b"])]);
}

#[test]
fn empty_bulks_are_never_delivered() {
    let mut h = Harness::new(2);
    h.ingest_all(&["{", "}", "{", "{", "}", "}"]);
    h.accumulator.close();
    h.accumulator.close();

    assert_eq!(h.accumulator.stats().bulks, 0);
    assert!(h.delivered().is_empty());
}

#[test]
fn close_twice_flushes_once() {
    let mut h = Harness::new(5);
    h.ingest_all(&["a"]);
    h.accumulator.close();
    h.accumulator.close();

    assert_eq!(h.delivered(), [strings(&["a"])]);
}

#[test]
fn unmatched_close_is_rejected_without_underflow() {
    let mut h = Harness::new(2);
    h.ingest_all(&["a"]);

    let err = h.accumulator.ingest(CLOSE_BLOCK).unwrap_err();
    assert!(matches!(err, Error::UnmatchedClose));
    assert_eq!(h.accumulator.depth(), 0);
    assert_eq!(h.accumulator.pending().commands(), ["a"]);

    // The threshold rule still applies afterwards.
    h.ingest_all(&["b"]);
    assert_eq!(h.accumulator.stats().unmatched_closes, 1);
    assert_eq!(h.delivered(), [strings(&["a", "b"])]);
}

#[test]
fn delimiters_are_matched_literally() {
    let mut h = Harness::new(10);
    h.ingest_all(&[" {", "{{", "} ", "x}"]);
    h.accumulator.close();

    assert_eq!(h.accumulator.depth(), 0);
    assert_eq!(h.delivered(), [strings(&[" {", "{{", "} ", "x}"])]);
}

#[test]
fn stats_count_lines_commands_and_bulks() {
    let mut h = Harness::new(2);
    h.ingest_all(&["a", "b", "{", "c", "}", "d"]);
    h.accumulator.close();

    assert_eq!(
        h.accumulator.stats(),
        AccumulatorStats {
            lines: 6,
            commands: 4,
            bulks: 3,
            unmatched_closes: 0,
        }
    );
}

#[test]
fn every_attached_sink_receives_each_bulk() {
    let mut h = Harness::new(2);
    let second = RecordingSink::new("second");
    let second_sink = Arc::new(SinkWorker::spawn(second.clone(), QueuePolicy::Unbounded).unwrap());
    h.accumulator.attach(Arc::clone(&second_sink));

    h.ingest_all(&["a", "b", "c"]);
    h.accumulator.close();

    second_sink.stop().unwrap();
    let expected = [strings(&["a", "b"]), strings(&["c"])];
    assert_eq!(second.commands(), expected);
    assert_eq!(h.delivered(), expected);
}

#[test]
fn attach_is_idempotent_and_detach_stops_delivery() {
    let mut h = Harness::new(1);
    h.accumulator.attach(Arc::clone(&h.sink));
    assert_eq!(h.accumulator.sinks().len(), 1);

    h.ingest_all(&["a"]);
    assert!(h.accumulator.detach(&Arc::clone(&h.sink)));
    assert!(!h.accumulator.detach(&Arc::clone(&h.sink)));
    h.ingest_all(&["b"]);

    assert_eq!(h.accumulator.stats().bulks, 2);
    assert_eq!(h.delivered(), [strings(&["a"])]);
}

#[test]
fn flush_after_sink_stopped_does_not_panic() {
    let mut h = Harness::new(1);
    h.sink.stop().unwrap();

    h.ingest_all(&["late"]);

    assert_eq!(h.accumulator.stats().bulks, 1);
    assert!(h.recorded.bulks().is_empty());
}

#[test]
fn empty_lines_never_form_part_of_a_bulk() {
    let mut h = Harness::new(2);
    h.ingest_all(&[""]);
    assert!(h.accumulator.pending().is_empty());

    h.clock.set(1_005);
    h.ingest_all(&["a", "", "{", "", "}", "b"]);
    h.accumulator.close();

    assert_eq!(h.accumulator.stats().lines, 4);
    assert_eq!(h.accumulator.stats().commands, 2);
    h.sink.stop().unwrap();
    let bulks = h.recorded.bulks();
    assert_eq!(bulks.len(), 2);
    assert_eq!(bulks[0].commands(), ["a"]);
    assert_eq!(bulks[0].created_at(), 1_005);
    assert_eq!(bulks[1].commands(), ["b"]);
}
