//! Scenario tests for the server core: arrival-order response writes under
//! out-of-order completion, timeout unblocking, overload rejection and
//! connection accounting.

mod support;

use std::rc::Rc;
use std::time::Duration;

use support::{StashHandler, TestConduit, TestWorker};
use tideline_pipeline::{
    ManualClock, MemorySink, ServerConfig, ServerMessage, ServiceServer, WriteOutcome,
};

type Server = Rc<ServiceServer<String, String, StashHandler, TestConduit<String>, ManualClock>>;

fn make_server(
    buffer_size: usize,
    timeout: Duration,
) -> (
    Server,
    StashHandler,
    TestConduit<String>,
    ManualClock,
    Rc<MemorySink>,
) {
    let clock = ManualClock::new();
    let sink = Rc::new(MemorySink::new());
    let handler = StashHandler::new();
    let conduit = TestConduit::new();

    let server = ServiceServer::new(
        ServerConfig::new("srv")
            .with_request_buffer_size(buffer_size)
            .with_request_timeout(timeout)
            .with_log_errors(false),
        handler.clone(),
        clock.clone(),
        sink.clone(),
    );
    server.connected(conduit.clone());
    (server, handler, conduit, clock, sink)
}

const SWEEP: Duration = Duration::from_millis(50);

/// S1: responses complete C, A, B but the wire sees A, B, C.
#[test]
fn reordered_completions_flush_in_arrival_order() {
    let (server, handler, conduit, _, sink) = make_server(4, Duration::from_secs(1));

    for request in ["a", "b", "c"] {
        server.process_message(request.to_string());
    }
    assert_eq!(sink.counter_value("srv.concurrent_requests"), 3);

    // C completes first; nothing can flush past the incomplete head.
    handler.resolve("c", "resp-c");
    assert!(conduit.written().is_empty());
    assert_eq!(sink.counter_value("srv.concurrent_requests"), 3);

    handler.resolve("a", "resp-a");
    assert_eq!(conduit.written(), vec!["resp-a".to_string()]);

    handler.resolve("b", "resp-b");
    assert_eq!(
        conduit.written(),
        vec![
            "resp-a".to_string(),
            "resp-b".to_string(),
            "resp-c".to_string()
        ]
    );

    assert_eq!(
        sink.counter_deltas("srv.concurrent_requests"),
        vec![1, 1, 1, -1, -1, -1]
    );
    assert_eq!(sink.counter_value("srv.concurrent_requests"), 0);
}

/// S2: a timed-out head flushes as an error response and unblocks the
/// completed request behind it.
#[test]
fn timeout_unblocks_completed_successors() {
    let (server, handler, conduit, clock, sink) =
        make_server(4, Duration::from_millis(100));

    server.process_message("a".to_string());
    clock.set(Duration::from_millis(10));
    server.process_message("b".to_string());

    clock.set(Duration::from_millis(20));
    handler.resolve("b", "resp-b");
    assert!(conduit.written().is_empty());

    clock.set(Duration::from_millis(150));
    server.idle_check(SWEEP);

    assert_eq!(
        conduit.written(),
        vec!["Timeout:a".to_string(), "resp-b".to_string()]
    );
    assert_eq!(sink.rate_count_tagged("srv.errors", "kind", "Timeout"), 1);
}

/// S3: above the soft limit a request is admitted, skipped and rejected in
/// its arrival slot.
#[test]
fn overload_rejects_in_arrival_slot() {
    let (server, handler, conduit, _, sink) = make_server(2, Duration::from_secs(1));

    for request in ["a", "b", "c"] {
        server.process_message(request.to_string());
    }

    // C never reached the user hook.
    assert_eq!(handler.processed(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(sink.rate_count_tagged("srv.errors", "kind", "Overloaded"), 1);

    handler.resolve("a", "resp-a");
    handler.resolve("b", "resp-b");

    assert_eq!(
        conduit.written(),
        vec![
            "resp-a".to_string(),
            "resp-b".to_string(),
            "Overloaded:c".to_string()
        ]
    );
}

/// Invariant 1: whatever order completions arrive in, the wire order is the
/// arrival order.
#[test]
fn order_preserved_under_all_completion_orders() {
    let permutations: [[&str; 3]; 6] = [
        ["a", "b", "c"],
        ["a", "c", "b"],
        ["b", "a", "c"],
        ["b", "c", "a"],
        ["c", "a", "b"],
        ["c", "b", "a"],
    ];

    for order in permutations {
        let (server, handler, conduit, _, _) = make_server(8, Duration::from_secs(1));
        for request in ["a", "b", "c"] {
            server.process_message(request.to_string());
        }
        for request in order {
            handler.resolve(request, &format!("resp-{request}"));
        }
        assert_eq!(
            conduit.written(),
            vec![
                "resp-a".to_string(),
                "resp-b".to_string(),
                "resp-c".to_string()
            ],
            "completion order {order:?} must not reorder the wire"
        );
    }
}

/// Invariant 2: a promise completes at most once; a late completion after
/// the timeout sweep is a no-op.
#[test]
fn late_completion_after_timeout_is_ignored() {
    let (server, handler, conduit, clock, _) = make_server(4, Duration::from_millis(100));

    server.process_message("a".to_string());
    clock.set(Duration::from_millis(200));
    server.idle_check(SWEEP);
    assert_eq!(conduit.written(), vec!["Timeout:a".to_string()]);

    // The handler still holds the slot and resolves it too late.
    handler.resolve("a", "late");
    assert_eq!(conduit.written(), vec!["Timeout:a".to_string()]);
}

/// Invariant 2, drop flavor: an abandoned slot maps to a failure response
/// instead of hanging until the sweep.
#[test]
fn abandoned_slot_becomes_failure_response() {
    let (server, handler, conduit, _, sink) = make_server(4, Duration::from_secs(1));

    server.process_message("a".to_string());
    handler.abandon("a");

    assert_eq!(conduit.written(), vec!["User:a".to_string()]);
    assert_eq!(sink.rate_count_tagged("srv.errors", "kind", "User"), 1);
}

/// Invariant 3: concurrent_requests returns to zero when the connection
/// closes with promises still queued.
#[test]
fn counter_symmetry_across_connection_close() {
    let (server, handler, _, _, sink) = make_server(8, Duration::from_secs(1));

    for request in ["a", "b", "c"] {
        server.process_message(request.to_string());
    }
    handler.resolve("a", "resp-a");
    assert_eq!(sink.counter_value("srv.concurrent_requests"), 2);

    server.connection_closed();
    assert_eq!(sink.counter_value("srv.concurrent_requests"), 0);
    assert_eq!(
        sink.histogram_values("srv.requests_per_connection"),
        vec![3.0]
    );
}

/// Graceful disconnect pauses reads, keeps flushing, and closes once the
/// queue drains.
#[test]
fn graceful_disconnect_drains_then_closes() {
    let (server, handler, conduit, _, _) = make_server(4, Duration::from_secs(1));

    server.process_message("a".to_string());
    server.process_message("b".to_string());
    server.graceful_disconnect();

    assert!(conduit.reads_paused());
    assert!(!conduit.closed());

    handler.resolve("a", "resp-a");
    assert!(!conduit.closed());

    handler.resolve("b", "resp-b");
    assert_eq!(
        conduit.written(),
        vec!["resp-a".to_string(), "resp-b".to_string()]
    );
    assert!(conduit.closed());
}

/// A rejected slot routes through the failure mapping like any other error.
#[test]
fn rejected_slot_maps_through_failure_hook() {
    let (server, handler, conduit, _, sink) = make_server(4, Duration::from_secs(1));

    server.process_message("a".to_string());
    handler.reject("a", tideline_pipeline::ServiceError::user("boom"));

    assert_eq!(conduit.written(), vec!["User:a".to_string()]);
    assert_eq!(sink.rate_count_tagged("srv.errors", "kind", "User"), 1);
}

/// A non-success write completion surfaces as a dropped-reply metric, not a
/// state change.
#[test]
fn failed_write_records_dropped_reply() {
    let (server, handler, conduit, _, sink) = make_server(4, Duration::from_secs(1));
    conduit.set_write_outcome(WriteOutcome::Failure);

    server.process_message("a".to_string());
    handler.resolve("a", "resp-a");

    assert_eq!(sink.rate_count("srv.dropped_replies"), 1);
    assert!(server.is_connected());
}

/// Responses carry the promise's creation time as the write tag.
#[test]
fn responses_carry_creation_timestamps() {
    let (server, handler, conduit, clock, _) = make_server(4, Duration::from_secs(1));

    clock.set(Duration::from_millis(5));
    server.process_message("a".to_string());
    clock.set(Duration::from_millis(30));
    handler.resolve("a", "resp-a");

    assert_eq!(conduit.written_stamps(), vec![Some(Duration::from_millis(5))]);
}

/// The idle sweep arrives as a worker message when scheduled.
#[test]
fn scheduled_idle_check_flows_through_worker() {
    let (server, _, conduit, clock, _) = make_server(4, Duration::from_millis(100));
    let worker: TestWorker<ServerMessage> = TestWorker::new();
    server.bind_worker(Box::new(worker.clone()));

    server.process_message("a".to_string());
    server.schedule(SWEEP, ServerMessage::IdleCheck { period: SWEEP });

    clock.set(Duration::from_millis(200));
    for (_, message) in worker.take_scheduled() {
        server.handle_message(message);
    }

    assert_eq!(conduit.written(), vec!["Timeout:a".to_string()]);
}
