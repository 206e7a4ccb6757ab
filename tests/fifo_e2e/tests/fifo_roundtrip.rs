// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: FIFO device end-to-end tests through fifod (registration -> dispatcher -> device)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 6 tests
//!
//! TEST_SCOPE:
//!   - Truncating transfers observed by remote callers
//!   - Fault and argument errors leave the queue untouched
//!   - Many clients sharing one device over loopback
//!
//! TEST_SCENARIOS:
//!   - overflow_then_partial_reads(): 1100-byte write into 1024, two 500-byte reads
//!   - empty_and_zero_length_requests(): capacity 4096, zero-length no-ops
//!   - full_queue_rejects_further_writes(): mixed message then write returns 0
//!   - invalid_requests_do_not_mutate(): negative, oversized, faulting requests
//!   - handles_share_one_queue(): bytes written on one handle read on another
//!   - concurrent_clients_conserve_bytes(): 4 writers, 4 readers, seeded sizes
//!
//! ADR: docs/adr/0017-service-architecture.md

use std::sync::Arc;
use std::thread;

use fifod::protocol::Status;
use fifod::{FifoClient, FifoConfig, FifoService, LoopbackClient};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn start(capacity: usize) -> (FifoService, FifoClient<LoopbackClient>, u32) {
    let mut config = FifoConfig::default();
    config.queue.capacity = capacity;
    config.limits.max_request_len = 8192;
    let service = FifoService::start(&config).expect("start");
    let (transport, _server) = service.spawn_loopback();
    let mut client = FifoClient::new(transport);
    let handle = client.open(service.node_path()).expect("open");
    (service, client, handle)
}

#[test]
fn overflow_then_partial_reads() {
    let (service, mut client, h) = start(1024);
    assert_eq!(client.write(h, &[b'a'; 1100]).unwrap(), 1024);
    assert_eq!(client.read(h, 500).unwrap(), vec![b'a'; 500]);
    assert_eq!(service.device().len(), 524);
    assert_eq!(client.read(h, 500).unwrap().len(), 500);
    assert_eq!(service.device().len(), 24);
}

#[test]
fn empty_and_zero_length_requests() {
    let (service, mut client, h) = start(4096);
    assert!(client.read(h, 1).unwrap().is_empty());
    assert_eq!(client.write(h, b"").unwrap(), 0);
    assert_eq!(client.write(h, b"A").unwrap(), 1);
    assert!(client.read(h, 0).unwrap().is_empty());
    assert_eq!(service.device().len(), 1);
    assert_eq!(client.read(h, 10).unwrap(), b"A");
}

#[test]
fn full_queue_rejects_further_writes() {
    let (service, mut client, h) = start(1024);
    let mut message = vec![b'a'; 499];
    message.extend_from_slice(&[b'b'; 500]);
    message.extend_from_slice(&[b'c'; 101]);
    assert_eq!(client.write(h, &message).unwrap(), 1024);
    assert_eq!(client.write(h, b"more").unwrap(), 0);
    assert_eq!(client.read(h, 2000).unwrap(), &message[..1024]);
    assert!(service.device().is_empty());
    let stats = service.device().stats();
    assert_eq!(stats.total_enqueued, 1024);
    assert_eq!(stats.truncated_bytes, 1100 - 1024 + 4);
}

#[test]
fn invalid_requests_do_not_mutate() {
    let (service, mut client, h) = start(64);
    client.write(h, b"keep").unwrap();

    let status = |err: fifod::ClientError| err.status();
    assert_eq!(status(client.read_raw(h, -1, 16).unwrap_err()), Some(Status::InvalidArgument));
    assert_eq!(status(client.read_raw(h, 8193, 16).unwrap_err()), Some(Status::InvalidArgument));
    assert_eq!(status(client.write_raw(h, i64::MIN, b"x").unwrap_err()), Some(Status::InvalidArgument));
    assert_eq!(status(client.write_raw(h, 10, b"short").unwrap_err()), Some(Status::BadAddress));
    assert_eq!(status(client.read_raw(h, 4, 2).unwrap_err()), Some(Status::BadAddress));
    assert_eq!(service.device().len(), 4);

    // Requests within the mapped buffer still succeed after faults.
    assert_eq!(client.read_raw(h, 2, 2).unwrap(), b"ke");
    assert_eq!(client.read(h, 10).unwrap(), b"ep");
}

#[test]
fn handles_share_one_queue() {
    let (service, mut client, h) = start(1024);
    let second = client.open(service.node_path()).unwrap();
    assert_ne!(h, second);
    assert_eq!(service.device().openers(), 2);
    client.write(h, b"ping").unwrap();
    assert_eq!(client.read(second, 4).unwrap(), b"ping");
    client.close(second).unwrap();
    assert_eq!(service.dispatcher().open_handles(), 1);
}

#[test]
fn concurrent_clients_conserve_bytes() {
    let (service, client, _h) = start(1024);
    drop(client);
    let (transport, _server) = service.spawn_loopback();
    let totals = Arc::new(Mutex::new((0usize, 0usize)));
    let node = service.node_path().to_string();

    let workers: Vec<_> = (0..8u64)
        .map(|seed| {
            let mut client = FifoClient::new(transport.clone());
            let totals = totals.clone();
            let node = node.clone();
            thread::spawn(move || {
                let h = client.open(&node).unwrap();
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..200 {
                    let size = rng.gen_range(0..=1100);
                    if seed % 2 == 0 {
                        let n = client.write(h, &vec![b'x'; size]).unwrap();
                        assert!(n <= size);
                        totals.lock().0 += n;
                    } else {
                        let got = client.read(h, size).unwrap();
                        assert!(got.len() <= size);
                        assert!(got.iter().all(|b| *b == b'x'));
                        totals.lock().1 += got.len();
                    }
                }
                client.close(h).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let (written, read) = *totals.lock();
    assert!(service.device().len() <= 1024);
    assert_eq!(written, read + service.device().len());
    assert_eq!(service.device().openers(), 1);
}
