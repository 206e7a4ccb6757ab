// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scripted and randomized request sequences with a running transcript.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use log::{debug, warn};
use rand::Rng;

use crate::endpoint::Endpoint;
use crate::model::QueueModel;

/// Receive buffer size used by the interactive read-back.
pub const RECEIVE_LEN: usize = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    Read,
    Write,
}

/// One request as issued, reported by the device and predicted by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub requested: usize,
    pub reported: usize,
    pub expected: usize,
    /// Whether the bytes read back matched the model (always true for writes).
    pub content_ok: bool,
}

impl Step {
    pub fn is_mismatch(&self) -> bool {
        self.reported != self.expected || !self.content_ok
    }
}

#[derive(Clone, Debug, Default)]
pub struct Report {
    pub steps: Vec<Step>,
}

impl Report {
    pub fn mismatches(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|step| step.is_mismatch())
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches().next().is_none()
    }
}

/// Issues requests against an endpoint, printing a transcript and checking each count.
pub struct Exerciser<'o, E> {
    endpoint: E,
    model: QueueModel,
    out: &'o mut dyn Write,
    report: Report,
}

impl<'o, E: Endpoint> Exerciser<'o, E> {
    pub fn new(endpoint: E, capacity: usize, out: &'o mut dyn Write) -> Self {
        Self { endpoint, model: QueueModel::new(capacity), out, report: Report::default() }
    }

    /// Bytes the model expects to be pending.
    pub fn expected_len(&self) -> usize {
        self.model.len()
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        writeln!(self.out, "Writing message to the device [{}].", String::from_utf8_lossy(data))?;
        let reported = self.endpoint.write(data)?;
        let expected = self.model.write(data);
        self.record(Step {
            kind: StepKind::Write,
            requested: data.len(),
            reported,
            expected,
            content_ok: true,
        })?;
        Ok(reported)
    }

    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        writeln!(self.out, "Reading {len} bytes from the device...")?;
        let data = self.endpoint.read(len)?;
        let expected = self.model.read(len);
        writeln!(self.out, "The received message is: [{}]", String::from_utf8_lossy(&data))?;
        self.record(Step {
            kind: StepKind::Read,
            requested: len,
            reported: data.len(),
            expected: expected.len(),
            content_ok: data == expected,
        })?;
        Ok(data)
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    pub fn finish(self) -> Report {
        self.report
    }

    fn record(&mut self, step: Step) -> Result<()> {
        debug!("fifo-exercise: {step:?}");
        if step.is_mismatch() {
            warn!(
                "fifo-exercise: {:?} of {} reported {}, expected {}",
                step.kind, step.requested, step.reported, step.expected
            );
            writeln!(
                self.out,
                "MISMATCH: device reported {} bytes, expected {}{}",
                step.reported,
                step.expected,
                if step.content_ok { "" } else { " (content differs)" }
            )?;
        }
        self.report.steps.push(step);
        Ok(())
    }
}

/// Sends one line from `input`, waits for another line, then reads back.
pub fn interactive<E: Endpoint, R: BufRead>(ex: &mut Exerciser<'_, E>, input: &mut R) -> Result<()> {
    writeln!(ex.out(), "Type in a short string to send to the device:")?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read input")?;
    let message = line.trim_end_matches(['\r', '\n']);
    ex.write(message.as_bytes())?;

    writeln!(ex.out(), "Press ENTER to read back from the device...")?;
    line.clear();
    input.read_line(&mut line).context("failed to read input")?;
    ex.read(RECEIVE_LEN)?;
    Ok(())
}

/// Message of 499 'a', 500 'b' and 4001 'c'.
pub fn brute_force_message() -> Vec<u8> {
    let mut message = vec![b'a'; 499];
    message.extend_from_slice(&[b'b'; 500]);
    message.extend_from_slice(&[b'c'; 4001]);
    message
}

/// Oversized writes and reads around the capacity boundary.
pub fn brute_force<E: Endpoint>(ex: &mut Exerciser<'_, E>) -> Result<()> {
    writeln!(ex.out(), "Starting device brute force test...")?;
    let message = brute_force_message();
    ex.write(&message)?;
    ex.read(500)?;
    ex.read(500)?;
    ex.write(&message)?;
    ex.read(2000)?;
    Ok(())
}

/// Random reads and writes of up to `max_size` bytes; one in ten sizes is forced to 0.
pub fn random<E: Endpoint, G: Rng>(
    ex: &mut Exerciser<'_, E>,
    ops: usize,
    max_size: usize,
    rng: &mut G,
) -> Result<()> {
    writeln!(ex.out(), "Starting random sequence generation testing...")?;
    for _ in 0..ops {
        writeln!(ex.out())?;
        let mut size = rng.gen_range(0..=max_size);
        if rng.gen_range(0..10) == 0 {
            size = 0;
        }
        if rng.gen_bool(0.5) {
            ex.read(size)?;
        } else {
            let data: Vec<u8> = (0..size).map(|_| rng.gen_range(b'a'..=b'z')).collect();
            ex.write(&data)?;
        }
        let pending = ex.expected_len();
        writeln!(ex.out(), "Current Buffer Size: {pending}")?;
    }
    Ok(())
}

/// Zero-length and single-byte requests.
pub fn empty<E: Endpoint>(ex: &mut Exerciser<'_, E>) -> Result<()> {
    writeln!(ex.out(), "Starting empty string read/write testing...")?;
    ex.write(b"")?;
    ex.read(1)?;
    ex.write(b"A")?;
    ex.read(0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{brute_force, brute_force_message, empty, Exerciser};
    use crate::endpoint::Endpoint;
    use crate::model::QueueModel;

    /// Endpoint backed by the model itself, optionally lying about write counts.
    struct ModelEndpoint {
        model: QueueModel,
        inflate_writes: bool,
    }

    impl Endpoint for ModelEndpoint {
        fn write(&mut self, data: &[u8]) -> Result<usize> {
            let n = self.model.write(data);
            Ok(if self.inflate_writes { data.len() } else { n })
        }

        fn read(&mut self, len: usize) -> Result<Vec<u8>> {
            Ok(self.model.read(len))
        }
    }

    fn endpoint(inflate_writes: bool) -> ModelEndpoint {
        ModelEndpoint { model: QueueModel::new(1024), inflate_writes }
    }

    #[test]
    fn brute_force_message_layout() {
        let message = brute_force_message();
        assert_eq!(message.len(), 5000);
        assert_eq!(message[498], b'a');
        assert_eq!(message[499], b'b');
        assert_eq!(message[999], b'c');
    }

    #[test]
    fn brute_force_against_conforming_endpoint_is_clean() {
        let mut out = Vec::new();
        let mut ex = Exerciser::new(endpoint(false), 1024, &mut out);
        brute_force(&mut ex).unwrap();
        let report = ex.finish();
        assert!(report.is_clean());
        let counts: Vec<usize> = report.steps.iter().map(|s| s.reported).collect();
        assert_eq!(counts, vec![1024, 500, 500, 1000, 1024]);
    }

    #[test]
    fn over_reporting_endpoint_is_flagged() {
        let mut out = Vec::new();
        let mut ex = Exerciser::new(endpoint(true), 1024, &mut out);
        empty(&mut ex).unwrap();
        assert!(ex.finish().is_clean());

        let mut out = Vec::new();
        let mut ex = Exerciser::new(endpoint(true), 1024, &mut out);
        brute_force(&mut ex).unwrap();
        assert_eq!(ex.finish().mismatches().count(), 2);
        assert!(String::from_utf8_lossy(&out).contains("MISMATCH"));
    }
}
