//! One-shot per-ledger event buckets.
//!
//! `getEvents` pages are ledger-ordered but not ledger-aligned: a page for
//! ledger N routinely runs over into N+1 and beyond. Rather than discard
//! the overrun, the cache banks complete later-ledger event sets as
//! buckets and serves them to the next fetch that targets their ledger.
//! Buckets are single-use: a hit removes the bucket, so a repeated fetch
//! for the same ledger goes back to the endpoint.
//!
//! Completeness is the subtle part. Seeing an event from a later ledger
//! proves the requested ledger is complete (pages are ordered), but a
//! full-sized page proves nothing about the last ledger it contains, so
//! that ledger's events are dropped instead of banked. A short page is
//! not a completeness proof either; the server may cap pages below the
//! requested limit.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, warn};

use stellar_ingest_types::records::EventRecord;
use stellar_transport::rpc::GetEventsRequest;

use crate::endpoint::LedgerEndpoint;
use crate::error::FetchError;

/// A complete event set for one ledger, plus the endpoint's latest-ledger
/// watermark from the response that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEvents {
    pub events: Vec<EventRecord>,
    pub latest_ledger: u32,
}

/// Bucket map keyed by ledger sequence. The lock is held only to read or
/// mutate the map, never across an endpoint call.
#[derive(Default)]
pub struct EventsCache {
    buckets: Mutex<HashMap<u32, CachedEvents>>,
}

impl EventsCache {
    pub fn new() -> Self {
        EventsCache::default()
    }

    /// Number of banked ledgers.
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.lock().is_empty()
    }

    pub fn contains(&self, sequence: u32) -> bool {
        self.buckets.lock().contains_key(&sequence)
    }

    /// All events of one ledger. Serves the banked bucket when one exists
    /// (consuming it), pages the endpoint otherwise.
    pub fn get_events(
        &self,
        endpoint: &dyn LedgerEndpoint,
        sequence: u32,
        page_limit: u32,
    ) -> Result<CachedEvents, FetchError> {
        if let Some(cached) = self.buckets.lock().remove(&sequence) {
            debug!(ledger = sequence, events = cached.events.len(), "events served from bucket");
            return Ok(cached);
        }

        let mut own: Vec<EventRecord> = Vec::new();
        let mut request = GetEventsRequest {
            start_ledger: Some(sequence),
            end_ledger: Some(sequence + 1),
            cursor: None,
            limit: Some(page_limit),
        };

        loop {
            let page = endpoint.get_events(&request)?;
            let page_len = page.events.len();
            let last_page_ledger = page.events.last().map(|e| e.ledger);
            debug!(ledger = sequence, page_events = page_len, "fetched events page");

            let mut spill: Vec<EventRecord> = Vec::new();
            for raw in &page.events {
                let record = raw.decode()?;
                if record.ledger == sequence {
                    own.push(record);
                } else {
                    spill.push(record);
                }
            }

            if !spill.is_empty() {
                // A later-ledger event proves the requested ledger is
                // complete. Bank the spill, minus the truncation suspect.
                if page_len as u32 == page_limit {
                    if let Some(last) = last_page_ledger {
                        let before = spill.len();
                        spill.retain(|e| e.ledger != last);
                        let dropped = before - spill.len();
                        if dropped > 0 {
                            warn!(
                                ledger = last,
                                dropped = dropped,
                                "full page cannot prove ledger is complete, dropping its events"
                            );
                        }
                    }
                }
                self.bank(spill, sequence, page.latest_ledger);
                return Ok(CachedEvents { events: own, latest_ledger: page.latest_ledger });
            }

            if page_len == 0 {
                return Ok(CachedEvents { events: own, latest_ledger: page.latest_ledger });
            }

            match page.cursor {
                Some(cursor) => {
                    // Follow-up requests are cursor-only; the cursor
                    // already encodes the range.
                    request = GetEventsRequest {
                        start_ledger: None,
                        end_ledger: None,
                        cursor: Some(cursor),
                        limit: Some(page_limit),
                    };
                }
                None => {
                    return Ok(CachedEvents { events: own, latest_ledger: page.latest_ledger })
                }
            }
        }
    }

    fn bank(&self, spill: Vec<EventRecord>, requested: u32, latest_ledger: u32) {
        let mut buckets = self.buckets.lock();
        for event in spill {
            if event.ledger == requested {
                continue;
            }
            let bucket = buckets
                .entry(event.ledger)
                .or_insert_with(|| CachedEvents { events: Vec::new(), latest_ledger });
            if bucket.events.iter().any(|e| e.id == event.id) {
                continue;
            }
            bucket.events.push(event);
            bucket.latest_ledger = latest_ledger;
        }
    }
}
