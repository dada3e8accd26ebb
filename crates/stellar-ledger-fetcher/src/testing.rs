//! Scripted in-memory endpoint for the fetcher's unit tests.
//!
//! Responses are keyed by request rather than queued, so tests stay
//! deterministic when several heights are fetched concurrently. Requests
//! the script does not cover fail with a recognizable error.

use std::collections::HashMap;

use parking_lot::Mutex;

use stellar_transport::rpc::{
    GetEventsRequest, GetEventsResponse, GetLatestLedgerResponse, GetLedgersRequest,
    GetLedgersResponse, GetNetworkResponse, GetTransactionsRequest, GetTransactionsResponse,
};
use stellar_transport::RpcError;

use crate::endpoint::LedgerEndpoint;

pub(crate) const TEST_PASSPHRASE: &str = "Test SDF Network ; September 2015";

#[derive(Default)]
pub(crate) struct ScriptedEndpoint {
    pub ledgers: Mutex<HashMap<u32, Result<GetLedgersResponse, RpcError>>>,
    pub transactions: Mutex<HashMap<String, GetTransactionsResponse>>,
    pub events: Mutex<HashMap<String, Result<GetEventsResponse, RpcError>>>,
    pub latest: Mutex<Option<GetLatestLedgerResponse>>,
    pub network: Mutex<Option<GetNetworkResponse>>,
    pub ledger_requests: Mutex<Vec<GetLedgersRequest>>,
    pub transaction_requests: Mutex<Vec<GetTransactionsRequest>>,
    pub event_requests: Mutex<Vec<GetEventsRequest>>,
}

impl ScriptedEndpoint {
    /// An endpoint that already answers `getNetwork` with the test
    /// passphrase, which is all `connect` needs.
    pub fn with_network() -> Self {
        let endpoint = ScriptedEndpoint::default();
        *endpoint.network.lock() = Some(GetNetworkResponse {
            friendbot_url: None,
            passphrase: TEST_PASSPHRASE.into(),
            protocol_version: 23,
        });
        endpoint
    }

    pub fn script_ledger(&self, sequence: u32, response: Result<GetLedgersResponse, RpcError>) {
        self.ledgers.lock().insert(sequence, response);
    }

    pub fn script_transactions_page(&self, key: &str, response: GetTransactionsResponse) {
        self.transactions.lock().insert(key.into(), response);
    }

    pub fn script_events_page(&self, key: &str, response: Result<GetEventsResponse, RpcError>) {
        self.events.lock().insert(key.into(), response);
    }

    pub fn script_latest(&self, sequence: u32) {
        *self.latest.lock() = Some(GetLatestLedgerResponse {
            id: "aa".repeat(32),
            protocol_version: 23,
            sequence,
        });
    }
}

/// First pages are keyed `start:<ledger>`, follow-ups `cursor:<token>`.
pub(crate) fn page_key(start_ledger: Option<u32>, cursor: Option<&str>) -> String {
    match (start_ledger, cursor) {
        (_, Some(cursor)) => format!("cursor:{}", cursor),
        (Some(start), None) => format!("start:{}", start),
        (None, None) => "unkeyed".into(),
    }
}

fn unscripted(method: &str) -> RpcError {
    RpcError::new(format!("unscripted {} request", method), None)
}

impl LedgerEndpoint for ScriptedEndpoint {
    fn get_ledgers(&self, request: &GetLedgersRequest) -> Result<GetLedgersResponse, RpcError> {
        self.ledger_requests.lock().push(request.clone());
        let key = request.start_ledger.unwrap_or(0);
        self.ledgers
            .lock()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(unscripted("getLedgers")))
    }

    fn get_transactions(
        &self,
        request: &GetTransactionsRequest,
    ) -> Result<GetTransactionsResponse, RpcError> {
        self.transaction_requests.lock().push(request.clone());
        let key = page_key(request.start_ledger, request.cursor.as_deref());
        self.transactions
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| unscripted("getTransactions"))
    }

    fn get_events(&self, request: &GetEventsRequest) -> Result<GetEventsResponse, RpcError> {
        self.event_requests.lock().push(request.clone());
        let key = page_key(request.start_ledger, request.cursor.as_deref());
        self.events
            .lock()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Err(unscripted("getEvents")))
    }

    fn get_latest_ledger(&self) -> Result<GetLatestLedgerResponse, RpcError> {
        self.latest.lock().clone().ok_or_else(|| unscripted("getLatestLedger"))
    }

    fn get_network(&self) -> Result<GetNetworkResponse, RpcError> {
        self.network.lock().clone().ok_or_else(|| unscripted("getNetwork"))
    }
}
