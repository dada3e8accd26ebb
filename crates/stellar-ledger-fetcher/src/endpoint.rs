//! Endpoint seam for the fetch pipeline.

use stellar_transport::rpc::{
    GetEventsRequest, GetEventsResponse, GetLatestLedgerResponse, GetLedgersRequest,
    GetLedgersResponse, GetNetworkResponse, GetTransactionsRequest, GetTransactionsResponse,
    RpcClient,
};
use stellar_transport::RpcError;

/// The endpoint methods the fetch pipeline uses.
///
/// Calls are blocking; the fetcher runs them on blocking worker threads.
/// [`RpcClient`] is the production implementation, and tests substitute
/// scripted in-memory endpoints.
pub trait LedgerEndpoint: Send + Sync {
    /// Page through ledgers starting at a sequence or cursor.
    fn get_ledgers(&self, request: &GetLedgersRequest) -> Result<GetLedgersResponse, RpcError>;

    /// Page through transactions starting at a sequence or cursor.
    fn get_transactions(
        &self,
        request: &GetTransactionsRequest,
    ) -> Result<GetTransactionsResponse, RpcError>;

    /// Page through events for a ledger range.
    fn get_events(&self, request: &GetEventsRequest) -> Result<GetEventsResponse, RpcError>;

    /// Latest ledger known to the endpoint.
    fn get_latest_ledger(&self) -> Result<GetLatestLedgerResponse, RpcError>;

    /// Network passphrase and protocol version.
    fn get_network(&self) -> Result<GetNetworkResponse, RpcError>;
}

impl LedgerEndpoint for RpcClient {
    fn get_ledgers(&self, request: &GetLedgersRequest) -> Result<GetLedgersResponse, RpcError> {
        RpcClient::get_ledgers(self, request)
    }

    fn get_transactions(
        &self,
        request: &GetTransactionsRequest,
    ) -> Result<GetTransactionsResponse, RpcError> {
        RpcClient::get_transactions(self, request)
    }

    fn get_events(&self, request: &GetEventsRequest) -> Result<GetEventsResponse, RpcError> {
        RpcClient::get_events(self, request)
    }

    fn get_latest_ledger(&self) -> Result<GetLatestLedgerResponse, RpcError> {
        RpcClient::get_latest_ledger(self)
    }

    fn get_network(&self) -> Result<GetNetworkResponse, RpcError> {
        RpcClient::get_network(self)
    }
}
