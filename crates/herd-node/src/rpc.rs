//! JSON-RPC server for the herd daemon.
//!
//! Uses jsonrpsee 0.24 to expose the engine to operators and to the
//! payment-ingestion collaborator: herd queries, receipt submission, the
//! payout trigger, and manual reset.

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;

use herd_core::error::HerdError;
use herd_core::metrics::MetricsSnapshot;
use herd_core::payout::PayoutSplit;
use herd_core::split::SplitTarget;
use herd_core::types::{Member, Receipt, ReceiptOutcome};

use crate::engine::{HerdEngine, HerdStatus};

fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// The herd JSON-RPC interface.
#[rpc(server)]
pub trait HerdRpc {
    /// Returns current members, highest contributor first.
    #[method(name = "getherd")]
    async fn get_herd(&self) -> Result<Vec<Member>, ErrorObjectOwned>;

    /// Returns members, free spots, cycle and cooldown information.
    #[method(name = "getstatus")]
    async fn get_status(&self) -> Result<HerdStatus, ErrorObjectOwned>;

    /// Returns the current cycle's counters.
    #[method(name = "getmetrics")]
    async fn get_metrics(&self) -> Result<MetricsSnapshot, ErrorObjectOwned>;

    /// Returns whole-percent split-payment targets.
    #[method(name = "getsplittargets")]
    async fn get_split_targets(&self) -> Result<Vec<SplitTarget>, ErrorObjectOwned>;

    /// Processes one payment receipt.
    #[method(name = "submitreceipt")]
    async fn submit_receipt(&self, receipt: Receipt) -> Result<ReceiptOutcome, ErrorObjectOwned>;

    /// Computes the herd's payout for a trigger amount.
    #[method(name = "trigger")]
    async fn trigger(&self, amount: u64) -> Result<PayoutSplit, ErrorObjectOwned>;

    /// Wipes the herd immediately and starts a new cycle.
    #[method(name = "resetherd")]
    async fn reset_herd(
        &self,
        admission_reference: Option<String>,
    ) -> Result<HerdStatus, ErrorObjectOwned>;
}

/// Implementation of the herd JSON-RPC server.
pub struct RpcServerImpl {
    engine: Arc<HerdEngine>,
}

impl RpcServerImpl {
    pub fn new(engine: Arc<HerdEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl HerdRpcServer for RpcServerImpl {
    async fn get_herd(&self) -> Result<Vec<Member>, ErrorObjectOwned> {
        Ok(self.engine.snapshot())
    }

    async fn get_status(&self) -> Result<HerdStatus, ErrorObjectOwned> {
        Ok(self.engine.status())
    }

    async fn get_metrics(&self) -> Result<MetricsSnapshot, ErrorObjectOwned> {
        Ok(self.engine.metrics())
    }

    async fn get_split_targets(&self) -> Result<Vec<SplitTarget>, ErrorObjectOwned> {
        if self.engine.config().treasury_destination.is_empty() {
            return Err(rpc_error(-32, "treasury_destination is not configured"));
        }
        Ok(self.engine.split_targets())
    }

    async fn submit_receipt(&self, receipt: Receipt) -> Result<ReceiptOutcome, ErrorObjectOwned> {
        if receipt.id.0.is_empty() {
            return Err(rpc_error(-22, "receipt id must not be empty"));
        }
        self.engine
            .process_receipt(receipt)
            .map_err(|e| rpc_error(-1, &e.to_string()))
    }

    async fn trigger(&self, amount: u64) -> Result<PayoutSplit, ErrorObjectOwned> {
        Ok(self.engine.trigger_payout(amount))
    }

    async fn reset_herd(
        &self,
        admission_reference: Option<String>,
    ) -> Result<HerdStatus, ErrorObjectOwned> {
        self.engine.force_reset(admission_reference);
        Ok(self.engine.status())
    }
}

/// Start the JSON-RPC server on the given address.
///
/// Returns the bound address (useful with port 0) and a [`ServerHandle`]
/// that can be used to stop the server.
pub async fn start_rpc_server(
    addr: &str,
    engine: Arc<HerdEngine>,
) -> Result<(SocketAddr, ServerHandle), HerdError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| HerdError::Rpc(format!("RPC server error: {e}")))?;
    let local = server
        .local_addr()
        .map_err(|e| HerdError::Rpc(format!("RPC server address: {e}")))?;

    let rpc_impl = RpcServerImpl::new(engine);
    let handle = server.start(rpc_impl.into_rpc());

    Ok((local, handle))
}
